use crate::config::FailureSettings;
use crate::engine::{EngineExit, FailureReport, RunOutcome};

/// Decides whether an engine exit means "found a failing input" or
/// "the tooling broke".
///
/// The engine stops on its own at the first failure; this only reads the
/// signals it leaves behind: its exit code and the marker lines it prints
/// on stderr.
#[derive(Debug, Clone)]
pub struct FailureOracle {
    markers: Vec<String>,
    exit_codes: Vec<i32>,
}

impl FailureOracle {
    pub fn new(markers: Vec<String>, exit_codes: Vec<i32>) -> Self {
        Self {
            markers: markers.into_iter().filter(|m| !m.is_empty()).collect(),
            exit_codes,
        }
    }

    pub fn from_settings(settings: &FailureSettings) -> Self {
        Self::new(settings.markers.clone(), settings.exit_codes.clone())
    }

    /// Returns true if an engine stderr line announces a failing input.
    pub fn is_failure_marker(&self, line: &str) -> bool {
        self.markers.iter().any(|marker| line.contains(marker.as_str()))
    }

    /// Classifies a finished engine run. `evidence` is the first marker line
    /// seen on stderr, if any.
    ///
    /// A successful exit is never a failure, even if a marker was printed.
    pub fn classify(&self, exit: EngineExit, evidence: Option<String>) -> RunOutcome {
        if exit.success() {
            return RunOutcome::Completed(exit);
        }
        if let Some(evidence) = evidence {
            return RunOutcome::FailureDetected(FailureReport { exit, evidence });
        }
        match exit.exit_code {
            Some(code) if self.exit_codes.contains(&code) => {
                let evidence = format!("engine exited with failure code {code}");
                RunOutcome::FailureDetected(FailureReport { exit, evidence })
            }
            _ => RunOutcome::Completed(exit),
        }
    }
}

impl Default for FailureOracle {
    fn default() -> Self {
        Self::from_settings(&FailureSettings::default())
    }
}
