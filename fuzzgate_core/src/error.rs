use thiserror::Error;

/// Exit status used when the engine reports a failing input.
pub const EXIT_FAILURE_DETECTED: u8 = 1;
/// Exit status for usage errors. Matches what clap uses for bad arguments.
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_ENGINE_NON_FAILURE: u8 = 3;
pub const EXIT_ENGINE_LAUNCH: u8 = 4;
pub const EXIT_CATALOG_UNAVAILABLE: u8 = 5;
/// Exit status for configuration problems caught before the engine is involved.
pub const EXIT_CONFIG: u8 = 6;
pub const EXIT_OUTPUT: u8 = 7;

/// Everything that can end an invocation with a non-zero status.
///
/// Each variant maps to its own exit status so that callers such as CI can
/// tell "the fuzzer found a bug" apart from "the tooling is broken".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The engine could not enumerate the project's fuzz targets.
    #[error("fuzz target catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The engine process could not be started at all.
    #[error("failed to launch fuzzing engine `{program}`: {reason}")]
    EngineLaunch { program: String, reason: String },

    /// The engine exited unsuccessfully without reporting a failing input
    /// (build error, unknown target, killed by a signal, ...).
    /// `diagnostic` is the engine's last stderr line, unmodified.
    #[error("fuzzing engine exited with {status} without finding a failing input{}", render_diagnostic(.diagnostic))]
    EngineNonFailure {
        status: String,
        diagnostic: Option<String>,
    },

    /// The engine found a crashing, hanging or sanitizer-triggering input.
    #[error("fuzz target `{target}` failed: {evidence}")]
    FailureDetected { target: String, evidence: String },

    /// The command line was rejected before anything was spawned.
    #[error("usage: {0}")]
    Usage(String),

    /// The target listing could not be written out.
    #[error("failed to write target catalog: {0}")]
    Output(String),
}

fn render_diagnostic(diagnostic: &Option<String>) -> String {
    match diagnostic {
        Some(line) => format!("\n{line}"),
        None => String::new(),
    }
}

impl DriverError {
    /// Process exit status for this error. Each category has its own code,
    /// see the `EXIT_*` constants.
    pub fn exit_code(&self) -> u8 {
        match self {
            DriverError::FailureDetected { .. } => EXIT_FAILURE_DETECTED,
            DriverError::Usage(_) => EXIT_USAGE,
            DriverError::Output(_) => EXIT_OUTPUT,
            DriverError::EngineNonFailure { .. } => EXIT_ENGINE_NON_FAILURE,
            DriverError::EngineLaunch { .. } => EXIT_ENGINE_LAUNCH,
            DriverError::CatalogUnavailable(_) => EXIT_CATALOG_UNAVAILABLE,
        }
    }

    /// Short category name written alongside the message on stderr.
    pub fn category(&self) -> &'static str {
        match self {
            DriverError::CatalogUnavailable(_) => "CatalogUnavailable",
            DriverError::EngineLaunch { .. } => "EngineLaunchError",
            DriverError::EngineNonFailure { .. } => "EngineNonFailureError",
            DriverError::FailureDetected { .. } => "FailureDetected",
            DriverError::Usage(_) => "UsageError",
            DriverError::Output(_) => "OutputError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_category_has_a_distinct_exit_code() {
        let errors = [
            DriverError::CatalogUnavailable("no fuzz dir".to_string()),
            DriverError::EngineLaunch {
                program: "cargo".to_string(),
                reason: "not found".to_string(),
            },
            DriverError::EngineNonFailure {
                status: "exit code 1".to_string(),
                diagnostic: None,
            },
            DriverError::FailureDetected {
                target: "decode_frame".to_string(),
                evidence: "Failing input:".to_string(),
            },
            DriverError::Usage("blank target".to_string()),
            DriverError::Output("broken pipe".to_string()),
        ];
        let codes: HashSet<u8> = errors.iter().map(DriverError::exit_code).collect();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
        assert!(!codes.contains(&EXIT_CONFIG));
    }

    #[test]
    fn non_failure_message_carries_engine_diagnostic_verbatim() {
        let diagnostic = "error: no bin target named `missing_target`".to_string();
        let err = DriverError::EngineNonFailure {
            status: "exit code 1".to_string(),
            diagnostic: Some(diagnostic.clone()),
        };
        let rendered = err.to_string();
        assert!(rendered.ends_with(&diagnostic), "got: {rendered}");
        assert_eq!(err.category(), "EngineNonFailureError");
    }

    #[test]
    fn non_failure_message_without_diagnostic_is_single_line() {
        let err = DriverError::EngineNonFailure {
            status: "signal 9".to_string(),
            diagnostic: None,
        };
        assert!(!err.to_string().contains('\n'));
    }
}
