use crate::error::DriverError;
use crate::target::TargetName;

/// A single fuzzing session to hand to the engine.
///
/// Requests built through [`RunRequest::new`] always ask the engine to stop
/// at the first failing input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    target: TargetName,
    stop_after_first_failure: bool,
    forwarded_args: Vec<String>,
}

impl RunRequest {
    /// Request for `target` with stop-after-first-failure set and nothing forwarded.
    pub fn new(target: TargetName) -> Self {
        Self {
            target,
            stop_after_first_failure: true,
            forwarded_args: Vec::new(),
        }
    }

    /// Arguments given after `--` on the command line, passed to the engine as-is.
    pub fn with_forwarded_args(mut self, args: Vec<String>) -> Self {
        self.forwarded_args = args;
        self
    }

    /// Target name, passed to the engine unvalidated.
    pub fn target(&self) -> &TargetName {
        &self.target
    }

    /// Whether the engine gets the stop flags. Always true for requests from `new`.
    pub fn stop_after_first_failure(&self) -> bool {
        self.stop_after_first_failure
    }

    /// Arguments appended after the stop flags and configured engine args.
    pub fn forwarded_args(&self) -> &[String] {
        &self.forwarded_args
    }
}

/// How the engine process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineExit {
    /// Exit code, if the engine exited normally.
    pub exit_code: Option<i32>,
    /// Terminating signal number, if the engine was killed. Always `None` off unix.
    pub signal: Option<i32>,
    /// The engine's most relevant stderr line, unmodified: the first line
    /// starting with `error`, or the last non-empty line.
    pub diagnostic: Option<String>,
}

impl EngineExit {
    /// Normal exit with `exit_code` and no diagnostic.
    pub fn with_code(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            ..Self::default()
        }
    }

    /// True only for exit code 0. A signal is never success.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// `exit code N`, `signal N` or `abnormal termination`, for messages.
    pub fn describe(&self) -> String {
        if let Some(code) = self.exit_code {
            format!("exit code {code}")
        } else if let Some(signal) = self.signal {
            format!("signal {signal}")
        } else {
            "abnormal termination".to_string()
        }
    }
}

/// A failing input reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// How the engine ended after reporting the failure.
    pub exit: EngineExit,
    /// The stderr line (or exit code description) that identified the failure.
    pub evidence: String,
}

/// What a fuzzing run came to, as judged by the failure oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The engine ran to completion without reporting a failing input.
    /// A non-zero exit here means the tooling broke, not the target.
    Completed(EngineExit),
    /// The engine reported a failing input and stopped.
    FailureDetected(FailureReport),
    /// The engine process could not be started at all.
    EngineLaunchError { program: String, reason: String },
}

impl RunOutcome {
    /// Collapses the outcome into the driver's error taxonomy.
    pub fn into_result(self, target: &TargetName) -> Result<EngineExit, DriverError> {
        match self {
            RunOutcome::Completed(exit) if exit.success() => Ok(exit),
            RunOutcome::Completed(exit) => Err(DriverError::EngineNonFailure {
                status: exit.describe(),
                diagnostic: exit.diagnostic,
            }),
            RunOutcome::FailureDetected(report) => Err(DriverError::FailureDetected {
                target: target.to_string(),
                evidence: report.evidence,
            }),
            RunOutcome::EngineLaunchError { program, reason } => {
                Err(DriverError::EngineLaunch { program, reason })
            }
        }
    }
}

/// The capabilities the driver needs from a fuzzing engine.
pub trait FuzzEngine {
    /// Targets defined in the project, in the engine's own order.
    fn list_targets(&mut self) -> Result<Vec<TargetName>, DriverError>;

    /// Runs one session and blocks until the engine exits.
    fn run(&mut self, request: &RunRequest) -> RunOutcome;
}

impl<E: FuzzEngine + ?Sized> FuzzEngine for &mut E {
    fn list_targets(&mut self) -> Result<Vec<TargetName>, DriverError> {
        (**self).list_targets()
    }

    fn run(&mut self, request: &RunRequest) -> RunOutcome {
        (**self).run(request)
    }
}
