use crate::engine::{EngineExit, FuzzEngine, RunRequest};
use crate::error::DriverError;
use crate::resolver::resolve_catalog;
use crate::target::{TargetCatalog, TargetName};
use std::fmt;
use std::io::Write;

/// What one invocation asked for. Exactly one of these happens per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    ListTargets,
    Run(RunRequest),
}

impl Invocation {
    /// Builds the invocation from the optional target argument and any
    /// arguments given after `--`.
    ///
    /// Engine arguments without a target are a usage error, as is a blank target.
    pub fn from_args(target: Option<String>, forwarded: Vec<String>) -> Result<Self, DriverError> {
        match target {
            None if forwarded.is_empty() => Ok(Invocation::ListTargets),
            None => Err(DriverError::Usage(
                "engine arguments after `--` require a fuzz target".to_string(),
            )),
            Some(name) => {
                let target = TargetName::new(name)?;
                Ok(Invocation::Run(
                    RunRequest::new(target).with_forwarded_args(forwarded),
                ))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Listing,
    Dispatching,
    Running,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Listing => "listing",
            Phase::Dispatching => "dispatching",
            Phase::Running => "running",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Successful end of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Listed(TargetCatalog),
    Completed(EngineExit),
}

/// Turns an [`Invocation`] into either a catalog listing or one fuzzing run.
///
/// `dispatch` consumes the dispatcher, so a second action in the same
/// invocation is impossible.
pub struct Dispatcher<E: FuzzEngine> {
    engine: E,
    phase: Phase,
}

impl<E: FuzzEngine> Dispatcher<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            phase: Phase::Idle,
        }
    }

    fn enter(&mut self, next: Phase) {
        log::debug!("Dispatcher: {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Runs the invocation. Catalog names go to `out`, one per line.
    pub fn dispatch(
        mut self,
        invocation: Invocation,
        out: &mut dyn Write,
    ) -> Result<Dispatched, DriverError> {
        let result = match invocation {
            Invocation::ListTargets => self.list(out),
            Invocation::Run(request) => self.run(request),
        };
        self.enter(Phase::Done);
        result
    }

    fn list(&mut self, out: &mut dyn Write) -> Result<Dispatched, DriverError> {
        self.enter(Phase::Listing);
        let catalog = resolve_catalog(&mut self.engine)?;
        catalog
            .write_to(out)
            .map_err(|e| DriverError::Output(e.to_string()))?;
        Ok(Dispatched::Listed(catalog))
    }

    fn run(&mut self, request: RunRequest) -> Result<Dispatched, DriverError> {
        self.enter(Phase::Dispatching);
        log::info!(
            "Fuzzing target `{}` (stop after first failure: {})",
            request.target(),
            request.stop_after_first_failure()
        );

        self.enter(Phase::Running);
        let outcome = self.engine.run(&request);
        log::debug!("Run outcome for `{}`: {:?}", request.target(), outcome);

        outcome
            .into_result(request.target())
            .map(Dispatched::Completed)
    }
}
