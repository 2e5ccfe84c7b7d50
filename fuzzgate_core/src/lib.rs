pub mod cargo_fuzz;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod resolver;
pub mod target;

pub use cargo_fuzz::CargoFuzzEngine;
pub use config::DriverConfig;
pub use dispatcher::{Dispatched, Dispatcher, Invocation};
pub use engine::{EngineExit, FailureReport, FuzzEngine, RunOutcome, RunRequest};
pub use error::DriverError;
pub use oracle::FailureOracle;
pub use resolver::resolve_catalog;
pub use target::{TargetCatalog, TargetName};
