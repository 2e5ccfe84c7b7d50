use crate::config::{DriverConfig, EngineSettings};
use crate::engine::{EngineExit, FuzzEngine, RunOutcome, RunRequest};
use crate::error::DriverError;
use crate::oracle::FailureOracle;
use crate::target::{TargetCatalog, TargetName};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Command, ExitStatus, Stdio};

/// Drives `cargo fuzz` (or anything with the same `list` / `run <target> -- ...`
/// conventions) as a child process.
pub struct CargoFuzzEngine {
    settings: EngineSettings,
    stop_flags: Vec<String>,
    oracle: FailureOracle,
    stderr_sink: Option<Box<dyn Write + Send>>,
}

impl CargoFuzzEngine {
    /// Engine built from the `[engine]` and `[failure]` sections of `config`.
    /// Relayed stderr goes to our own stderr unless a sink is set.
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            settings: config.engine.clone(),
            stop_flags: config.failure.stop_flags.clone(),
            oracle: FailureOracle::from_settings(&config.failure),
            stderr_sink: None,
        }
    }

    /// Sends the engine's relayed stderr somewhere other than our own stderr.
    pub fn with_stderr_sink(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.stderr_sink = Some(sink);
        self
    }

    fn leading_args(&self, subcommand: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(toolchain) = &self.settings.toolchain {
            args.push(format!("+{toolchain}"));
        }
        args.extend(self.settings.prefix_args.iter().cloned());
        args.push(subcommand.to_string());
        if let Some(fuzz_dir) = &self.settings.fuzz_dir {
            args.push("--fuzz-dir".to_string());
            args.push(fuzz_dir.display().to_string());
        }
        args
    }

    /// `[+toolchain] <prefix-args> list [--fuzz-dir D]`
    pub fn list_arguments(&self) -> Vec<String> {
        self.leading_args("list")
    }

    /// `[+toolchain] <prefix-args> run [--fuzz-dir D] [run-flags] <target> -- [stop-flags] [engine-args] [forwarded]`
    pub fn run_arguments(&self, request: &RunRequest) -> Vec<String> {
        let mut args = self.leading_args("run");
        args.extend(self.settings.run_flags.iter().cloned());
        args.push(request.target().to_string());

        let mut engine_args: Vec<String> = Vec::new();
        if request.stop_after_first_failure() {
            engine_args.extend(self.stop_flags.iter().cloned());
        }
        engine_args.extend(self.settings.engine_args.iter().cloned());
        engine_args.extend(request.forwarded_args().iter().cloned());
        if !engine_args.is_empty() {
            args.push("--".to_string());
            args.extend(engine_args);
        }
        args
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.settings.program);
        cmd.args(args);
        if let Some(cwd) = &self.settings.working_dir {
            cmd.current_dir(cwd);
        }
        cmd
    }

    fn describe_command(&self, args: &[String]) -> String {
        let mut rendered = self.settings.program.clone();
        for arg in args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }
}

impl FuzzEngine for CargoFuzzEngine {
    fn list_targets(&mut self) -> Result<Vec<TargetName>, DriverError> {
        let args = self.list_arguments();
        log::debug!("Listing fuzz targets: {}", self.describe_command(&args));

        let output = self
            .command(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                DriverError::CatalogUnavailable(format!(
                    "failed to launch `{}`: {}",
                    self.settings.program, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let exit = exit_from_status(output.status, None);
            let reason = if stderr.is_empty() {
                format!("engine exited with {}", exit.describe())
            } else {
                stderr
            };
            return Err(DriverError::CatalogUnavailable(reason));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(TargetCatalog::from_listing(&listing).into_iter().collect())
    }

    fn run(&mut self, request: &RunRequest) -> RunOutcome {
        let args = self.run_arguments(request);
        log::info!("Launching fuzzing engine: {}", self.describe_command(&args));

        let mut cmd = self.command(&args);
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                log::debug!("Spawning `{}` failed: {e}", self.settings.program);
                return RunOutcome::EngineLaunchError {
                    program: self.settings.program.clone(),
                    reason: e.to_string(),
                };
            }
        };

        let summary = match child.stderr.take() {
            Some(stderr) => {
                let relayed = match self.stderr_sink.as_mut() {
                    Some(sink) => relay_stderr(stderr, &mut **sink, &self.oracle),
                    None => relay_stderr(stderr, &mut io::stderr().lock(), &self.oracle),
                };
                relayed.unwrap_or_else(|e| {
                    log::warn!("Stopped reading engine stderr: {e}");
                    StderrSummary::default()
                })
            }
            None => StderrSummary::default(),
        };

        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => {
                return RunOutcome::EngineLaunchError {
                    program: self.settings.program.clone(),
                    reason: format!("failed to wait for engine process: {e}"),
                };
            }
        };

        let exit = exit_from_status(status, summary.diagnostic);
        log::debug!("Engine finished with {}", exit.describe());
        self.oracle.classify(exit, summary.evidence)
    }
}

fn exit_from_status(status: ExitStatus, diagnostic: Option<String>) -> EngineExit {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    EngineExit {
        exit_code: status.code(),
        signal,
        diagnostic,
    }
}

/// What was learned from the engine's stderr while relaying it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StderrSummary {
    /// First line carrying a failure marker.
    pub evidence: Option<String>,
    /// First line starting with `error`, otherwise the last non-empty line.
    ///
    /// cargo prints the root cause first and its own wrapper message
    /// (`Error: failed to build fuzz script: ...`) after it.
    pub diagnostic: Option<String>,
}

/// Copies `source` to `sink` byte-for-byte, one line at a time, while
/// scanning each line for failure markers.
///
/// The source is always drained to the end so the child never blocks on a
/// full pipe. Once the sink fails, copying stops but scanning continues.
pub fn relay_stderr<R: Read>(
    source: R,
    sink: &mut dyn Write,
    oracle: &FailureOracle,
) -> io::Result<StderrSummary> {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    let mut summary = StderrSummary::default();
    let mut last_line: Option<String> = None;
    let mut first_error_line: Option<String> = None;
    let mut sink_open = true;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        if sink_open {
            if let Err(e) = sink.write_all(&buf).and_then(|_| sink.flush()) {
                log::warn!("Failed to relay engine stderr: {e}");
                sink_open = false;
            }
        }

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        if summary.evidence.is_none() && oracle.is_failure_marker(line) {
            summary.evidence = Some(line.to_string());
        }
        if first_error_line.is_none()
            && line.trim_start().to_ascii_lowercase().starts_with("error")
        {
            first_error_line = Some(line.to_string());
        }
        last_line = Some(line.to_string());
    }

    summary.diagnostic = first_error_line.or(last_line);
    Ok(summary)
}
