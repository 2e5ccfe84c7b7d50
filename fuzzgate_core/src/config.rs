use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "fuzzgate.toml";

/// How to reach the fuzzing engine front-end.
///
/// The defaults describe a plain `cargo fuzz` installation. `prefix_args`
/// precede the `list`/`run` subcommand, which lets a wrapper script stand in
/// for cargo (`program = "sh"`, `prefix-args = ["./my-fuzz.sh"]`).
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    #[serde(default = "default_program")]
    pub program: String,
    /// Passed as `+<toolchain>` right after the program, e.g. `nightly`.
    #[serde(default)]
    pub toolchain: Option<String>,
    #[serde(default = "default_prefix_args")]
    pub prefix_args: Vec<String>,
    #[serde(default)]
    pub fuzz_dir: Option<PathBuf>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Extra `cargo fuzz run` options placed before the target name
    /// (`--release`, `--sanitizer=none`, ...).
    #[serde(default)]
    pub run_flags: Vec<String>,
    /// Arguments for the engine itself, placed after `--`
    /// (`-max_total_time=600`, `-runs=100000`, ...).
    #[serde(default)]
    pub engine_args: Vec<String>,
}

fn default_program() -> String {
    "cargo".to_string()
}

fn default_prefix_args() -> Vec<String> {
    vec!["fuzz".to_string()]
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            toolchain: None,
            prefix_args: default_prefix_args(),
            fuzz_dir: None,
            working_dir: None,
            run_flags: Vec::new(),
            engine_args: Vec::new(),
        }
    }
}

/// How a stop-after-first-failure session is requested and recognised.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FailureSettings {
    /// Engine arguments that make it halt on the first failing input.
    #[serde(default = "default_stop_flags")]
    pub stop_flags: Vec<String>,
    /// Substrings of engine stderr lines that mean a failing input was found.
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,
    /// Engine exit codes that mean a failing input was found, even without
    /// a marker line.
    ///
    /// Empty by default. libFuzzer exits 77/70/71 on a crash, timeout or
    /// out-of-memory, but cargo, rustc and most other tools use 70 and 71
    /// as `EX_SOFTWARE` and `EX_OSERR`. Set `[77, 70, 71]` only when
    /// `program` is the fuzz target binary itself, with no front-end
    /// between fuzzgate and libFuzzer.
    #[serde(default = "default_exit_codes")]
    pub exit_codes: Vec<i32>,
}

pub fn default_stop_flags() -> Vec<String> {
    ["-ignore_crashes=0", "-ignore_timeouts=0", "-ignore_ooms=0"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_markers() -> Vec<String> {
    [
        "Failing input:",
        "SUMMARY: libFuzzer:",
        "ERROR: libFuzzer:",
        "SUMMARY: AddressSanitizer:",
        "SUMMARY: MemorySanitizer:",
        "SUMMARY: ThreadSanitizer:",
        "SUMMARY: UndefinedBehaviorSanitizer:",
        "Test unit written to",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// `cargo fuzz` sits between fuzzgate and libFuzzer, so only markers count.
pub fn default_exit_codes() -> Vec<i32> {
    Vec::new()
}

impl Default for FailureSettings {
    fn default() -> Self {
        Self {
            stop_flags: default_stop_flags(),
            markers: default_markers(),
            exit_codes: default_exit_codes(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub failure: FailureSettings,
}

impl DriverConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
