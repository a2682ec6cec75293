use std::path::Path;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Configuration for a harness run.
///
/// Only the inputs and the execution modes are configurable. The compile
/// options used by the harness are fixed.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Pattern to compile.
    pub pattern: String,
    /// Subject that the pattern is matched against.
    pub subject: String,
    /// JIT mode settings.
    pub jit: JitConfig,
    /// Restartable scan settings.
    pub scan: ScanConfig,
}

/// JIT mode settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct JitConfig {
    /// Compile the pattern to JIT code and run the JIT match.
    pub enabled: bool,
    /// Initial size of the JIT stack in bytes.
    pub stack_min: usize,
    /// Maximum size of the JIT stack in bytes.
    pub stack_max: usize,
}

/// Restartable scan settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Run the byte-by-byte scan.
    pub enabled: bool,
    /// Number of candidate slots in the scan workspace.
    pub workspace_slots: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            pattern: r"\d+(sens|respons)e".to_string(),
            subject: "h123response".to_string(),
            jit: JitConfig {
                enabled: true,
                stack_min: 16 * 1024,
                stack_max: 128 * 1024,
            },
            scan: ScanConfig { enabled: true, workspace_slots: 20 },
        }
    }
}

/// Load config file from a given path. Path must contain a valid TOML file or
/// this function will propagate the error. Settings missing from the file
/// keep their default values.
pub fn load_config_from_file(
    config_file: &Path,
) -> Result<Config, figment::Error> {
    let config: Config =
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file_exact(config_file))
            .extract()?;
    Ok(config)
}
