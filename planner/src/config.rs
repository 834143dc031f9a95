use std::path::PathBuf;

use clap::Args;

pub const DEFAULT_API_ROOT: &str = "http://localhost:8000/api";
pub const DEFAULT_DATA_DIR: &str = ".aquaintel";

/// Where the routing service lives and where history is kept.
#[derive(Debug, Clone, Args)]
pub struct PlannerConfig {
    /// Base URL of the routing service (without the trailing /route/calculate)
    #[arg(
        long = "api-url",
        env = "AQUAINTEL_API_URL",
        default_value = DEFAULT_API_ROOT,
        global = true
    )]
    pub api_root: String,

    /// Directory holding the recent routes history
    #[arg(
        long,
        env = "AQUAINTEL_DATA_DIR",
        default_value = DEFAULT_DATA_DIR,
        global = true
    )]
    pub data_dir: PathBuf,
}

impl PlannerConfig {
    pub fn new(api_root: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_root: api_root.into(),
            data_dir: data_dir.into(),
        }
    }
}
