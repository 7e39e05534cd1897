use std::path::PathBuf;

use clap::{Args, ValueHint, builder::BoolishValueParser};

/// Flags shared by every `feelslap` subcommand; they override file and environment settings.
#[derive(Debug, Args, Default, Clone)]
pub struct GlobalArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "FEELSLAP_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    /// Override the remote API base URL.
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Override the per-request timeout.
    #[arg(long = "api-timeout-seconds", value_name = "SECONDS", global = true)]
    pub api_timeout_seconds: Option<u64>,

    /// Override the directory holding session-local state.
    #[arg(
        long = "state-dir",
        value_name = "PATH",
        value_hint = ValueHint::DirPath,
        global = true
    )]
    pub state_dir: Option<PathBuf>,

    /// Override the default page size for feeds.
    #[arg(long = "page-limit", value_name = "COUNT", global = true)]
    pub page_limit: Option<u32>,

    /// Override the query cache capacity.
    #[arg(long = "cache-capacity", value_name = "COUNT", global = true)]
    pub cache_capacity: Option<usize>,

    /// Disable result caching (identical concurrent reads still coalesce).
    #[arg(long = "no-cache", global = true)]
    pub no_cache: bool,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}
