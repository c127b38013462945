use std::path::PathBuf;

pub const WORKSPACE_ENV: &str = "GRADEBOOKD_WORKSPACE";
pub const LOG_ENV: &str = "GRADEBOOKD_LOG";
const DEFAULT_LOG_FILTER: &str = "info";

/// Process-level settings. Per-workspace settings live in the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Workspace to open before the first request, if any.
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
}

impl Config {
    /// `--workspace <path>` wins over `GRADEBOOKD_WORKSPACE`.
    pub fn load(args: &[String]) -> Self {
        Self::from_parts(args, |k| std::env::var(k).ok())
    }

    fn from_parts(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let from_args = args
            .windows(2)
            .find(|w| w[0] == "--workspace")
            .map(|w| PathBuf::from(&w[1]));
        let workspace = from_args.or_else(|| {
            env(WORKSPACE_ENV)
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
        });
        let log_filter = env(LOG_ENV)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Self {
            workspace,
            log_filter,
        }
    }
}

/// Logs go to stderr; stdout carries protocol responses only.
pub fn setup_logging(cfg: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_args_or_env() {
        let cfg = Config::from_parts(&args(&["gradebookd"]), |_| None);
        assert_eq!(cfg.workspace, None);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn arg_overrides_env_workspace() {
        let env: HashMap<&str, &str> = [(WORKSPACE_ENV, "/from/env"), (LOG_ENV, "debug")]
            .into_iter()
            .collect();
        let lookup = |k: &str| env.get(k).map(|s| s.to_string());

        let cfg = Config::from_parts(&args(&["gradebookd", "--workspace", "/from/arg"]), lookup);
        assert_eq!(cfg.workspace, Some(PathBuf::from("/from/arg")));
        assert_eq!(cfg.log_filter, "debug");

        let cfg = Config::from_parts(&args(&["gradebookd"]), lookup);
        assert_eq!(cfg.workspace, Some(PathBuf::from("/from/env")));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let cfg = Config::from_parts(&args(&["gradebookd"]), |_| Some("  ".to_string()));
        assert_eq!(cfg.workspace, None);
        assert_eq!(cfg.log_filter, "info");
    }
}
