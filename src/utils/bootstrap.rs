//! Bootstrap utilities for topograph binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing from the `TOPOGRAPH_LOG` environment variable.
///
/// Defaults to "info" level if it is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Value of `--config <path>` / `--config=<path>` on the command line.
pub fn parse_config_path() -> Option<String> {
    config_path_from(std::env::args().skip(1))
}

fn config_path_from(args: impl IntoIterator<Item = String>) -> Option<String> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_config_path_forms() {
        assert_eq!(
            config_path_from(args(&["--config", "/etc/topograph.yaml"])).as_deref(),
            Some("/etc/topograph.yaml")
        );
        assert_eq!(
            config_path_from(args(&["-c", "a.yaml"])).as_deref(),
            Some("a.yaml")
        );
        assert_eq!(
            config_path_from(args(&["--config=b.yaml"])).as_deref(),
            Some("b.yaml")
        );
    }

    #[test]
    fn test_config_path_absent() {
        assert_eq!(config_path_from(args(&[])), None);
        assert_eq!(config_path_from(args(&["--verbose"])), None);
        assert_eq!(config_path_from(args(&["--config"])), None);
    }
}
