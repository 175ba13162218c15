const LOG_ENV: &str = "CYACD2BIN_LOG";
const DEFAULT_FILTER: &str = "cyacd2bin=info";

/// Installs a stderr subscriber when `RUST_LOG` or `CYACD2BIN_LOG` is set.
/// Stdout stays reserved for `--json` events.
pub fn init_tracing() {
    let Some(filter) = log_filter(
        std::env::var("RUST_LOG").ok(),
        std::env::var(LOG_ENV).ok(),
    ) else {
        return;
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// `RUST_LOG` wins; a blank `CYACD2BIN_LOG` means the crate's info level.
fn log_filter(rust_log: Option<String>, own: Option<String>) -> Option<String> {
    if let Some(f) = rust_log.filter(|s| !s.trim().is_empty()) {
        return Some(f);
    }
    own.map(|s| {
        if s.trim().is_empty() {
            DEFAULT_FILTER.to_string()
        } else {
            s
        }
    })
}
