use std::env;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG`, when set and non-empty, wins over `level`. Later calls are no-ops.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_directive(level));

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

fn default_directive(level: &str) -> String {
    format!("mrp_approval={},sea_orm=warn,sqlx=warn", level)
}
