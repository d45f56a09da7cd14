use tracing::Level;

/// Initialize tracing for the coordination server.
///
/// `level` comes from the `log.level` setting. Uses `try_init` so tests
/// can call this repeatedly without panicking.
pub fn init(level: &str) {
    let max_level = match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .try_init();
}
