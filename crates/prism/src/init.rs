//! Initialization for prism-rs.

/// Initializes logging.
///
/// Installs an `env_logger` logger configured from `RUST_LOG`. Calling it
/// again, or after the application installed its own logger, does nothing.
///
/// # Example
///
/// ```no_run
/// prism::init();
/// log::info!("ready");
/// ```
pub fn init() {
    if env_logger::try_init().is_ok() {
        log::info!("prism-rs initialized");
    }
}
