//! Helper to set the backtrace env var.

/// Sets `RUST_BACKTRACE=1` unless a value has already been provided.
///
/// Must be called before any other thread is started.
pub fn enable() {
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        // SAFETY: the process is still single threaded.
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
}
