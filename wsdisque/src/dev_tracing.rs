/// Development helper: initialize tracing subscriber when `RUST_LOG` is set.
///
/// Demos and tests can call `wsdisque::dev_tracing::init_tracing()` to see the
/// `[LINK]`, `[GETJOB]`, `[FASTACK]` and `[ADDJOB]` logs. This is a no-op when
/// `RUST_LOG` is not set or when a global subscriber is already installed.
pub fn init_tracing() {
    use std::env;

    if env::var("RUST_LOG").is_ok() {
        // Best-effort: tests race to install the global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}
