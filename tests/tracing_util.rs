use tracing_subscriber::EnvFilter;

/// Test helper that installs a tracing subscriber for the duration of a test.
///
/// Uses `RUST_LOG` when set, defaulting to `info`. Installation is global
/// and racy across tests, so failures to set the subscriber are ignored;
/// the first test to install wins.
pub struct TestTracing;

impl TestTracing {
    pub fn init() -> Self {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
        TestTracing
    }
}
