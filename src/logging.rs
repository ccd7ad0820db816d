use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

const DEFAULT_FILTER: &str = "safety_checker=info,check_image=info,tower_http=info";

/// Install the fmt subscriber (also forwards `log` records). `RUST_LOG` overrides the default filter.
pub fn init() {
    LOGGER_INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        tracing_subscriber::fmt()
            .with_target(false)
            .with_env_filter(filter)
            .init();
    });
}
