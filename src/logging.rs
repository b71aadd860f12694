//! Log subscriber setup shared by the binaries.
//!
//! Level comes from `RUST_LOG` (default `info`). Output goes to stderr so
//! stdout stays free for the player's packet listing.
use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
