use std::io;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

/// Installs a stderr `fmt` subscriber filtered at `level`.
/// Returns `false` if a global subscriber was already set.
pub fn init_logging(level: LevelFilter) -> bool {
    let collector = tracing_subscriber::registry().with(
        fmt::Layer::new()
            .with_writer(io::stderr)
            .with_target(false)
            .with_filter(level),
    );
    tracing::subscriber::set_global_default(collector).is_ok()
}
