//! Logger setup for the GUI and the command line utilities.

use log::LevelFilter;

/// Initialize the global logger.
///
/// `RUST_LOG` wins over the configured level so a single run can be made
/// more verbose without touching the config file. Calling this twice is
/// harmless; the second call is ignored.
pub fn init(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    let _ = builder.format_timestamp_secs().try_init();
}
