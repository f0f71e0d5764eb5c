//! Sets up the program's logging.

use crate::config::Config;
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use log::LevelFilter;
use std::time::Instant;

/// Dependency log targets that are capped to `info` regardless of the configured level.
const QUIET_TARGETS: &[&str] = &["tokio", "mio"];

/// Sets up a global logger with the log level from a given `Config`. Records go to stderr, each
/// prefixed with the seconds elapsed since setup, the level and the record's target. Stdout is
/// left for command output.
pub fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .debug(Color::Magenta)
        .warn(Color::Yellow)
        .error(Color::Red);
    let start = Instant::now();
    let level = LevelFilter::from(config.log_level());

    let mut dispatch = Dispatch::new()
        .format(move |out, msg, record| {
            out.finish(format_args!(
                "[{: >11.3}] [{: >5}] {{{}}} {}",
                start.elapsed().as_secs_f32(),
                colors.color(record.level()),
                record.target(),
                msg
            ))
        })
        .level(level);

    for target in QUIET_TARGETS {
        dispatch = dispatch.level_for(*target, level.min(LevelFilter::Info));
    }

    dispatch.chain(std::io::stderr()).apply()?;
    Ok(())
}
