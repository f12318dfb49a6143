use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Installs a subscriber writing to stderr. It also receives the `log` records of the library
/// crates. `level` applies unless `RUST_LOG` holds directives.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init(level: LevelFilter) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(filter(level, directives.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(anyhow::Error::msg)
}

/// Level selected by the number of `-v` flags.
pub fn level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn filter(level: LevelFilter, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives.unwrap_or_default())
}
