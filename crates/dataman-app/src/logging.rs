use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,dataman=debug";

/// Initializes the global logging facility.
///
/// `RUST_LOG` wins when set, otherwise everything logs at `info` and the
/// dataman crates at `debug`. Colors are only used on a terminal.
///
/// # Panics
///
/// Panics if a global subscriber was already installed.
pub fn init_logging(json_output: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_ansi(atty::is(atty::Stream::Stdout));

    if json_output {
        builder.json().init();
    } else {
        builder.init();
    }
}
