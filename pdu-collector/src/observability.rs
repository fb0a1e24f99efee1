use tracing_subscriber::{filter::Directive, EnvFilter};

const DEFAULT_DIRECTIVES: [&str; 2] = ["pdu_collector=info", "pdu_client=info"];

fn default_filter() -> EnvFilter {
    DEFAULT_DIRECTIVES
        .iter()
        .filter_map(|d| d.parse::<Directive>().ok())
        .fold(EnvFilter::from_default_env(), EnvFilter::add_directive)
}

/// Collector logging: one line per event on stdout.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_target(false)
        .init();
}

/// Same format on stderr, for tools that print data on stdout.
pub fn init_tracing_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
