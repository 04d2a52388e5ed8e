pub mod build_info;

use tracing_subscriber::{fmt, EnvFilter};

/// Directive applied on top of `RUST_LOG` when nothing else is configured.
pub const DEFAULT_LOG_FILTER: &str = "expense_tracker=info";

/// Installs the fmt subscriber, writing to stderr so command output stays clean.
pub fn init_tracing(default_directive: &str) {
    let mut filter = EnvFilter::from_default_env();
    match default_directive.parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(err) => eprintln!("ignoring invalid log filter `{default_directive}`: {err}"),
    }
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
