//! PDDL Tools
//!
//! CLI tools for working with PDDL domains and problems.

use enumset::EnumSet;
use pddl::Requirement;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Default is `info`, with the compiler crates at `debug`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,pddl=debug,pddl_resolve=debug,pddl_tools=debug")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse requirement keys as given on the command line, with or without
/// the leading colon.
pub fn parse_requirements<'a>(
    keys: impl IntoIterator<Item = &'a str>,
) -> Result<EnumSet<Requirement>, String> {
    keys.into_iter()
        .map(|key| {
            Requirement::from_key(key.trim()).ok_or_else(|| format!("unknown requirement '{key}'"))
        })
        .collect()
}
