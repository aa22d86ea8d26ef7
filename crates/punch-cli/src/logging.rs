//! Tracing subscriber setup shared by both binaries.

use tracing_subscriber::EnvFilter;

/// Filter directives for a `-v` count.
pub fn filter_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "punch_cli=info,punch_core=info,punch_browser=info,punch_relay=info,chromiumoxide=warn",
        1 => "punch_cli=debug,punch_core=debug,punch_browser=debug,punch_relay=debug,chromiumoxide=warn",
        2 => "punch_cli=trace,punch_core=trace,punch_browser=trace,punch_relay=trace,chromiumoxide=warn",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `verbose`.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse() {
        for verbose in 0..4 {
            assert!(EnvFilter::try_new(filter_directives(verbose)).is_ok());
        }
        assert!(filter_directives(1).contains("punch_core=debug"));
        assert!(filter_directives(2).contains("chromiumoxide=warn"));
    }
}
