use tracing_subscriber::EnvFilter;

/// Crate filter for a given number of `-v` flags.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "vidlive=info",
        1 => "vidlive=debug",
        _ => "vidlive=trace",
    }
}

/**
    Install the global subscriber, writing to stderr.

    `RUST_LOG` wins when set; otherwise the `-v` count picks the level.
*/
pub fn init(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(default_directive(0), "vidlive=info");
        assert_eq!(default_directive(1), "vidlive=debug");
        assert_eq!(default_directive(5), "vidlive=trace");
    }
}
