use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Filter for `-v` count. The CDP handler logs every protocol message, so
/// chromiumoxide stays quiet until trace.
fn default_filter(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error,chromiumoxide=off",
		1 => "info,chromiumoxide=warn",
		2 => "debug,chromiumoxide=info",
		_ => "trace",
	}
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_ansi(std::io::stderr().is_terminal())
		.with_target(verbosity >= 2)
		.compact()
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cdp_noise_only_at_trace() {
		assert!(default_filter(0).contains("chromiumoxide=off"));
		assert!(default_filter(2).contains("chromiumoxide=info"));
		assert_eq!(default_filter(5), "trace");
	}

	#[test]
	fn filters_parse() {
		for level in 0..4 {
			EnvFilter::try_new(default_filter(level)).unwrap();
		}
	}
}
