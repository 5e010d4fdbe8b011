use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Filter used when `RUST_LOG` is unset. Errors are always recorded; the
/// rest only with debug logging on.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "info,mypay_gateway=debug"
    } else {
        "error"
    }
}

pub fn init(debug: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_logged_without_debug() {
        assert_eq!(default_directive(false), "error");
        assert!(default_directive(true).starts_with("info"));
    }
}
