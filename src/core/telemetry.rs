use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

// sqlx logs every statement at info; attempt traffic would drown the engine events.
const QUIET_DEPENDENCIES: &str = "sqlx=warn,hyper=warn";

pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&settings.telemetry().log_level)));

    let builder = fmt().with_env_filter(filter).with_target(false);

    if settings.telemetry().json {
        builder
            .json()
            .with_current_span(true)
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    } else {
        builder
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    }

    Ok(())
}

fn default_directive(log_level: &str) -> String {
    let level = log_level.trim();
    if level.is_empty() {
        return format!("info,{QUIET_DEPENDENCIES}");
    }
    if level.contains('=') {
        return level.to_string();
    }
    format!("{level},{QUIET_DEPENDENCIES}")
}
