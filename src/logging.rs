use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives appended to the configured level so per-statement sqlx
/// chatter stays out of `info` output.
const QUIET_DEPENDENCIES: &[&str] = &["sqlx=warn", "hyper=warn", "reqwest=warn"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            loki_enabled: std::env::var("LOKI_ENABLED")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            loki_url: std::env::var("LOKI_URL").ok().filter(|u| !u.trim().is_empty()),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "kabuscope".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err("LOKI_ENABLED is true but LOKI_URL is not set".to_string());
        }
        Ok(())
    }

    /// The configured filter, or `info` when `RUST_LOG` does not parse.
    /// Explicit directives for the quieted crates win over the defaults.
    pub fn env_filter(&self) -> EnvFilter {
        let mut directives = vec![self.log_level.clone()];
        for quiet in QUIET_DEPENDENCIES {
            let target = quiet.split('=').next().unwrap_or_default();
            if !self.log_level.contains(target) {
                directives.push(quiet.to_string());
            }
        }

        EnvFilter::try_new(directives.join(",")).unwrap_or_else(|e| {
            eprintln!("Invalid RUST_LOG {:?} ({}), falling back to info", self.log_level, e);
            EnvFilter::new("info")
        })
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let registry = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(tracing_subscriber::fmt::layer());

    #[cfg(feature = "loki")]
    {
        if let (true, Some(loki_url)) = (config.loki_enabled, config.loki_url.as_deref()) {
            let (loki_layer, task) = tracing_loki::builder()
                .label("service", &config.service_name)?
                .label("environment", &config.environment)?
                .build_url(url::Url::parse(loki_url)?)?;

            // Ships buffered events for the lifetime of the process
            tokio::spawn(task);
            registry.with(loki_layer).try_init()?;

            tracing::info!(
                "Logging to console and Loki at {} (service: {}, environment: {})",
                loki_url, config.service_name, config.environment
            );
            return Ok(());
        }
    }

    registry.try_init()?;
    tracing::info!(
        "Console logging initialized (level: {}, environment: {})",
        config.log_level, config.environment
    );
    Ok(())
}
