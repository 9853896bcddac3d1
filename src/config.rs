use std::path::{Path, PathBuf};

pub const DEFAULT_LLM_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "deepseek-chat";
const DB_FILE_NAME: &str = "stock_database.sqlite3";

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_path: PathBuf,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub db_max_connections: u32,
    pub environment: String,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
}

impl LlmSettings {
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_LLM_API_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            temperature: 0.7,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let base_path = std::env::var("STOCK_APP_BASE_PATH")
            .map(PathBuf::from)
            .or_else(|_| std::env::current_dir())
            .unwrap_or_else(|_| PathBuf::from("."));

        let configured_db = std::env::var("STOCK_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base_path.join(DB_FILE_NAME));
        let db_path = resolve_db_path(&base_path, configured_db);

        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(5000);

        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .filter(|&n: &u32| n > 0)
            .unwrap_or(8);

        let llm = LlmSettings {
            api_key: std::env::var("DEEPSEEK_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            api_url: std::env::var("DEEPSEEK_API_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_API_URL.to_string()),
            model: std::env::var("DEEPSEEK_MODEL")
                .unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            ..LlmSettings::default()
        };

        Self {
            base_path,
            db_path,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            allowed_origins: parse_origins(
                &std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            ),
            db_max_connections,
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            llm,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Returns the configured path if it exists, otherwise the first existing
/// fallback candidate, otherwise the configured path unchanged.
pub fn resolve_db_path(base_path: &Path, configured: PathBuf) -> PathBuf {
    if configured.exists() {
        return configured;
    }

    let candidates = [
        base_path.join("data").join(DB_FILE_NAME),
        PathBuf::from(".").join(DB_FILE_NAME),
    ];

    match candidates.into_iter().find(|c| c.exists()) {
        Some(found) => {
            tracing::info!("Database not found at {}, using {}", configured.display(), found.display());
            found
        }
        None => configured,
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
