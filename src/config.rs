const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_STORAGE_BUCKET: &str = "invoices";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub supabase_url: String,
    pub supabase_key: String,
    pub storage_bucket: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            google_api_key: required_secret("GOOGLE_API_KEY", std::env::var("GOOGLE_API_KEY"))?,
            gemini_model: std::env::var("GEMINI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: validate_http_url(
                "GEMINI_BASE_URL",
                std::env::var("GEMINI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            )?,
            supabase_url: std::env::var("SUPABASE_URL")
                .map_err(|_| anyhow::anyhow!("SUPABASE_URL environment variable required"))
                .and_then(|url| validate_http_url("SUPABASE_URL", url))?,
            supabase_key: required_secret(
                "SUPABASE_KEY",
                std::env::var("SUPABASE_KEY").or_else(|_| std::env::var("SUPABASE_ANON_KEY")),
            )?,
            storage_bucket: std::env::var("STORAGE_BUCKET")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string()),
        };

        // Secrets stay out of the logs
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Database host: {}", database_host(&config.database_url));
        tracing::debug!("Gemini model: {} @ {}", config.gemini_model, config.gemini_base_url);
        tracing::debug!(
            "Supabase URL: {} (bucket '{}')",
            config.supabase_url,
            config.storage_bucket
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn required_secret(name: &str, value: Result<String, std::env::VarError>) -> anyhow::Result<String> {
    let value = value.map_err(|_| anyhow::anyhow!("{} environment variable required", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    Ok(value)
}

/// Host part of a connection string, the only piece safe to log.
fn database_host(database_url: &str) -> String {
    url::Url::parse(database_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "<unparseable>".to_string())
}

/// Checks that `value` is an absolute http(s) URL and returns it without a trailing slash.
fn validate_http_url(name: &str, value: String) -> anyhow::Result<String> {
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    let parsed = url::Url::parse(value.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(value.trim().trim_end_matches('/').to_string())
}
