use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration, read once at startup and injected into `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub api_base_url: String,
    pub avatars_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub max_avatar_bytes: usize,
    pub sendgrid_api_key: Option<String>,
    pub mail_from: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_or("PORT", 3000)?;
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let api_base_url = env::var("API_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "contacts-service".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "contacts-api".to_string()),
            jwt_ttl_minutes: parse_or("JWT_TTL_MINUTES", 60)?,
            bcrypt_cost: parse_or("BCRYPT_COST", 10)?,
            api_base_url,
            avatars_dir: env::var("AVATARS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public/avatars")),
            tmp_dir: env::var("TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("tmp")),
            max_avatar_bytes: parse_or("MAX_AVATAR_BYTES", 5 * 1024 * 1024)?,
            sendgrid_api_key: env::var("SENDGRID_API_KEY").ok().filter(|key| !key.is_empty()),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@contacts.local".to_string()),
            cors_origins,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl AppConfig {
    /// Config for route tests: cheap bcrypt, throwaway directories, no mail provider.
    pub fn for_tests() -> Self {
        let scratch = env::temp_dir().join(format!("contacts-service-{}", uuid::Uuid::new_v4()));
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_url: "mongodb://localhost:27017/contacts_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "contacts-service".to_string(),
            jwt_audience: "contacts-api".to_string(),
            jwt_ttl_minutes: 60,
            bcrypt_cost: 4,
            api_base_url: "http://localhost:3000".to_string(),
            avatars_dir: scratch.join("avatars"),
            tmp_dir: scratch.join("tmp"),
            max_avatar_bytes: 1024 * 1024,
            sendgrid_api_key: None,
            mail_from: "no-reply@contacts.local".to_string(),
            cors_origins: Vec::new(),
        }
    }
}
