use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::utils::cookies::SameSite;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allow_origins: Vec<String>,
    pub access_token_secret: String,
    pub access_token_expiry_minutes: u64,
    pub refresh_token_secret: String,
    pub refresh_token_expiry_days: u64,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    pub upload_tmp_dir: PathBuf,
    pub media_dir: PathBuf,
    pub media_public_url: String,
    pub cloudinary: Option<CloudinaryConfig>,
    pub rate_limit_enabled: bool,
    pub rate_limit_auth_max_requests: u32,
    pub rate_limit_auth_window_seconds: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://vidtube.db?mode=rwc".to_string());

        let port = parse_var("PORT", 8000u16)?;

        let cors_allow_origins = env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let access_token_secret = env::var("ACCESS_TOKEN_SECRET")
            .unwrap_or_else(|_| "dev-access-secret-change-this-in-production".to_string());
        let refresh_token_secret = env::var("REFRESH_TOKEN_SECRET")
            .unwrap_or_else(|_| "dev-refresh-secret-change-this-in-production".to_string());
        if access_token_secret == refresh_token_secret {
            return Err(anyhow!(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ"
            ));
        }

        let access_token_expiry_minutes = parse_positive("ACCESS_TOKEN_EXPIRY_MINUTES", 15)?;
        let refresh_token_expiry_days = parse_positive("REFRESH_TOKEN_EXPIRY_DAYS", 10)?;

        let cookie_secure = parse_var("COOKIE_SECURE", true)?;
        let cookie_same_site = match env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "lax".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "lax" => SameSite::Lax,
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            other => return Err(anyhow!("Invalid COOKIE_SAME_SITE value: {}", other)),
        };

        let upload_tmp_dir = env::var("UPLOAD_TMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("vidtube-uploads"));
        let media_dir = env::var("MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./media"));
        let media_public_url = env::var("MEDIA_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}/media", port));

        let cloudinary = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            port,
            cors_allow_origins,
            access_token_secret,
            access_token_expiry_minutes,
            refresh_token_secret,
            refresh_token_expiry_days,
            cookie_secure,
            cookie_same_site,
            upload_tmp_dir,
            media_dir,
            media_public_url,
            cloudinary,
            rate_limit_enabled: parse_var("RATE_LIMIT_ENABLED", true)?,
            rate_limit_auth_max_requests: parse_var("RATE_LIMIT_AUTH_MAX_REQUESTS", 20u32)?,
            rate_limit_auth_window_seconds: parse_var("RATE_LIMIT_AUTH_WINDOW_SECONDS", 60u64)?,
        })
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_positive(key: &str, default: u64) -> anyhow::Result<u64> {
    let value = parse_var(key, default)?;
    if value == 0 {
        return Err(anyhow!("{} must be greater than zero", key));
    }
    Ok(value)
}
