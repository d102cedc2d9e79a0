// src/config/mod.rs
// All values come from the environment (.env supported); defaults below.

use once_cell::sync::Lazy;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    // ── Model backend
    pub api_base_url: String,
    pub api_key: String,
    pub model: String,
    /// Transport-level retry count for transient backend failures.
    pub transport_retries: usize,

    // ── Data store
    pub database_url: String,

    // ── Chart artifacts
    pub charts_dir: String,
    pub static_root: String,

    // ── Server
    pub host: String,
    pub port: u16,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean = val.split('#').next().unwrap_or("").trim();
            match clean.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => default,
            }
        }
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("Warning: .env file not found. Using environment variables and defaults.");
        }

        Self {
            api_base_url: env_var_or(
                "API_BASE_URL",
                "https://api.groq.com/openai/v1".to_string(),
            ),
            api_key: env_var_or("API_KEY", "dummy_key".to_string()),
            model: env_var_or("MODEL_NAME", "openai/gpt-oss-120b".to_string()),
            transport_retries: env_var_or("TRANSPORT_RETRIES", 10),
            database_url: env_var_or("DATABASE_URL", "sqlite:demo.db".to_string()),
            charts_dir: env_var_or("CHARTS_DIR", "static/charts".to_string()),
            static_root: env_var_or("STATIC_ROOT", "static".to_string()),
            host: env_var_or("HOST", "0.0.0.0".to_string()),
            port: env_var_or("PORT", 8000),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_unset() {
        let parsed: u16 = env_var_or("QUERYDESK_TEST_MISSING_PORT", 8000);
        assert_eq!(parsed, 8000);
    }

    #[test]
    fn comments_and_whitespace_stripped() {
        std::env::set_var("QUERYDESK_TEST_RETRIES", " 5 # keep low in dev");
        let parsed: usize = env_var_or("QUERYDESK_TEST_RETRIES", 10);
        assert_eq!(parsed, 5);
        std::env::remove_var("QUERYDESK_TEST_RETRIES");
    }

    #[test]
    fn unparsable_value_falls_back() {
        std::env::set_var("QUERYDESK_TEST_PORT", "not-a-port");
        let parsed: u16 = env_var_or("QUERYDESK_TEST_PORT", 8000);
        assert_eq!(parsed, 8000);
        std::env::remove_var("QUERYDESK_TEST_PORT");
    }
}
