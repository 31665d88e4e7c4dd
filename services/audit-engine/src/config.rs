use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

use crate::errors::AuditError;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scraper: ScraperConfig,
    pub screening: ScreeningConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScraperConfig {
    pub webdriver_url: String,
    pub target_url: String,
    pub element_selector: String,
    pub wait_timeout_secs: u64,
    pub page_load_timeout_secs: u64,
    pub headless: bool,
    pub browser_args: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScreeningConfig {
    pub base_url: String,
    pub dataset: String,
    pub algorithm: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.workers", 4)?
            .set_default("server.allowed_origins", vec!["http://localhost:5173"])?
            .set_default("database.url", "postgresql://postgres@localhost:5432/postgres")?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("scraper.webdriver_url", "http://localhost:9515")?
            .set_default("scraper.target_url", "https://www.sanctionsmap.eu/#/main")?
            .set_default("scraper.element_selector", "a")?
            .set_default("scraper.wait_timeout_secs", 30)?
            .set_default("scraper.page_load_timeout_secs", 60)?
            .set_default("scraper.headless", true)?
            .set_default(
                "scraper.browser_args",
                vec!["--start-maximized", "--disable-dev-shm-usage", "--no-sandbox"],
            )?
            .set_default("screening.base_url", "https://api.opensanctions.org")?
            .set_default("screening.dataset", "default")?
            .set_default("screening.algorithm", "best")?
            .set_default("screening.api_key", "")?
            .set_default("screening.timeout_secs", 30)?;

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false));
        } else {
            builder = builder.add_source(
                File::with_name(&format!("config/{}", environment)).required(false),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("AUDIT_ENGINE")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.allowed_origins")
                .with_list_parse_key("scraper.browser_args")
                .try_parsing(true),
        );

        if let Some(db_url) = database_url_from_env() {
            builder = builder.set_override("database.url", db_url)?;
        }

        if let Ok(port) = env::var("SERVICE_PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        if let Ok(api_key) = env::var("SCREENING_API_KEY") {
            builder = builder.set_override("screening.api_key", api_key)?;
        }

        if let Ok(base_url) = env::var("SCREENING_BASE_URL") {
            builder = builder.set_override("screening.base_url", base_url)?;
        }

        if let Ok(webdriver_url) = env::var("WEBDRIVER_URL") {
            builder = builder.set_override("scraper.webdriver_url", webdriver_url)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), AuditError> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.database.url.is_empty() {
            return Err(invalid("Database URL is required"));
        }

        if self.scraper.element_selector.trim().is_empty() {
            return Err(invalid("Scraper element selector is required"));
        }

        if self.scraper.wait_timeout_secs == 0 || self.scraper.page_load_timeout_secs == 0 {
            return Err(invalid("Scraper timeouts must be greater than 0"));
        }

        if self.screening.algorithm.trim().is_empty() {
            return Err(invalid("Screening algorithm is required"));
        }

        if self.screening.timeout_secs == 0 {
            return Err(invalid("Screening timeout must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> AuditError {
    AuditError::Configuration(message.to_string())
}

/// `DATABASE_URL`, or a URL assembled from the discrete `DB_*` variables.
fn database_url_from_env() -> Option<String> {
    if let Ok(url) = env::var("DATABASE_URL") {
        return Some(url);
    }

    let host = env::var("DB_HOST").ok()?;
    Some(assemble_database_url(
        &host,
        env::var("DB_PORT").ok().as_deref(),
        env::var("DB_NAME").ok().as_deref(),
        env::var("DB_USER").ok().as_deref(),
        env::var("DB_PASSWORD").ok().as_deref(),
    ))
}

fn assemble_database_url(
    host: &str,
    port: Option<&str>,
    name: Option<&str>,
    user: Option<&str>,
    password: Option<&str>,
) -> String {
    let credentials = match (user, password) {
        (Some(user), Some(password)) => format!("{}:{}@", user, password),
        (Some(user), None) => format!("{}@", user),
        _ => String::new(),
    };

    format!(
        "postgresql://{}{}:{}/{}",
        credentials,
        host,
        port.unwrap_or("5432"),
        name.unwrap_or("postgres")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                workers: 2,
                allowed_origins: vec!["http://localhost:5173".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://postgres@localhost:5432/postgres".to_string(),
                max_connections: 5,
                acquire_timeout_secs: 5,
            },
            scraper: ScraperConfig {
                webdriver_url: "http://localhost:9515".to_string(),
                target_url: "https://www.sanctionsmap.eu/#/main".to_string(),
                element_selector: "a".to_string(),
                wait_timeout_secs: 30,
                page_load_timeout_secs: 60,
                headless: true,
                browser_args: vec![],
            },
            screening: ScreeningConfig {
                base_url: "https://api.opensanctions.org".to_string(),
                dataset: "default".to_string(),
                algorithm: "best".to_string(),
                api_key: String::new(),
                timeout_secs: 30,
            },
        }
    }

    #[test]
    fn test_sample_config_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_zero_wait_rejected() {
        let mut config = sample();
        config.scraper.wait_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(AuditError::Configuration(message)) if message.contains("timeouts")
        ));
    }

    #[test]
    fn test_zero_screening_timeout_rejected() {
        let mut config = sample();
        config.screening.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_assemble_database_url() {
        assert_eq!(
            assemble_database_url(
                "db",
                Some("5433"),
                Some("auditoria"),
                Some("auditor"),
                Some("s3cret")
            ),
            "postgresql://auditor:s3cret@db:5433/auditoria"
        );
        assert_eq!(
            assemble_database_url("localhost", None, None, None, None),
            "postgresql://localhost:5432/postgres"
        );
    }
}
