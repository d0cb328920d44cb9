use platform_core::config as core_config;
use platform_core::error::AppError;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub authz: AuthzSettings,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum JwtAlgorithm {
    Rs256,
    Hs256,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub algorithm: JwtAlgorithm,
    pub public_key_path: Option<String>,
    pub hmac_secret: Option<String>,
}

/// Knobs of the authorization engine itself.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthzSettings {
    /// Header carrying the bearer credential. Stored lowercase.
    pub header_name: String,
    /// Scheme token expected before the opaque value.
    pub scheme: String,
    /// Sentinel role honored by policies with the admin override enabled.
    pub admin_role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl AuthzConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AuthzConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("authz-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            jwt: JwtConfig {
                algorithm: get_env("JWT_ALGORITHM", Some("rs256"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                public_key_path: env::var("JWT_PUBLIC_KEY_PATH").ok(),
                hmac_secret: env::var("JWT_HMAC_SECRET").ok(),
            },
            authz: AuthzSettings {
                header_name: get_env("AUTHZ_HEADER_NAME", Some("authorization"), is_prod)?
                    .to_lowercase(),
                scheme: get_env("AUTHZ_SCHEME", Some("Bearer"), is_prod)?,
                admin_role: get_env("AUTHZ_ADMIN_ROLE", Some("admin"), is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.authz.header_name.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "AUTHZ_HEADER_NAME must not be empty"
            )));
        }

        if self.authz.scheme.is_empty() || self.authz.scheme.contains(' ') {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "AUTHZ_SCHEME must be a single token"
            )));
        }

        if self.authz.admin_role.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "AUTHZ_ADMIN_ROLE must not be empty"
            )));
        }

        match self.jwt.algorithm {
            JwtAlgorithm::Rs256 if self.jwt.public_key_path.is_none() => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_PUBLIC_KEY_PATH is required when JWT_ALGORITHM is rs256"
                )));
            }
            JwtAlgorithm::Hs256 if self.jwt.hmac_secret.is_none() => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_HMAC_SECRET is required when JWT_ALGORITHM is hs256"
                )));
            }
            _ => {}
        }

        // In production, ensure stricter validation
        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.jwt.algorithm == JwtAlgorithm::Hs256 {
                tracing::warn!(
                    "HS256 token verification in production shares the signing secret with this service - prefer rs256"
                );
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for JwtAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rs256" => Ok(JwtAlgorithm::Rs256),
            "hs256" => Ok(JwtAlgorithm::Hs256),
            _ => Err(format!("Invalid JWT algorithm: {}", s)),
        }
    }
}
