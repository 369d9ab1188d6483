//! Application configuration loaded from environment variables.

use std::env;

use quill_infra::JwtConfig;

#[cfg(feature = "full")]
use quill_infra::{CloudinaryConfig, ServiceAccount};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[cfg(feature = "full")]
    #[error(transparent)]
    Credentials(#[from] quill_infra::CredentialsError),

    #[cfg(not(feature = "full"))]
    #[error("QUILL_BACKEND=firebase needs a build with the `full` feature")]
    HostedBackendUnavailable,
}

/// Hosted-service settings, all required in firebase mode.
#[cfg(feature = "full")]
#[derive(Debug, Clone)]
pub struct FirebaseSettings {
    pub service_account: ServiceAccount,
    pub web_api_key: String,
    pub cloudinary: CloudinaryConfig,
}

/// Which adapters back the ports.
#[derive(Debug, Clone)]
pub enum Backend {
    #[cfg(feature = "full")]
    Firebase(FirebaseSettings),
    /// Everything in process; data is lost on restart.
    Memory { jwt: JwtConfig },
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "full")]
            Backend::Firebase(_) => "firebase",
            Backend::Memory { .. } => "memory",
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: Backend,
    pub max_upload_bytes: usize,
    /// `None` allows any origin.
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                reason: format!("{e}"),
            })?,
            None => 8080,
        };

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "MAX_UPLOAD_BYTES",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS").and_then(|raw| {
            let origins: Vec<String> = raw
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            if origins.is_empty() || origins.iter().any(|o| o == "*") {
                None
            } else {
                Some(origins)
            }
        });

        let backend = match var("QUILL_BACKEND")
            .map(|b| b.trim().to_lowercase())
            .as_deref()
        {
            None | Some("firebase") => Self::firebase_backend(&var)?,
            Some("memory") => Backend::Memory {
                jwt: Self::jwt_config(&var)?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "QUILL_BACKEND",
                    reason: format!("expected `firebase` or `memory`, got `{other}`"),
                });
            }
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            backend,
            max_upload_bytes,
            cors_allowed_origins,
        })
    }

    #[cfg(feature = "full")]
    fn firebase_backend(var: &impl Fn(&str) -> Option<String>) -> Result<Backend, ConfigError> {
        let path = var("GOOGLE_APPLICATION_CREDENTIALS")
            .ok_or(ConfigError::Missing("GOOGLE_APPLICATION_CREDENTIALS"))?;
        let service_account = ServiceAccount::from_file(path.trim())?;

        let web_api_key =
            var("FIREBASE_WEB_API_KEY").ok_or(ConfigError::Missing("FIREBASE_WEB_API_KEY"))?;

        let cloudinary_url = var("CLOUDINARY_URL").ok_or(ConfigError::Missing("CLOUDINARY_URL"))?;
        let cloudinary =
            CloudinaryConfig::from_url(&cloudinary_url).map_err(|e| ConfigError::Invalid {
                var: "CLOUDINARY_URL",
                reason: e.to_string(),
            })?;

        Ok(Backend::Firebase(FirebaseSettings {
            service_account,
            web_api_key: web_api_key.trim().to_string(),
            cloudinary,
        }))
    }

    #[cfg(not(feature = "full"))]
    fn firebase_backend(_var: &impl Fn(&str) -> Option<String>) -> Result<Backend, ConfigError> {
        Err(ConfigError::HostedBackendUnavailable)
    }

    fn jwt_config(var: &impl Fn(&str) -> Option<String>) -> Result<JwtConfig, ConfigError> {
        let defaults = JwtConfig::default();

        let secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("Using default JWT secret for local id tokens. Set JWT_SECRET to override.");
                defaults.secret
            }
        };

        let expiration_hours = match var("JWT_EXPIRATION_HOURS") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "JWT_EXPIRATION_HOURS",
                reason: format!("{e}"),
            })?,
            None => defaults.expiration_hours,
        };

        Ok(JwtConfig {
            secret,
            expiration_hours,
            issuer: var("JWT_ISSUER").unwrap_or(defaults.issuer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_memory_backend_defaults() {
        let config = load(&[("QUILL_BACKEND", "memory")]).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.cors_allowed_origins.is_none());
        assert_eq!(config.backend.name(), "memory");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = load(&[
            ("QUILL_BACKEND", "Memory"),
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("MAX_UPLOAD_BYTES", "1024"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("JWT_EXPIRATION_HOURS", "2"),
        ])
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(
            config.cors_allowed_origins,
            Some(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
        match config.backend {
            Backend::Memory { jwt } => assert_eq!(jwt.expiration_hours, 2),
            #[allow(unreachable_patterns)]
            _ => panic!("expected memory backend"),
        }
    }

    #[test]
    fn test_wildcard_origin_allows_any() {
        let config = load(&[("QUILL_BACKEND", "memory"), ("CORS_ALLOWED_ORIGINS", "*")]).unwrap();
        assert!(config.cors_allowed_origins.is_none());
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let result = load(&[("QUILL_BACKEND", "memory"), ("PORT", "eighty")]);
        assert!(matches!(result, Err(ConfigError::Invalid { var: "PORT", .. })));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result = load(&[("QUILL_BACKEND", "postgres")]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                var: "QUILL_BACKEND",
                ..
            })
        ));
    }

    #[cfg(feature = "full")]
    #[test]
    fn test_firebase_requires_credentials_path() {
        let result = load(&[]);
        assert!(matches!(
            result,
            Err(ConfigError::Missing("GOOGLE_APPLICATION_CREDENTIALS"))
        ));
    }

    #[cfg(feature = "full")]
    #[test]
    fn test_missing_credential_file_is_fatal() {
        let result = load(&[
            ("GOOGLE_APPLICATION_CREDENTIALS", "/nonexistent/key.json"),
            ("FIREBASE_WEB_API_KEY", "k"),
            ("CLOUDINARY_URL", "cloudinary://k:s@demo"),
        ]);
        assert!(matches!(result, Err(ConfigError::Credentials(_))));
    }

    #[cfg(not(feature = "full"))]
    #[test]
    fn test_firebase_needs_full_build() {
        let result = load(&[]);
        assert!(matches!(result, Err(ConfigError::HostedBackendUnavailable)));
    }
}
