use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_NETLIFY_API_BASE: &str = "https://api.netlify.com/api/v1";
pub const DEFAULT_FIREBASE_API_BASE: &str = "https://firebasehosting.googleapis.com/v1beta1";

/// Frontends allowed to call the API when nothing else is configured.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://pabriklanding.web.app",
    "http://localhost:5500",
    "http://127.0.0.1:5500",
];

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub gemini: GeminiConfig,
    pub netlify: NetlifyConfig,
    pub firebase: FirebaseConfig,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct NetlifyConfig {
    pub access_token: Option<String>,
    /// Team the new sites are created under.
    pub account_slug: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Service account key, as the JSON document Google issues.
    pub service_account_json: Option<String>,
    /// Overrides the service account's own `project_id`.
    pub project_id: Option<String>,
    pub api_base: String,
}

/// Raw TOML configuration structure. Every key is optional; defaults and
/// environment overrides are applied in [`ServerConfig::from_sources`].
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    gemini: RawGemini,
    #[serde(default)]
    netlify: RawNetlify,
    #[serde(default)]
    firebase: RawFirebase,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGemini {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNetlify {
    access_token: Option<String>,
    account_slug: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFirebase {
    service_account_json: Option<String>,
    service_account_file: Option<String>,
    project_id: Option<String>,
    api_base: Option<String>,
}

impl ServerConfig {
    /// Load configuration from an optional TOML file plus the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(p) => Some(fs::read_to_string(p).map_err(|e| {
                Error::ConfigParse(format!("Failed to read {}: {}", p.display(), e))
            })?),
            None => None,
        };
        let base_dir = path.and_then(Path::parent).map(Path::to_path_buf);

        Self::from_sources(content.as_deref(), base_dir, |key| std::env::var(key).ok())
    }

    /// Build configuration from TOML text and an environment lookup.
    ///
    /// Environment values win over the file. Blank environment values are
    /// ignored. `base_dir` anchors a relative `service_account_file`.
    pub fn from_sources<F>(toml_content: Option<&str>, base_dir: Option<PathBuf>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = match toml_content {
            Some(content) => toml::from_str(content)?,
            None => RawConfig::default(),
        };
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match env("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|e| Error::ConfigParse(format!("Invalid PORT '{}': {}", value, e)))?,
            None => raw.server.port.unwrap_or(DEFAULT_PORT),
        };

        let request_timeout_secs = match env("REQUEST_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map_err(|e| {
                Error::ConfigParse(format!("Invalid REQUEST_TIMEOUT_SECS '{}': {}", value, e))
            })?,
            None => raw
                .server
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        if request_timeout_secs == 0 {
            return Err(Error::ConfigParse(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let mut allowed_origins = raw.server.allowed_origins.unwrap_or_else(|| {
            DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
        if let Some(list) = env("ALLOWED_ORIGINS") {
            allowed_origins.extend(list.split(',').map(str::to_string));
        }
        if let Some(hosting_url) = env("FIREBASE_HOSTING_URL") {
            allowed_origins.push(hosting_url);
        }
        let allowed_origins = normalize_origins(allowed_origins);

        let service_account_json = match env("FIREBASE_SERVICE_ACCOUNT_JSON")
            .or(raw.firebase.service_account_json)
        {
            Some(json) => Some(json),
            None => match raw.firebase.service_account_file {
                Some(file) => Some(read_service_account_file(&file, base_dir.as_deref())?),
                None => None,
            },
        };

        Ok(ServerConfig {
            host: env("HOST")
                .or(raw.server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            allowed_origins,
            request_timeout_secs,
            gemini: GeminiConfig {
                api_key: env("GEMINI_API_KEY").or(raw.gemini.api_key),
                model: env("GEMINI_MODEL")
                    .or(raw.gemini.model)
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: trim_base(
                    raw.gemini
                        .base_url
                        .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
                ),
            },
            netlify: NetlifyConfig {
                access_token: env("NETLIFY_ACCESS_TOKEN").or(raw.netlify.access_token),
                account_slug: env("NETLIFY_ACCOUNT_SLUG").or(raw.netlify.account_slug),
                api_base: trim_base(
                    raw.netlify
                        .api_base
                        .unwrap_or_else(|| DEFAULT_NETLIFY_API_BASE.to_string()),
                ),
            },
            firebase: FirebaseConfig {
                service_account_json,
                project_id: env("FIREBASE_PROJECT_ID").or(raw.firebase.project_id),
                api_base: trim_base(
                    raw.firebase
                        .api_base
                        .unwrap_or_else(|| DEFAULT_FIREBASE_API_BASE.to_string()),
                ),
            },
        })
    }
}

/// Trim, drop trailing slashes and duplicates; order is preserved.
fn normalize_origins(origins: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(origins.len());
    for origin in origins {
        let origin = origin.trim().trim_end_matches('/').to_string();
        if !origin.is_empty() && !normalized.contains(&origin) {
            normalized.push(origin);
        }
    }
    normalized
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn read_service_account_file(file: &str, base_dir: Option<&Path>) -> Result<String> {
    let path = Path::new(file);
    let path = match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    };
    fs::read_to_string(&path).map_err(|e| {
        Error::ConfigParse(format!(
            "Failed to read service_account_file {}: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = ServerConfig::from_sources(None, None, env_of(&[])).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.allowed_origins.len(), DEFAULT_ALLOWED_ORIGINS.len());
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert!(config.gemini.api_key.is_none());
        assert!(config.netlify.access_token.is_none());
        assert!(config.firebase.service_account_json.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::from_sources(
            None,
            None,
            env_of(&[
                ("PORT", "8080"),
                ("GEMINI_API_KEY", "gk"),
                ("GEMINI_MODEL", "gemini-test"),
                ("NETLIFY_ACCESS_TOKEN", "nt"),
                ("NETLIFY_ACCOUNT_SLUG", "pabrik-landing"),
                ("FIREBASE_PROJECT_ID", "proj"),
                ("FIREBASE_SERVICE_ACCOUNT_JSON", "{}"),
            ]),
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.gemini.api_key.as_deref(), Some("gk"));
        assert_eq!(config.gemini.model, "gemini-test");
        assert_eq!(config.netlify.access_token.as_deref(), Some("nt"));
        assert_eq!(config.netlify.account_slug.as_deref(), Some("pabrik-landing"));
        assert_eq!(config.firebase.project_id.as_deref(), Some("proj"));
        assert_eq!(config.firebase.service_account_json.as_deref(), Some("{}"));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let config = ServerConfig::from_sources(
            Some("[gemini]\napi_key = \"from-file\"\n"),
            None,
            env_of(&[("GEMINI_API_KEY", "  ")]),
        )
        .unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = ServerConfig::from_sources(None, None, env_of(&[("PORT", "http")]));
        assert!(result.unwrap_err().to_string().contains("Invalid PORT"));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = ServerConfig::from_sources(
            Some("[server]\nrequest_timeout_secs = 0\n"),
            None,
            env_of(&[]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_origins_are_extended_and_normalized() {
        let config = ServerConfig::from_sources(
            None,
            None,
            env_of(&[
                ("ALLOWED_ORIGINS", "https://a.test/, https://b.test,,http://localhost:5500"),
                ("FIREBASE_HOSTING_URL", "https://app.web.app"),
            ]),
        )
        .unwrap();

        assert!(config.allowed_origins.contains(&"https://a.test".to_string()));
        assert!(config.allowed_origins.contains(&"https://b.test".to_string()));
        assert!(config.allowed_origins.contains(&"https://app.web.app".to_string()));
        let localhost = config
            .allowed_origins
            .iter()
            .filter(|o| *o == "http://localhost:5500")
            .count();
        assert_eq!(localhost, 1);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 3000
allowed_origins = ["https://only.test"]
request_timeout_secs = 30

[gemini]
api_key = "key"
model = "gemini-pro"
base_url = "http://localhost:9999/v1beta/"

[netlify]
access_token = "tok"
account_slug = "team"

[firebase]
project_id = "my-project"
service_account_json = "{}"
"#;

        let config = ServerConfig::from_sources(Some(toml), None, env_of(&[])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.allowed_origins, vec!["https://only.test".to_string()]);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.gemini.base_url, "http://localhost:9999/v1beta");
        assert_eq!(config.netlify.api_base, DEFAULT_NETLIFY_API_BASE);
        assert_eq!(config.firebase.project_id.as_deref(), Some("my-project"));
    }

    #[test]
    fn test_unknown_key_is_a_parse_error() {
        let result = ServerConfig::from_sources(Some("[server]\nprot = 1\n"), None, env_of(&[]));
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_service_account_file_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sa.json"), r#"{"type":"service_account"}"#).unwrap();
        fs::write(
            dir.path().join("landing-kit.toml"),
            "[firebase]\nservice_account_file = \"sa.json\"\n",
        )
        .unwrap();

        let content = fs::read_to_string(dir.path().join("landing-kit.toml")).unwrap();
        let config = ServerConfig::from_sources(
            Some(&content),
            Some(dir.path().to_path_buf()),
            env_of(&[]),
        )
        .unwrap();

        assert_eq!(
            config.firebase.service_account_json.as_deref(),
            Some(r#"{"type":"service_account"}"#)
        );
    }

    #[test]
    fn test_missing_service_account_file_is_an_error() {
        let result = ServerConfig::from_sources(
            Some("[firebase]\nservice_account_file = \"/nonexistent/sa.json\"\n"),
            None,
            env_of(&[]),
        );
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("service_account_file")
        );
    }
}
