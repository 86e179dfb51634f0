//! Server settings
//!
//! Settings are read from a YAML file. Values may use two custom tags:
//! - `!secret key` - substitute from `secrets.yaml` next to the settings file
//! - `!env_var VAR` - substitute an environment variable
//!
//! A missing settings file means all defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use automation_api::{ReloadScope, DEFAULT_LOG_FILE};
use automation_store::{DEFAULT_AUTOMATIONS_FILE, DEFAULT_STORAGE_KEY};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, trace};

use crate::error::{SettingsError, SettingsResult};

/// Environment variable naming the settings file
pub const SETTINGS_ENV_VAR: &str = "AUTOMATION_API_CONFIG";

/// Settings file used when neither an argument nor the environment names one
pub const DEFAULT_SETTINGS_FILE: &str = "automation_api.yaml";

/// Where automation records are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// The host's `automations.yaml`
    #[default]
    Yaml,
    /// A versioned envelope under `.storage/`
    Json,
}

/// Server settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// The host's configuration directory
    pub config_dir: PathBuf,
    /// Listen address
    pub bind: String,
    /// Base URL of the host's REST API
    pub hass_url: String,
    /// Long-lived access token for the host's REST API
    pub hass_token: Option<String>,
    pub store: StoreKind,
    /// Automations file, relative to `config_dir`
    pub automations_file: PathBuf,
    pub storage_key: String,
    /// Fixed API key; generated and stored on first start when unset
    pub api_key: Option<String>,
    pub reload_scope: ReloadScope,
    /// Activity log file, relative to `config_dir`
    pub log_file: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            bind: "0.0.0.0:8099".to_string(),
            hass_url: "http://127.0.0.1:8123".to_string(),
            hass_token: None,
            store: StoreKind::default(),
            automations_file: PathBuf::from(DEFAULT_AUTOMATIONS_FILE),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            api_key: None,
            reload_scope: ReloadScope::default(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            request_timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let secrets_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let secrets = Secrets::load(secrets_dir)?;

        Self::from_yaml(&content, path, &secrets)
    }

    fn from_yaml(content: &str, path: &Path, secrets: &Secrets) -> SettingsResult<Self> {
        let parse_error = |e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        };

        let value: Value = serde_yaml::from_str(content).map_err(parse_error)?;
        if value.is_null() {
            return Ok(Self::default());
        }

        let value = resolve_tags(value, secrets)?;
        let settings: Self = serde_yaml::from_value(value).map_err(parse_error)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> SettingsResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue {
                key: "request_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.storage_key.is_empty() || self.storage_key.contains(['/', '\\']) {
            return Err(SettingsError::InvalidValue {
                key: "storage_key".to_string(),
                reason: "must be a plain file name".to_string(),
            });
        }
        Ok(())
    }

    /// Full path of the automations file
    pub fn automations_path(&self) -> PathBuf {
        self.config_dir.join(&self.automations_file)
    }

    /// Full path of the activity log
    pub fn log_path(&self) -> PathBuf {
        self.config_dir.join(&self.log_file)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Pick the settings file: the first argument, then the environment, then the default
pub fn settings_path(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

/// Values from `secrets.yaml`
#[derive(Debug, Default)]
struct Secrets(HashMap<String, String>);

impl Secrets {
    fn load(dir: &Path) -> SettingsResult<Self> {
        let path = dir.join("secrets.yaml");
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| SettingsError::Read {
            path: path.clone(),
            source: e,
        })?;
        let raw: Option<HashMap<String, Value>> =
            serde_yaml::from_str(&content).map_err(|e| SettingsError::Parse {
                path: path.clone(),
                source: e,
            })?;

        let secrets = raw
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((k, value))
            })
            .collect::<HashMap<_, _>>();

        debug!("Loaded {} secrets from {:?}", secrets.len(), path);
        Ok(Self(secrets))
    }

    fn get(&self, key: &str) -> SettingsResult<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| SettingsError::SecretNotFound {
                key: key.to_string(),
            })
    }
}

fn resolve_tags(value: Value, secrets: &Secrets) -> SettingsResult<Value> {
    match value {
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            trace!("Resolving tag '{}'", tag);
            let name = match tagged.value {
                Value::String(s) => s,
                _ => {
                    return Err(SettingsError::InvalidValue {
                        key: tag,
                        reason: "tag argument must be a string".to_string(),
                    })
                }
            };
            match tag.as_str() {
                "!secret" => Ok(Value::String(secrets.get(&name)?.to_string())),
                "!env_var" => std::env::var(&name)
                    .map(Value::String)
                    .map_err(|_| SettingsError::EnvVarNotFound { var: name }),
                _ => Err(SettingsError::InvalidValue {
                    key: tag,
                    reason: "unsupported tag".to_string(),
                }),
            }
        }
        Value::Mapping(map) => {
            let mut result = serde_yaml::Mapping::new();
            for (k, v) in map {
                result.insert(k, resolve_tags(v, secrets)?);
            }
            Ok(Value::Mapping(result))
        }
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|v| resolve_tags(v, secrets))
            .collect::<SettingsResult<Vec<_>>>()
            .map(Value::Sequence),
        _ => Ok(value),
    }
}
