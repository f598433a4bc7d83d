//! Persisted provider settings.
//!
//! Settings live in `<config dir>/gitpop/settings.toml`. The file is edited
//! with `toml_edit` so comments and layout survive `gitpop config set`, and
//! every write goes through a temporary file that is renamed into place.

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::ExposeSecret;
use tempfile::NamedTempFile;
use toml_edit::{DocumentMut, Item};
use tracing::debug;

use crate::error::SettingsError;
use crate::llm::{Endpoints, ProviderConfig, ProviderKind, credential};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV_VAR: &str = "GITPOP_API_KEY";

/// Keys accepted in the settings file.
pub const SETTING_KEYS: &[&str] = &[
    "provider",
    "model",
    "api_key",
    "base_url",
    "local_endpoint",
    "timeout_secs",
    "diff_budget",
    "auto_generate",
];

/// Load and save the active [`ProviderConfig`].
pub trait SettingsStore {
    fn load(&self) -> Result<ProviderConfig, SettingsError>;
    fn save(&self, config: &ProviderConfig) -> Result<(), SettingsError>;
}

/// TOML file backed [`SettingsStore`].
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the per-user default location.
    pub fn default_location() -> Result<Self, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(dir.join("gitpop").join("settings.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set one key, keeping the rest of the file as it is.
    ///
    /// An empty value removes the key. The resulting settings are validated
    /// before anything is written.
    pub fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        if !SETTING_KEYS.contains(&key) {
            return Err(SettingsError::InvalidValue {
                key: key.to_string(),
                reason: format!("unknown setting (expected one of: {})", SETTING_KEYS.join(", ")),
            });
        }

        let mut doc = self.read_document()?;
        let value = value.trim();

        if value.is_empty() {
            doc.remove(key);
        } else {
            doc[key] = parse_value(key, value)?;
        }

        config_from_document(&doc, &self.path)?;
        self.write_document(&doc)?;
        debug!("Updated setting '{}' in {}", key, self.path.display());
        Ok(())
    }

    fn read_document(&self) -> Result<DocumentMut, SettingsError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(DocumentMut::new()),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        content
            .parse::<DocumentMut>()
            .map_err(|e| SettingsError::Parse {
                path: self.path.clone(),
                reason: format!("Invalid TOML: {}", e),
            })
    }

    fn write_document(&self, doc: &DocumentMut) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(write_err)?;

        // NamedTempFile is created with owner-only permissions.
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(doc.to_string().as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<ProviderConfig, SettingsError> {
        let doc = self.read_document()?;
        let mut config = config_from_document(&doc, &self.path)?;

        match env::var(API_KEY_ENV_VAR) {
            Ok(key) if !key.trim().is_empty() => {
                debug!("Using API key from {}", API_KEY_ENV_VAR);
                config.credential = Some(credential(key.trim()));
            }
            _ => {}
        }

        Ok(config)
    }

    fn save(&self, config: &ProviderConfig) -> Result<(), SettingsError> {
        let mut doc = self.read_document()?;

        doc["provider"] = toml_edit::value(config.kind.key());
        doc["model"] = toml_edit::value(config.model.as_str());
        match config.kind.base_url() {
            Some(url) => doc["base_url"] = toml_edit::value(url),
            None => {
                doc.remove("base_url");
            }
        }
        match &config.credential {
            Some(key) => doc["api_key"] = toml_edit::value(key.expose_secret().as_str()),
            None => {
                doc.remove("api_key");
            }
        }
        doc["local_endpoint"] = toml_edit::value(config.endpoints.local.as_str());
        doc["timeout_secs"] = toml_edit::value(config.timeout.as_secs() as i64);
        doc["diff_budget"] = toml_edit::value(config.diff_budget as i64);
        doc["auto_generate"] = toml_edit::value(config.auto_generate);

        self.write_document(&doc)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

fn parse_value(key: &str, value: &str) -> Result<Item, SettingsError> {
    let invalid = |reason: &str| SettingsError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    match key {
        "timeout_secs" | "diff_budget" => {
            let n = value
                .parse::<u32>()
                .map_err(|_| invalid("expected a positive whole number"))?;
            if n == 0 {
                return Err(invalid("must be greater than zero"));
            }
            Ok(toml_edit::value(i64::from(n)))
        }
        "auto_generate" => {
            let b = value
                .parse::<bool>()
                .map_err(|_| invalid("expected true or false"))?;
            Ok(toml_edit::value(b))
        }
        _ => Ok(toml_edit::value(value)),
    }
}

/// Build a [`ProviderConfig`] from a parsed settings document.
///
/// Missing keys take their defaults; present keys of the wrong type are errors.
pub fn config_from_document(doc: &DocumentMut, path: &Path) -> Result<ProviderConfig, SettingsError> {
    let provider = get_str(doc, "provider")?.unwrap_or("local");
    let base_url = get_str(doc, "base_url")?;
    let kind = ProviderKind::from_key(provider, base_url).map_err(|reason| {
        SettingsError::InvalidValue {
            key: "provider".to_string(),
            reason,
        }
    })?;

    let mut config = ProviderConfig::new(kind);

    if let Some(model) = get_str(doc, "model")?.filter(|m| !m.trim().is_empty()) {
        config.model = model.trim().to_string();
    }
    if let Some(key) = get_str(doc, "api_key")?.filter(|k| !k.trim().is_empty()) {
        config.credential = Some(credential(key.trim()));
    }
    if let Some(endpoint) = get_str(doc, "local_endpoint")?.filter(|e| !e.trim().is_empty()) {
        config.endpoints = Endpoints {
            local: endpoint.trim().to_string(),
            ..Endpoints::default()
        };
    }
    if let Some(secs) = get_positive(doc, "timeout_secs")? {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(budget) = get_positive(doc, "diff_budget")? {
        config.diff_budget = usize::try_from(budget).unwrap_or(usize::MAX);
    }
    if let Some(item) = doc.get("auto_generate") {
        config.auto_generate = item.as_bool().ok_or_else(|| wrong_type("auto_generate", "a boolean"))?;
    }

    debug!("Loaded {} settings from {}", config.kind, path.display());
    Ok(config)
}

fn get_str<'a>(doc: &'a DocumentMut, key: &str) -> Result<Option<&'a str>, SettingsError> {
    match doc.get(key) {
        None => Ok(None),
        Some(item) => item
            .as_str()
            .map(Some)
            .ok_or_else(|| wrong_type(key, "a string")),
    }
}

fn get_positive(doc: &DocumentMut, key: &str) -> Result<Option<u64>, SettingsError> {
    match doc.get(key) {
        None => Ok(None),
        Some(item) => item
            .as_integer()
            .and_then(|n| u64::try_from(n).ok())
            .filter(|n| *n > 0)
            .map(Some)
            .ok_or_else(|| wrong_type(key, "a positive integer")),
    }
}

fn wrong_type(key: &str, expected: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        reason: format!("expected {}", expected),
    }
}
