use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::view::Language;
use crate::{
    CLASS_SCOPES, CLIENT_ID_KEY, CONTAINER_KEY, DEFAULT_AUTH_BASE, DEFAULT_COURSE_LABEL,
    DEFAULT_GRAPH_BASE, LANGUAGE_KEY, REDIRECT_URI_KEY, TEAM_SCOPES, TENANT_ID_KEY,
};

/// Which Graph surface the tab reads assignments from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Class,
    #[default]
    Team,
}

impl ContainerKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "class" | "education" => Some(Self::Class),
            "team" | "teams" => Some(Self::Team),
            _ => None,
        }
    }

    pub fn scopes(self) -> &'static [&'static str] {
        match self {
            ContainerKind::Class => CLASS_SCOPES,
            ContainerKind::Team => TEAM_SCOPES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub container: ContainerKind,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_course_label")]
    pub course_label: String,
    #[serde(default = "default_graph_base")]
    pub graph_base_url: String,
    #[serde(default = "default_auth_base")]
    pub auth_base_url: String,
}

fn default_course_label() -> String {
    DEFAULT_COURSE_LABEL.to_string()
}

fn default_graph_base() -> String {
    DEFAULT_GRAPH_BASE.to_string()
}

fn default_auth_base() -> String {
    DEFAULT_AUTH_BASE.to_string()
}

impl DashboardConfig {
    pub fn new(tenant_id: &str, client_id: &str, redirect_uri: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            container: ContainerKind::default(),
            language: Language::default(),
            course_label: default_course_label(),
            graph_base_url: default_graph_base(),
            auth_base_url: default_auth_base(),
        }
    }

    pub fn authority(&self) -> String {
        format!(
            "{}/{}",
            self.auth_base_url.trim_end_matches('/'),
            self.tenant_id
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tenant_id.trim().is_empty() {
            return Err(ConfigError::Invalid("tenant_id is required".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("client_id is required".to_string()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(ConfigError::Invalid("redirect_uri is required".to_string()));
        }
        for (name, url) in [
            ("redirect_uri", &self.redirect_uri),
            ("graph_base_url", &self.graph_base_url),
            ("auth_base_url", &self.auth_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be an absolute URL"
                )));
            }
        }
        Ok(())
    }
}

pub fn parse_config_value(val: &Value) -> Result<DashboardConfig, ConfigError> {
    let cfg = serde_json::from_value::<DashboardConfig>(val.clone())?;
    cfg.validate()?;
    Ok(cfg)
}

/// Reads config from a JSON document: a nested `config` object wins over
/// flat top-level keys.
pub fn load_config(input: &Value) -> Result<DashboardConfig, ConfigError> {
    if let Some(cfg) = input.get("config") {
        return parse_config_value(cfg);
    }
    let mut partial = serde_json::Map::new();
    let keys = [
        "tenant_id",
        "client_id",
        "redirect_uri",
        "container",
        "language",
        "course_label",
        "graph_base_url",
        "auth_base_url",
    ];
    for key in keys {
        if let Some(v) = input.get(key) {
            partial.insert(key.to_string(), v.clone());
        }
    }
    if partial.is_empty() {
        return Err(ConfigError::Invalid("no config keys present".to_string()));
    }
    parse_config_value(&Value::Object(partial))
}

pub fn load_config_file(path: &Path) -> Result<DashboardConfig, ConfigError> {
    let raw = fs::read(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
    let value: Value = serde_json::from_slice(&raw)?;
    load_config(&value)
}

/// Builds config from a key lookup, normally `std::env::var`.
pub fn load_config_from_lookup<F>(lookup: F) -> Result<DashboardConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &'static str| {
        lookup(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing(key))
    };
    let mut cfg = DashboardConfig::new(
        &required(TENANT_ID_KEY)?,
        &required(CLIENT_ID_KEY)?,
        &required(REDIRECT_URI_KEY)?,
    );
    if let Some(raw) = lookup(CONTAINER_KEY) {
        cfg.container = ContainerKind::parse(&raw)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown container: {raw}")))?;
    }
    if let Some(raw) = lookup(LANGUAGE_KEY) {
        cfg.language = Language::parse(&raw)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown language: {raw}")))?;
    }
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_config_from_env() -> Result<DashboardConfig, ConfigError> {
    load_config_from_lookup(|key| std::env::var(key).ok())
}
