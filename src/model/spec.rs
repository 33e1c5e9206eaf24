use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of value an override record can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideKind {
    Variable,
    Manifest,
    ConfigFile,
    ApplicationSettings,
    ConnectionStrings,
}

impl OverrideKind {
    pub const ALL: [OverrideKind; 5] = [
        OverrideKind::Variable,
        OverrideKind::Manifest,
        OverrideKind::ConfigFile,
        OverrideKind::ApplicationSettings,
        OverrideKind::ConnectionStrings,
    ];

    /// Key of this kind inside a record's `spec` map
    pub fn spec_key(&self) -> &'static str {
        match self {
            OverrideKind::Variable => "variables",
            OverrideKind::Manifest => "manifests",
            OverrideKind::ConfigFile => "configFiles",
            OverrideKind::ApplicationSettings => "applicationSettings",
            OverrideKind::ConnectionStrings => "connectionStrings",
        }
    }

    /// Single-object kinds allow at most one row per section
    pub fn is_single(&self) -> bool {
        matches!(
            self,
            OverrideKind::ApplicationSettings | OverrideKind::ConnectionStrings
        )
    }
}

impl fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VariableType {
    #[default]
    String,
    Number,
    Secret,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type", default)]
    pub variable_type: VariableType,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Variable {
    pub fn string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            variable_type: VariableType::String,
            value: serde_json::Value::String(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestConfig {
    pub identifier: String,
    #[serde(rename = "type")]
    pub manifest_type: String,
    #[serde(default)]
    pub spec: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestOverride {
    pub manifest: ManifestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub identifier: String,
    #[serde(default)]
    pub spec: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFileOverride {
    pub config_file: ConfigFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(rename = "type")]
    pub store_type: String,
    #[serde(default)]
    pub spec: serde_json::Value,
}

/// Shape shared by application settings and connection strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfigWrapper {
    pub store: StoreConfig,
}

/// One concrete override value, discriminated by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum OverrideValue {
    Variable(Variable),
    Manifest(ManifestOverride),
    ConfigFile(ConfigFileOverride),
    ApplicationSettings(StoreConfigWrapper),
    ConnectionStrings(StoreConfigWrapper),
}

impl OverrideValue {
    pub fn kind(&self) -> OverrideKind {
        match self {
            OverrideValue::Variable(_) => OverrideKind::Variable,
            OverrideValue::Manifest(_) => OverrideKind::Manifest,
            OverrideValue::ConfigFile(_) => OverrideKind::ConfigFile,
            OverrideValue::ApplicationSettings(_) => OverrideKind::ApplicationSettings,
            OverrideValue::ConnectionStrings(_) => OverrideKind::ConnectionStrings,
        }
    }

    pub fn variable(name: &str, value: &str) -> Self {
        OverrideValue::Variable(Variable::string(name, value))
    }
}

/// The `spec` map of an override record, one field per kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<ManifestOverride>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_files: Vec<ConfigFileOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_settings: Option<StoreConfigWrapper>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_strings: Option<StoreConfigWrapper>,
}

impl OverrideSpec {
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
            && self.manifests.is_empty()
            && self.config_files.is_empty()
            && self.application_settings.is_none()
            && self.connection_strings.is_none()
    }

    /// Flattens the spec into values, kind by kind in `OverrideKind::ALL` order
    pub fn values(&self) -> Vec<OverrideValue> {
        let mut values = Vec::new();
        values.extend(self.variables.iter().cloned().map(OverrideValue::Variable));
        values.extend(self.manifests.iter().cloned().map(OverrideValue::Manifest));
        values.extend(
            self.config_files
                .iter()
                .cloned()
                .map(OverrideValue::ConfigFile),
        );
        if let Some(settings) = &self.application_settings {
            values.push(OverrideValue::ApplicationSettings(settings.clone()));
        }
        if let Some(strings) = &self.connection_strings {
            values.push(OverrideValue::ConnectionStrings(strings.clone()));
        }
        values
    }
}
