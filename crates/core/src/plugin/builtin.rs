//! Engine-implemented plugins and their per-tag option transforms

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinPluginName {
    WasmHelper,
    ImportGlob,
    DynamicImportVars,
    ModulePreloadPolyfill,
    Manifest,
    Replace,
    Alias,
}

impl BuiltinPluginName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WasmHelper => "builtin:wasm-helper",
            Self::ImportGlob => "builtin:import-glob",
            Self::DynamicImportVars => "builtin:dynamic-import-vars",
            Self::ModulePreloadPolyfill => "builtin:module-preload-polyfill",
            Self::Manifest => "builtin:manifest",
            Self::Replace => "builtin:replace",
            Self::Alias => "builtin:alias",
        }
    }
}

impl fmt::Display for BuiltinPluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuiltinPluginName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "builtin:wasm-helper" => Ok(Self::WasmHelper),
            "builtin:import-glob" => Ok(Self::ImportGlob),
            "builtin:dynamic-import-vars" => Ok(Self::DynamicImportVars),
            "builtin:module-preload-polyfill" => Ok(Self::ModulePreloadPolyfill),
            "builtin:manifest" => Ok(Self::Manifest),
            "builtin:replace" => Ok(Self::Replace),
            "builtin:alias" => Ok(Self::Alias),
            other => Err(Error::config(format!("Unknown builtin plugin: {other}"))),
        }
    }
}

/// A builtin plugin as the user declares it: a tag plus raw options
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinPlugin {
    pub name: BuiltinPluginName,
    pub options: serde_json::Value,
}

impl BuiltinPlugin {
    pub fn new(name: BuiltinPluginName) -> Self {
        Self {
            name,
            options: serde_json::Value::Null,
        }
    }

    pub fn with_options(name: BuiltinPluginName, options: serde_json::Value) -> Self {
        Self { name, options }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportGlobPluginOptions {
    pub root: Option<String>,
    #[serde(default)]
    pub restore_query_extension: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModulePreloadPolyfillPluginOptions {
    #[serde(default)]
    pub skip: bool,
}

fn default_manifest_file_name() -> String {
    "manifest.json".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManifestPluginOptions {
    pub root: Option<String>,
    #[serde(default = "default_manifest_file_name")]
    pub file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReplacePluginOptions {
    pub values: BTreeMap<String, String>,
    pub delimiters: Option<(String, String)>,
    #[serde(default)]
    pub prevent_assignment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasEntry {
    pub find: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasPluginOptions {
    pub entries: Vec<AliasEntry>,
}

/// Validated options, one variant per tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinPluginOptions {
    WasmHelper,
    ImportGlob(ImportGlobPluginOptions),
    DynamicImportVars,
    ModulePreloadPolyfill(ModulePreloadPolyfillPluginOptions),
    Manifest(ManifestPluginOptions),
    Replace(ReplacePluginOptions),
    Alias(AliasPluginOptions),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinPluginDescriptor {
    pub name: BuiltinPluginName,
    pub options: BuiltinPluginOptions,
}

/// Absent options are treated as an empty object
fn parse_options<T: DeserializeOwned>(name: BuiltinPluginName, raw: &serde_json::Value) -> Result<T> {
    let value = match raw {
        serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(value)
        .map_err(|e| Error::config(format!("Invalid options for {name}: {e}")))
}

fn expect_no_options(name: BuiltinPluginName, raw: &serde_json::Value) -> Result<()> {
    match raw {
        serde_json::Value::Null => Ok(()),
        serde_json::Value::Object(map) if map.is_empty() => Ok(()),
        _ => Err(Error::config(format!("{name} does not accept options"))),
    }
}

/// Per-tag transform from raw user options to engine options
pub fn normalize_builtin(plugin: &BuiltinPlugin) -> Result<BuiltinPluginDescriptor> {
    let name = plugin.name;
    let raw = &plugin.options;
    let options = match name {
        BuiltinPluginName::WasmHelper => {
            expect_no_options(name, raw)?;
            BuiltinPluginOptions::WasmHelper
        }
        BuiltinPluginName::DynamicImportVars => {
            expect_no_options(name, raw)?;
            BuiltinPluginOptions::DynamicImportVars
        }
        BuiltinPluginName::ImportGlob => BuiltinPluginOptions::ImportGlob(parse_options(name, raw)?),
        BuiltinPluginName::ModulePreloadPolyfill => {
            BuiltinPluginOptions::ModulePreloadPolyfill(parse_options(name, raw)?)
        }
        BuiltinPluginName::Manifest => BuiltinPluginOptions::Manifest(parse_options(name, raw)?),
        BuiltinPluginName::Replace => BuiltinPluginOptions::Replace(parse_options(name, raw)?),
        BuiltinPluginName::Alias => BuiltinPluginOptions::Alias(parse_options(name, raw)?),
    };
    Ok(BuiltinPluginDescriptor { name, options })
}
