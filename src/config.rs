//! Optimizer configuration.

use serde::Deserialize;

use crate::datauri::DataUriMode;
use crate::plugin::{Params, Registry};
use crate::serialize::SerializeOptions;

/// Top-level configuration. `Config::default()` is the default preset:
/// every built-in plugin in its default order and enablement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Ordered plugin list. Replaces the default list when given.
    pub plugins: Vec<PluginConfig>,
    /// Repeat the pipeline while the output keeps shrinking.
    pub multipass: bool,
    /// Cycle cap when `multipass` is on.
    pub max_passes: usize,
    /// Output formatting.
    pub js2svg: SerializeOptions,
    /// Also produce a data URI of the result.
    pub datauri: Option<DataUriMode>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_registry(&Registry::builtin())
    }
}

impl Config {
    /// Default settings with the plugin list taken from `registry`.
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            plugins: registry.default_plugins(),
            multipass: false,
            max_passes: 10,
            js2svg: SerializeOptions::default(),
            datauri: None,
        }
    }

    pub fn plugin_mut(&mut self, name: &str) -> Option<&mut PluginConfig> {
        self.plugins.iter_mut().find(|p| p.name == name)
    }

    /// Turn a plugin on or off. Returns false if it is not in the list.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.plugin_mut(name) {
            Some(plugin) => {
                plugin.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Override one parameter of a plugin. Returns false if it is not in the list.
    pub fn set_param(&mut self, name: &str, key: &str, value: serde_json::Value) -> bool {
        match self.plugin_mut(name) {
            Some(plugin) => {
                plugin.params.insert(key.to_string(), value);
                true
            }
            None => false,
        }
    }
}

/// One pipeline entry.
///
/// Deserializes either from a bare plugin name or from
/// `{ "name": ..., "enabled": ..., "params": {...} }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "PluginConfigRepr")]
pub struct PluginConfig {
    pub name: String,
    pub enabled: bool,
    pub params: Params,
}

impl PluginConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            params: Params::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PluginConfigRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default = "enabled_default")]
        enabled: bool,
        #[serde(default)]
        params: Params,
    },
}

fn enabled_default() -> bool {
    true
}

impl From<PluginConfigRepr> for PluginConfig {
    fn from(repr: PluginConfigRepr) -> Self {
        match repr {
            PluginConfigRepr::Name(name) => PluginConfig::new(name),
            PluginConfigRepr::Full {
                name,
                enabled,
                params,
            } => PluginConfig {
                name,
                enabled,
                params,
            },
        }
    }
}
