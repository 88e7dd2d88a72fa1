//! Plugin protocol: pass kinds, the registry, and the configured pipeline.

use log::trace;
use serde::de::DeserializeOwned;

use crate::ast::{Document, NodeId};
use crate::config::PluginConfig;
use crate::error::ConfigError;

/// Per-plugin parameter overrides as they arrive from configuration.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// What an item pass wants done with the node it just visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Keep,
    /// Remove the node. Top-down passes never descend into a dropped node.
    Drop,
}

/// A pass that sees the whole document at once.
pub trait DocumentPass: Send + Sync {
    fn run(&self, doc: Document) -> Document;
}

/// A pass invoked once per node during a tree traversal.
pub trait ItemPass: Send + Sync {
    fn visit(&self, doc: &mut Document, id: NodeId) -> Visit;
}

/// A built plugin, tagged with how it walks the tree.
pub enum Pass {
    Document(Box<dyn DocumentPass>),
    /// Parents before children.
    TopDown(Box<dyn ItemPass>),
    /// Children before parents.
    BottomUp(Box<dyn ItemPass>),
}

impl Pass {
    /// Execute once over `doc`.
    pub fn apply(&self, mut doc: Document) -> Document {
        match self {
            Pass::Document(pass) => pass.run(doc),
            Pass::TopDown(pass) => {
                let root = doc.root();
                for child in doc.children(root).to_vec() {
                    visit_top_down(&mut doc, pass.as_ref(), root, child);
                }
                doc
            }
            Pass::BottomUp(pass) => {
                let root = doc.root();
                for child in doc.children(root).to_vec() {
                    visit_bottom_up(&mut doc, pass.as_ref(), root, child);
                }
                doc
            }
        }
    }
}

// Children are snapshotted before descending; a node that an earlier visit
// moved or removed no longer has `parent` as its parent and is skipped.
fn visit_top_down(doc: &mut Document, pass: &dyn ItemPass, parent: NodeId, id: NodeId) {
    if doc.parent(id) != Some(parent) {
        return;
    }
    match pass.visit(doc, id) {
        Visit::Drop => doc.remove(id),
        Visit::Keep => {
            for child in doc.children(id).to_vec() {
                visit_top_down(doc, pass, id, child);
            }
        }
    }
}

fn visit_bottom_up(doc: &mut Document, pass: &dyn ItemPass, parent: NodeId, id: NodeId) {
    for child in doc.children(id).to_vec() {
        visit_bottom_up(doc, pass, id, child);
    }
    if doc.parent(id) != Some(parent) {
        return;
    }
    if pass.visit(doc, id) == Visit::Drop {
        doc.remove(id);
    }
}

/// Static description of a plugin and how to build it from parameters.
pub struct PluginSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub enabled_by_default: bool,
    pub build: fn(&Params) -> Result<Pass, serde_json::Error>,
}

/// Decode a parameter map into a plugin's params struct.
pub fn decode_params<T: DeserializeOwned>(params: &Params) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::Value::Object(params.clone()))
}

/// Known plugins, in their default execution order.
#[derive(Default)]
pub struct Registry {
    plugins: Vec<PluginSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin, replacing any previous one with the same name in place.
    pub fn register(&mut self, spec: PluginSpec) {
        match self.plugins.iter_mut().find(|p| p.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.plugins.push(spec),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PluginSpec> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginSpec> {
        self.plugins.iter()
    }

    /// One entry per registered plugin with its default enablement.
    pub fn default_plugins(&self) -> Vec<PluginConfig> {
        self.plugins
            .iter()
            .map(|spec| PluginConfig {
                name: spec.name.to_string(),
                enabled: spec.enabled_by_default,
                params: Params::new(),
            })
            .collect()
    }
}

struct Entry {
    name: String,
    enabled: bool,
    pass: Pass,
}

/// A validated, ordered list of built passes.
pub struct Pipeline {
    entries: Vec<Entry>,
}

impl Pipeline {
    /// Build every configured plugin up front, so that configuration
    /// errors surface before any document is touched.
    pub fn new(registry: &Registry, plugins: &[PluginConfig]) -> Result<Self, ConfigError> {
        let entries = plugins
            .iter()
            .map(|config| {
                let spec = registry
                    .get(&config.name)
                    .ok_or_else(|| ConfigError::UnknownPlugin(config.name.clone()))?;
                let pass = (spec.build)(&config.params).map_err(|e| ConfigError::InvalidParams {
                    plugin: config.name.clone(),
                    message: e.to_string(),
                })?;
                Ok(Entry {
                    name: config.name.clone(),
                    enabled: config.enabled,
                    pass,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { entries })
    }

    /// Names of the plugins that will run, in order.
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.name.as_str())
    }

    /// Run one cycle of every enabled plugin.
    pub fn run(&self, mut doc: Document) -> Document {
        for entry in self.entries.iter().filter(|e| e.enabled) {
            trace!("running plugin {}", entry.name);
            doc = entry.pass.apply(doc);
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Element, NodeKind};
    use crate::parse::parse_svg;
    use crate::serialize::{SerializeOptions, serialize};
    use std::sync::Mutex;

    /// Records visit order and drops `<g>` elements.
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl ItemPass for Recorder {
        fn visit(&self, doc: &mut Document, id: NodeId) -> Visit {
            let Some(el) = doc.element(id) else {
                return Visit::Keep;
            };
            self.seen.lock().unwrap().push(el.name.local.clone());
            if el.is("g") { Visit::Drop } else { Visit::Keep }
        }
    }

    fn recorder() -> Recorder {
        Recorder {
            seen: Mutex::new(Vec::new()),
        }
    }

    const SVG: &str = "<svg><g><rect/></g><circle/></svg>";

    #[test]
    fn test_top_down_skips_dropped_subtree() {
        let pass = Pass::TopDown(Box::new(recorder()));
        let doc = pass.apply(parse_svg(SVG).unwrap());
        assert_eq!(serialize(&doc, &SerializeOptions::default()), "<svg><circle/></svg>");
        assert!(doc.check_consistency());
    }

    #[test]
    fn test_traversal_order() {
        let top = recorder();
        let mut doc = parse_svg(SVG).unwrap();
        let root = doc.root();
        for child in doc.children(root).to_vec() {
            visit_top_down(&mut doc, &top, root, child);
        }
        assert_eq!(*top.seen.lock().unwrap(), vec!["svg", "g", "circle"]);

        let bottom = recorder();
        let mut doc = parse_svg(SVG).unwrap();
        let root = doc.root();
        for child in doc.children(root).to_vec() {
            visit_bottom_up(&mut doc, &bottom, root, child);
        }
        assert_eq!(*bottom.seen.lock().unwrap(), vec!["rect", "g", "circle", "svg"]);
        assert!(doc.check_consistency());
    }

    struct AddTitle;

    impl DocumentPass for AddTitle {
        fn run(&self, mut doc: Document) -> Document {
            if let Some(svg) = doc.root_element() {
                doc.append(svg, NodeKind::Element(Element::new("title")));
            }
            doc
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(PluginSpec {
            name: "add_title",
            description: "appends a title",
            enabled_by_default: true,
            build: |params| {
                #[derive(serde::Deserialize)]
                #[serde(deny_unknown_fields)]
                struct NoParams {}
                decode_params::<NoParams>(params)?;
                Ok(Pass::Document(Box::new(AddTitle)))
            },
        });
        registry
    }

    #[test]
    fn test_pipeline_runs_enabled_entries_in_order() {
        let registry = registry();
        let mut plugins = registry.default_plugins();
        plugins.push(PluginConfig {
            name: "add_title".into(),
            enabled: false,
            params: Params::new(),
        });
        let pipeline = Pipeline::new(&registry, &plugins).unwrap();
        assert_eq!(pipeline.enabled().collect::<Vec<_>>(), vec!["add_title"]);

        let doc = pipeline.run(parse_svg("<svg/>").unwrap());
        assert_eq!(serialize(&doc, &SerializeOptions::default()), "<svg><title/></svg>");
    }

    #[test]
    fn test_pipeline_rejects_bad_config() {
        let registry = registry();
        let unknown = vec![PluginConfig {
            name: "nope".into(),
            enabled: true,
            params: Params::new(),
        }];
        assert_eq!(
            Pipeline::new(&registry, &unknown).err(),
            Some(ConfigError::UnknownPlugin("nope".into()))
        );

        let mut params = Params::new();
        params.insert("bogus".into(), serde_json::Value::Bool(true));
        let invalid = vec![PluginConfig {
            name: "add_title".into(),
            enabled: false,
            params,
        }];
        assert!(matches!(
            Pipeline::new(&registry, &invalid),
            Err(ConfigError::InvalidParams { plugin, .. }) if plugin == "add_title"
        ));
    }
}
