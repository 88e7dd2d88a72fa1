//! Built-in plugins.

mod cleanup;
mod collapse_groups;
mod inline_styles;
mod merge_paths;
mod move_elems_attrs_to_group;
mod remove_xmlns;
mod sort_defs_children;
mod values;

pub use cleanup::*;
pub use collapse_groups::CollapseGroups;
pub use inline_styles::{InlineStyles, InlineStylesParams};
pub use merge_paths::{MergePaths, MergePathsParams};
pub use move_elems_attrs_to_group::MoveElemsAttrsToGroup;
pub use remove_xmlns::RemoveXmlns;
pub use sort_defs_children::SortDefsChildren;
pub use values::{ConvertPathData, ConvertPathDataParams, MinifyColors, MinifyStyles, RemoveDefaultAttrs, minify_color};

use serde::Deserialize;

use crate::plugin::{Params, Pass, PluginSpec, Registry, decode_params};

/// Parameters of plugins that take none.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

fn no_params(params: &Params) -> Result<(), serde_json::Error> {
    decode_params::<NoParams>(params).map(|_| ())
}

macro_rules! simple_plugin {
    ($name:literal, $description:literal, $enabled:expr, $kind:ident, $pass:expr) => {
        PluginSpec {
            name: $name,
            description: $description,
            enabled_by_default: $enabled,
            build: |params| {
                no_params(params)?;
                Ok(Pass::$kind(Box::new($pass)))
            },
        }
    };
}

impl Registry {
    /// Every built-in plugin, in the default execution order.
    pub fn builtin() -> Self {
        let mut registry = Registry::new();
        for spec in builtin_specs() {
            registry.register(spec);
        }
        registry
    }
}

fn builtin_specs() -> Vec<PluginSpec> {
    vec![
        simple_plugin!("remove_doctype", "removes the doctype declaration", true, TopDown, RemoveDoctype),
        simple_plugin!("remove_xml_proc_inst", "removes the XML declaration", true, TopDown, RemoveXmlProcInst),
        simple_plugin!("remove_comments", "removes comments", true, TopDown, RemoveComments),
        simple_plugin!(
            "remove_metadata",
            "removes <metadata>, <title>, <desc> and editor data",
            true,
            TopDown,
            RemoveMetadata
        ),
        PluginSpec {
            name: "inline_styles",
            description: "moves <style> rules into style attributes",
            enabled_by_default: true,
            build: |params| Ok(Pass::Document(Box::new(InlineStyles::new(decode_params(params)?)))),
        },
        simple_plugin!("minify_styles", "minifies <style> elements and style attributes", true, TopDown, MinifyStyles),
        simple_plugin!("minify_colors", "shortens color values", true, TopDown, MinifyColors),
        simple_plugin!(
            "remove_default_attrs",
            "removes attributes set to their default value",
            true,
            TopDown,
            RemoveDefaultAttrs
        ),
        simple_plugin!("remove_hidden", "removes elements that never render", true, TopDown, RemoveHidden),
        simple_plugin!(
            "move_elems_attrs_to_group",
            "moves attributes shared by all children to the group",
            true,
            BottomUp,
            MoveElemsAttrsToGroup
        ),
        simple_plugin!("collapse_groups", "collapses useless groups", true, BottomUp, CollapseGroups),
        PluginSpec {
            name: "convert_path_data",
            description: "rounds and compacts path data",
            enabled_by_default: true,
            build: |params| Ok(Pass::TopDown(Box::new(ConvertPathData::new(decode_params(params)?)))),
        },
        simple_plugin!(
            "remove_empty_containers",
            "removes empty container elements",
            true,
            BottomUp,
            RemoveEmptyContainers
        ),
        PluginSpec {
            name: "merge_paths",
            description: "merges adjacent paths with identical attributes",
            enabled_by_default: true,
            build: |params| Ok(Pass::TopDown(Box::new(MergePaths::new(decode_params(params)?)))),
        },
        simple_plugin!(
            "remove_unused_namespaces",
            "removes unused namespace declarations",
            true,
            Document,
            RemoveUnusedNamespaces
        ),
        simple_plugin!(
            "sort_defs_children",
            "sorts children of <defs> to improve compression",
            true,
            TopDown,
            SortDefsChildren
        ),
        simple_plugin!(
            "remove_xmlns",
            "removes the xmlns attribute (for inline SVG)",
            false,
            TopDown,
            RemoveXmlns
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginConfig;
    use crate::error::ConfigError;
    use crate::plugin::Pipeline;

    #[test]
    fn test_builtin_order() {
        let registry = Registry::builtin();
        let names: Vec<_> = registry.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "remove_doctype",
                "remove_xml_proc_inst",
                "remove_comments",
                "remove_metadata",
                "inline_styles",
                "minify_styles",
                "minify_colors",
                "remove_default_attrs",
                "remove_hidden",
                "move_elems_attrs_to_group",
                "collapse_groups",
                "convert_path_data",
                "remove_empty_containers",
                "merge_paths",
                "remove_unused_namespaces",
                "sort_defs_children",
                "remove_xmlns",
            ]
        );
    }

    #[test]
    fn test_every_builtin_builds_with_defaults() {
        let registry = Registry::builtin();
        let pipeline = Pipeline::new(&registry, &registry.default_plugins()).unwrap();
        assert!(!pipeline.enabled().any(|name| name == "remove_xmlns"));
    }

    #[test]
    fn test_params_are_validated() {
        let registry = Registry::builtin();
        let mut config = PluginConfig::new("convert_path_data");
        config.params.insert("precision".into(), 2.into());
        assert!(Pipeline::new(&registry, &[config]).is_ok());

        let mut config = PluginConfig::new("remove_comments");
        config.params.insert("precision".into(), 2.into());
        assert!(matches!(
            Pipeline::new(&registry, &[config]),
            Err(ConfigError::InvalidParams { .. })
        ));

        let mut config = PluginConfig::new("inline_styles");
        config.params.insert("use_mqs".into(), "screen".into());
        assert!(Pipeline::new(&registry, &[config]).is_err());
    }
}
