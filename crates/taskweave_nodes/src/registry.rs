//! Named node templates.
//!
//! The [`TemplateRegistry`] maps template names to factories that build a
//! fresh [`Node`] on every call. Dynamic sub-graph builders use it to stamp
//! out many instances of the same template, each with its own bus keys:
//!
//! ```
//! use taskweave_graph::node::TaskNode;
//! use taskweave_graph::task::{TaskOutcome, task_fn};
//! use taskweave_nodes::config::TemplateConfig;
//! use taskweave_nodes::registry::TemplateRegistry;
//!
//! let mut registry = TemplateRegistry::new();
//! registry.register("Copy", |name| {
//!     TaskNode::new(name, task_fn(|_| TaskOutcome::success("copied")))
//!         .with_inputs(["input_data"])
//!         .with_outputs(["output_data"])
//!         .into()
//! });
//!
//! let config = TemplateConfig::new("Copy")
//!     .index_inputs(["input_data"])
//!     .index_outputs(["output_data"]);
//! let instance = registry.create_task(&config, "Copy #3", 3).unwrap();
//! assert_eq!(instance.input_key, "input_data3");
//! assert_eq!(instance.output_key, "output_data3");
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use taskweave_graph::node::Node;

use crate::config::TemplateConfig;
use crate::error::ConfigError;

/// Builds a node named by its argument.
pub type TemplateFactory = Arc<dyn Fn(&str) -> Node + Send + Sync>;

/// Registry of node templates, iterated in registration order.
#[derive(Default, Clone)]
pub struct TemplateRegistry {
    templates: IndexMap<String, TemplateFactory>,
}

impl core::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &self.names())
            .finish()
    }
}

/// A node built from a template, together with its primary keys.
#[derive(Debug, Clone)]
pub struct TemplateInstance {
    /// The configured node.
    pub node: Node,
    /// First input key after remapping and indexing.
    pub input_key: String,
    /// First output key after remapping and indexing.
    pub output_key: String,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: IndexMap::new(),
        }
    }

    /// Registers a template.
    ///
    /// # Panics
    ///
    /// Panics if a template with the same name is already registered.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&str) -> Node + Send + Sync + 'static,
    {
        let name = name.into();
        assert!(
            !self.templates.contains_key(&name),
            "Template '{name}' is already registered"
        );
        self.templates.insert(name, Arc::new(factory));
    }

    /// Builds a fresh node from `template`, named `node_name`.
    #[must_use]
    pub fn create(&self, template: &str, node_name: &str) -> Option<Node> {
        let factory = self.templates.get(template)?;
        let mut node = factory(node_name);
        node.info_mut().set_name(node_name);
        Some(node)
    }

    /// Builds a configured instance of a template.
    ///
    /// The node is named `name`, its keys are renamed by the config's
    /// remapping, and the keys listed for indexing then get `index` appended.
    /// For a graph template the same changes apply to every nested child.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownTemplate`] if `config.task` is not registered
    /// - [`ConfigError::MissingKeys`] if the node ends up without an input or
    ///   output key
    pub fn create_task(
        &self,
        config: &TemplateConfig,
        name: &str,
        index: usize,
    ) -> Result<TemplateInstance, ConfigError> {
        let mut node = self
            .create(&config.task, name)
            .ok_or_else(|| ConfigError::unknown_template(name, &config.task))?;

        // Graph templates pass every rename down to their children.
        if !config.input_remapping.is_empty() {
            node.rename_input_keys(&config.input_remapping);
        }
        if !config.output_remapping.is_empty() {
            node.rename_output_keys(&config.output_remapping);
        }
        if !config.input_indexing.is_empty() {
            node.index_input_keys(&config.input_indexing, index);
        }
        if !config.output_indexing.is_empty() {
            node.index_output_keys(&config.output_indexing, index);
        }

        let input_key = node
            .info()
            .input_keys()
            .first()
            .cloned()
            .ok_or(ConfigError::MissingKeys {
                node: name.to_owned(),
                direction: "input",
            })?;
        let output_key = node
            .info()
            .output_keys()
            .first()
            .cloned()
            .ok_or(ConfigError::MissingKeys {
                node: name.to_owned(),
                direction: "output",
            })?;

        Ok(TemplateInstance {
            node,
            input_key,
            output_key,
        })
    }

    /// Returns whether `name` is registered.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Returns the registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    /// Returns the number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskweave_graph::node::TaskNode;
    use taskweave_graph::task::{TaskOutcome, task_fn};

    fn copy_template(name: &str) -> Node {
        TaskNode::new(name, task_fn(|_| TaskOutcome::success("copied")))
            .with_inputs(["input_data", "environment"])
            .with_outputs(["output_data"])
            .into()
    }

    fn registry() -> TemplateRegistry {
        let mut registry = TemplateRegistry::new();
        registry.register("Copy", copy_template);
        registry.register("Sink", |name| {
            TaskNode::new(name, task_fn(|_| TaskOutcome::success("sunk")))
                .with_inputs(["input_data"])
                .into()
        });
        registry
    }

    #[test]
    fn lookup_in_registration_order() {
        let registry = registry();
        assert_eq!(registry.names(), ["Copy", "Sink"]);
        assert!(registry.has("Copy"));
        assert!(!registry.has("Missing"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    #[should_panic(expected = "Template 'Copy' is already registered")]
    fn duplicate_registration_panics() {
        let mut registry = registry();
        registry.register("Copy", copy_template);
    }

    #[test]
    fn every_instance_gets_a_fresh_id() {
        let registry = registry();
        let a = registry.create("Copy", "a").unwrap();
        let b = registry.create("Copy", "b").unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), "a");
    }

    #[test]
    fn remapping_runs_before_indexing() {
        let registry = registry();
        let config = TemplateConfig::new("Copy")
            .remap_input("input_data", "raster_input")
            .remap_output("output_data", "raster_output")
            .index_inputs(["raster_input"])
            .index_outputs(["raster_output"]);

        let instance = registry.create_task(&config, "Raster #2", 2).unwrap();

        assert_eq!(instance.input_key, "raster_input2");
        assert_eq!(instance.output_key, "raster_output2");
        assert_eq!(
            instance.node.info().input_keys(),
            ["raster_input2", "environment"]
        );
        assert_eq!(instance.node.name(), "Raster #2");
    }

    #[test]
    fn indexing_the_pre_remap_name_has_no_effect() {
        let registry = registry();
        let config = TemplateConfig::new("Copy")
            .remap_input("input_data", "renamed")
            .index_inputs(["input_data"])
            .index_outputs(["output_data"]);

        let instance = registry.create_task(&config, "x", 7).unwrap();
        assert_eq!(instance.input_key, "renamed");
        assert_eq!(instance.output_key, "output_data7");
    }

    #[test]
    fn unknown_template_and_missing_keys_are_errors() {
        let registry = registry();

        let err = registry
            .create_task(&TemplateConfig::new("Nope"), "node", 1)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTemplate { ref template, .. } if template == "Nope"));

        let err = registry
            .create_task(&TemplateConfig::new("Sink"), "sink", 1)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingKeys {
                direction: "output",
                ..
            }
        ));
    }
}
