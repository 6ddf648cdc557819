//! Pipeline definition: the top-level build call
//!
//! Builds the dependency graph and the type registry from the same task list
//! in one step.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{info, instrument};

use crate::builder::{build_execution_structure, classify_entries, BuildOptions};
use crate::collect::{collect_types, TypeRegistry};
use crate::definition::{validate_name, ContextDefinition, PipelineEntry, TaskDefinition};
use crate::dependency::DependencySpec;
use crate::error::GraphError;
use crate::graph::{DependencyGraph, InstanceTable, TaskInstance};
use crate::types::TypeDescriptor;

/// Types supplied by the caller in addition to the task definitions
#[derive(Debug, Clone, Default)]
pub struct AmbientTypes {
    /// Execution contexts by name, walked in insertion order
    pub contexts: IndexMap<String, ContextDefinition>,
    /// Environment (run configuration) type
    pub environment: Option<TypeDescriptor>,
}

impl AmbientTypes {
    pub fn with_context(mut self, context: ContextDefinition) -> Self {
        self.contexts.insert(context.name.clone(), context);
        self
    }

    pub fn with_environment(mut self, ty: TypeDescriptor) -> Self {
        self.environment = Some(ty);
        self
    }
}

/// A validated pipeline: its graph, instances and reachable types
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    name: String,
    description: Option<String>,
    definitions: Vec<Arc<TaskDefinition>>,
    graph: DependencyGraph,
    instances: InstanceTable,
    types: TypeRegistry,
}

impl PipelineDefinition {
    /// Build and validate a pipeline.
    ///
    /// The graph is built first; types are collected only from a valid graph.
    #[instrument(skip_all, fields(pipeline = %name))]
    pub fn build(
        name: &str,
        entries: &[PipelineEntry],
        spec: &DependencySpec,
        ambient: &AmbientTypes,
        options: &BuildOptions,
    ) -> Result<Self, GraphError> {
        validate_name("pipeline", name)?;

        let (graph, instances) = build_execution_structure(entries, spec, options)?;

        let definitions = classify_entries(entries)?;

        let types = collect_types(&definitions, ambient)?;

        info!(
            instances = graph.instance_count(),
            edges = graph.edge_count(),
            types = types.len(),
            "pipeline built"
        );

        Ok(Self {
            name: name.to_string(),
            description: None,
            definitions,
            graph,
            instances,
            types,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn definitions(&self) -> &[Arc<TaskDefinition>] {
        &self.definitions
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn instances(&self) -> &InstanceTable {
        &self.instances
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn task_named(&self, alias: &str) -> Option<&TaskInstance> {
        self.instances.get(alias)
    }

    pub fn has_task(&self, alias: &str) -> bool {
        self.instances.contains_key(alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::DependencyTarget;
    use crate::error::{DefinitionError, DuplicateTypeNameError};
    use crate::types;

    #[test]
    fn builds_graph_and_types() {
        let a = TaskDefinition::builder("A").output("o1", types::int()).build().unwrap();
        let b = TaskDefinition::builder("B").input("i1", types::int()).build().unwrap();
        let spec = DependencySpec::new().task("B", [("i1", DependencyTarget::new("A", "o1"))]);

        let pipeline = PipelineDefinition::build(
            "demo",
            &[PipelineEntry::from(a), PipelineEntry::from(b)],
            &spec,
            &AmbientTypes::default(),
            &BuildOptions::default(),
        )
        .unwrap()
        .with_description("two tasks");

        assert_eq!(pipeline.name(), "demo");
        assert_eq!(pipeline.description(), Some("two tasks"));
        assert!(pipeline.has_task("A"));
        assert_eq!(pipeline.task_named("B").unwrap().definition().name(), "B");
        assert_eq!(pipeline.definitions().len(), 2);
        assert_eq!(pipeline.graph().edge_count(), 1);
        assert!(pipeline.types().contains("Int"));
    }

    #[test]
    fn type_name_clash_fails_build() {
        let a = TaskDefinition::builder("A")
            .output("o1", types::TypeDescriptor::scalar("Int"))
            .build()
            .unwrap();
        let b = TaskDefinition::builder("B").input("i1", types::int()).build().unwrap();

        let err = PipelineDefinition::build(
            "clash",
            &[PipelineEntry::from(a), PipelineEntry::from(b)],
            &DependencySpec::new(),
            &AmbientTypes::default(),
            &BuildOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateTypeName(DuplicateTypeNameError { name: "Int".into() })
        );
    }

    #[test]
    fn non_definition_entries_fail_build() {
        let a = TaskDefinition::builder("A").output("o1", types::int()).build().unwrap();
        let err = PipelineDefinition::build(
            "mixed",
            &[PipelineEntry::from(a), PipelineEntry::callable("helper")],
            &DependencySpec::new(),
            &AmbientTypes::default(),
            &BuildOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::Definition(DefinitionError::UnregisteredCallable {
                name: "helper".into()
            })
        );
    }

    #[test]
    fn pipeline_name_validated() {
        let err = PipelineDefinition::build(
            "my pipeline",
            &[],
            &DependencySpec::new(),
            &AmbientTypes::default(),
            &BuildOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Definition(DefinitionError::InvalidName { kind: "pipeline", .. })
        ));
    }
}
