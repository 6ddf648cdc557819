//! Dependency graph built from validated task instances
//!
//! Immutable once built. Edges are addressable both from the consumer side
//! (alias, input) and from the producer side (alias, output).

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::definition::TaskDefinition;
use crate::dependency::{Alias, DependencyEdge, InputDependencies, InputHandle, OutputHandle};

/// One use of a task definition inside a graph
#[derive(Debug, Clone)]
pub struct TaskInstance {
    alias: Alias,
    definition: Arc<TaskDefinition>,
}

impl TaskInstance {
    pub fn new(alias: Alias, definition: Arc<TaskDefinition>) -> Self {
        Self { alias, definition }
    }

    pub fn alias(&self) -> &Alias {
        &self.alias
    }

    pub fn definition(&self) -> &Arc<TaskDefinition> {
        &self.definition
    }

    /// True when the instance runs under a name other than its definition's
    pub fn is_aliased(&self) -> bool {
        self.alias.as_str() != self.definition.name()
    }
}

/// Alias -> instance, in build order
pub type InstanceTable = IndexMap<Alias, TaskInstance>;

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    instances: InstanceTable,
    edges: Vec<DependencyEdge>,
    by_input: IndexMap<InputHandle, OutputHandle>,
    by_output: IndexMap<OutputHandle, Vec<InputHandle>>,
}

impl DependencyGraph {
    /// Assemble the graph. Both arguments must already be validated.
    pub(crate) fn from_validated(
        instances: InstanceTable,
        dependencies: &IndexMap<Alias, InputDependencies>,
    ) -> Self {
        let mut edges = Vec::new();
        let mut by_input = IndexMap::new();
        let mut by_output: IndexMap<OutputHandle, Vec<InputHandle>> = IndexMap::new();

        for (consumer, inputs) in dependencies {
            for (input, target) in inputs {
                let input = InputHandle::new(consumer.clone(), input.clone());
                let output = OutputHandle::from(target);

                by_input.insert(input.clone(), output.clone());
                by_output
                    .entry(output.clone())
                    .or_default()
                    .push(input.clone());
                edges.push(DependencyEdge { input, output });
            }
        }

        Self {
            instances,
            edges,
            by_input,
            by_output,
        }
    }

    pub fn instances(&self) -> &InstanceTable {
        &self.instances
    }

    pub fn instance(&self, alias: &str) -> Option<&TaskInstance> {
        self.instances.get(alias)
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_dependency(&self, input: &InputHandle) -> bool {
        self.by_input.contains_key(input)
    }

    /// Producer output wired into `input`
    pub fn dependency(&self, input: &InputHandle) -> Option<&OutputHandle> {
        self.by_input.get(input)
    }

    /// Consumer inputs fed by `output`
    pub fn dependents(&self, output: &OutputHandle) -> &[InputHandle] {
        self.by_output
            .get(output)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Outputs the task `alias` consumes, in wiring order
    pub fn upstream_of(&self, alias: &str) -> Vec<&OutputHandle> {
        self.by_input
            .iter()
            .filter(|(input, _)| input.task.as_str() == alias)
            .map(|(_, output)| output)
            .collect()
    }

    /// Inputs fed by any output of `alias`, in wiring order
    pub fn downstream_of(&self, alias: &str) -> Vec<&InputHandle> {
        self.by_output
            .iter()
            .filter(|(output, _)| output.task.as_str() == alias)
            .flat_map(|(_, inputs)| inputs.iter())
            .collect()
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            instances: self
                .instances
                .values()
                .map(|instance| InstanceSummary {
                    alias: instance.alias().to_string(),
                    definition: instance.definition().name().to_string(),
                })
                .collect(),
            edges: self.edges.clone(),
        }
    }
}

/// Serializable snapshot for introspection
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub instances: Vec<InstanceSummary>,
    pub edges: Vec<DependencyEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceSummary {
    pub alias: String,
    pub definition: String,
}
