//! Execution structure builder
//!
//! Turns a task list and a dependency specification into task instances (one
//! per alias, sharing definitions), validates every dependency against them
//! and assembles the [`DependencyGraph`].

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::alias::resolve_aliases;
use crate::definition::{validate_name, PipelineEntry, TaskDefinition};
use crate::dependency::{Alias, DependencySpec, TaskKey};
use crate::error::{DefinitionError, GraphError};
use crate::graph::{DependencyGraph, InstanceTable, TaskInstance};
use crate::validate::{collect_dependency_errors, validate_dependencies};

/// What to do when one alias is claimed twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasPolicy {
    /// Reject with `DefinitionError::DuplicateAlias`
    #[default]
    Strict,
    /// Later entry replaces the earlier one (logged)
    LastWins,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Abort on the first invalid edge
    #[default]
    FailFast,
    /// Check every edge and report all violations together
    CollectAll,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildOptions {
    pub aliases: AliasPolicy,
    pub validation: ValidationMode,
}

impl BuildOptions {
    pub fn with_aliases(mut self, aliases: AliasPolicy) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }
}

/// Accept task definitions, reject anything else
pub fn classify_entries(entries: &[PipelineEntry]) -> Result<Vec<Arc<TaskDefinition>>, DefinitionError> {
    entries
        .iter()
        .map(|entry| entry.definition().cloned())
        .collect()
}

/// Build the validated graph and the alias -> instance table.
///
/// Nothing is returned on failure; the first violation (or, in
/// [`ValidationMode::CollectAll`], every dependency violation) is reported.
#[instrument(skip_all, fields(entries = entries.len(), keys = spec.len()))]
pub fn build_execution_structure(
    entries: &[PipelineEntry],
    spec: &DependencySpec,
    options: &BuildOptions,
) -> Result<(DependencyGraph, InstanceTable), GraphError> {
    let definitions = classify_entries(entries)?;
    check_explicit_aliases(spec)?;

    let tables = resolve_aliases(spec, options.aliases)?;

    let mut instances = InstanceTable::new();
    for definition in &definitions {
        let implicit;
        let aliases: Vec<&Alias> = match tables.uses_of(definition.name()) {
            Some(uses) => uses.iter().collect(),
            None => {
                implicit = Alias::new(definition.name());
                vec![&implicit]
            }
        };

        for alias in aliases {
            insert_instance(&mut instances, alias, definition, options.aliases)?;
        }
    }

    match options.validation {
        ValidationMode::FailFast => {
            validate_dependencies(&tables.dependencies, &instances, &tables.lookup)?;
        }
        ValidationMode::CollectAll => {
            let report = collect_dependency_errors(&tables.dependencies, &instances, &tables.lookup);
            if !report.is_empty() {
                return Err(GraphError::Invalid(report));
            }
        }
    }

    let graph = DependencyGraph::from_validated(instances.clone(), &tables.dependencies);
    debug!(
        instances = graph.instance_count(),
        edges = graph.edge_count(),
        "built dependency graph"
    );

    Ok((graph, instances))
}

fn check_explicit_aliases(spec: &DependencySpec) -> Result<(), DefinitionError> {
    for entry in spec.entries() {
        if let TaskKey::Aliased { alias, .. } = &entry.key {
            validate_name("alias", alias)?;
        }
    }
    Ok(())
}

fn insert_instance(
    instances: &mut InstanceTable,
    alias: &Alias,
    definition: &Arc<TaskDefinition>,
    policy: AliasPolicy,
) -> Result<(), DefinitionError> {
    if let Some(existing) = instances.get(alias) {
        // the same definition listed twice materializes the same instance
        if Arc::ptr_eq(existing.definition(), definition) {
            return Ok(());
        }

        match policy {
            AliasPolicy::Strict => {
                return Err(DefinitionError::DuplicateAlias {
                    alias: alias.to_string(),
                    first: existing.definition().name().to_string(),
                    second: definition.name().to_string(),
                });
            }
            AliasPolicy::LastWins => {
                warn!(
                    alias = %alias,
                    previous = existing.definition().name(),
                    replacement = definition.name(),
                    "task instance replaces an earlier one"
                );
            }
        }
    }

    instances.insert(
        alias.clone(),
        TaskInstance::new(alias.clone(), Arc::clone(definition)),
    );
    Ok(())
}
