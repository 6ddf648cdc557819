//! Alias resolution
//!
//! Normalizes raw specification keys into (definition name, alias) pairs and
//! produces the three tables the builder works from:
//! - usage: definition name -> aliases that instantiate it
//! - lookup: alias -> definition name (diagnostics only)
//! - dependencies: per-input wiring re-keyed by alias

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, instrument, warn};

use crate::builder::AliasPolicy;
use crate::dependency::{Alias, DependencySpec, InputDependencies};
use crate::error::DefinitionError;

#[derive(Debug, Default)]
pub struct AliasTables {
    /// definition name -> aliases using it
    pub usage: IndexMap<String, IndexSet<Alias>>,
    /// alias -> originating definition name
    pub lookup: IndexMap<Alias, String>,
    /// consumer alias -> input wiring
    pub dependencies: IndexMap<Alias, InputDependencies>,
}

impl AliasTables {
    /// Aliases registered for a definition, if any
    pub fn uses_of(&self, definition: &str) -> Option<&IndexSet<Alias>> {
        self.usage.get(definition)
    }

    pub fn original_name(&self, alias: &str) -> Option<&str> {
        self.lookup.get(alias).map(String::as_str)
    }
}

/// Resolve every raw key of `spec` into alias tables.
///
/// Dependency targets are registered as uses of a definition named like the
/// target alias, so a producer with no inputs of its own still gets an
/// instance. Under [`AliasPolicy::Strict`] two keys resolving to the same
/// alias fail with [`DefinitionError::DuplicateAlias`]; under
/// [`AliasPolicy::LastWins`] the later wiring replaces the earlier one.
#[instrument(skip_all, fields(entries = spec.len()))]
pub fn resolve_aliases(
    spec: &DependencySpec,
    policy: AliasPolicy,
) -> Result<AliasTables, DefinitionError> {
    let mut tables = AliasTables::default();

    for entry in spec.entries() {
        let name = entry.key.name();
        let alias = Alias::new(entry.key.alias());

        if let Some(previous) = tables.lookup.get(&alias) {
            match policy {
                AliasPolicy::Strict => {
                    return Err(DefinitionError::DuplicateAlias {
                        alias: alias.to_string(),
                        first: previous.clone(),
                        second: name.to_string(),
                    });
                }
                AliasPolicy::LastWins => {
                    warn!(
                        alias = %alias,
                        previous = %previous,
                        replacement = %entry.key,
                        "dependency entry replaces an earlier one"
                    );
                }
            }
        }

        tables
            .usage
            .entry(name.to_string())
            .or_default()
            .insert(alias.clone());
        tables.lookup.insert(alias.clone(), name.to_string());
        tables.dependencies.insert(alias, entry.inputs.clone());

        for target in entry.inputs.values() {
            tables
                .usage
                .entry(target.task.to_string())
                .or_default()
                .insert(target.task.clone());
        }
    }

    debug!(
        aliases = tables.lookup.len(),
        definitions = tables.usage.len(),
        "resolved aliases"
    );

    Ok(tables)
}
