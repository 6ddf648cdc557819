//! Dependency validation
//!
//! Validates every (consumer, input) -> (producer, output) entry:
//! - consumer does not depend on itself
//! - consumer instance exists
//! - consumer declares the input
//! - producer instance exists
//! - producer declares the output
//!
//! Checks run in that order and stop at the first failure of an edge.

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::dependency::{Alias, DependencyTarget, InputDependencies};
use crate::error::{
    CircularReferenceError, DependencyError, MissingInputError, MissingInstanceError,
    MissingOutputError, ReferenceSite, ValidationReport,
};
use crate::graph::InstanceTable;

/// Validate all edges, failing on the first violation
#[instrument(skip_all, fields(consumers = dependencies.len()))]
pub fn validate_dependencies(
    dependencies: &IndexMap<Alias, InputDependencies>,
    instances: &InstanceTable,
    alias_lookup: &IndexMap<Alias, String>,
) -> Result<(), DependencyError> {
    for (consumer, input, target) in edges(dependencies) {
        validate_edge(consumer, input, target, instances, alias_lookup)?;
    }
    debug!("all dependencies valid");
    Ok(())
}

/// Validate all edges, gathering one error per violated edge
#[instrument(skip_all, fields(consumers = dependencies.len()))]
pub fn collect_dependency_errors(
    dependencies: &IndexMap<Alias, InputDependencies>,
    instances: &InstanceTable,
    alias_lookup: &IndexMap<Alias, String>,
) -> ValidationReport {
    let errors: Vec<DependencyError> = edges(dependencies)
        .filter_map(|(consumer, input, target)| {
            validate_edge(consumer, input, target, instances, alias_lookup).err()
        })
        .collect();

    debug!(errors = errors.len(), "collected dependency errors");
    ValidationReport { errors }
}

fn edges(
    dependencies: &IndexMap<Alias, InputDependencies>,
) -> impl Iterator<Item = (&Alias, &str, &DependencyTarget)> + '_ {
    dependencies.iter().flat_map(|(consumer, inputs)| {
        inputs
            .iter()
            .map(move |(input, target)| (consumer, input.as_str(), target))
    })
}

fn validate_edge(
    consumer: &Alias,
    input: &str,
    target: &DependencyTarget,
    instances: &InstanceTable,
    alias_lookup: &IndexMap<Alias, String>,
) -> Result<(), DependencyError> {
    if *consumer == target.task {
        return Err(CircularReferenceError {
            alias: consumer.to_string(),
            input: input.to_string(),
        }
        .into());
    }

    let Some(consumer_instance) = instances.get(consumer) else {
        return Err(missing_consumer(consumer, alias_lookup).into());
    };

    let consumer_def = consumer_instance.definition();
    if !consumer_def.has_input(input) {
        return Err(MissingInputError {
            alias: consumer.to_string(),
            requested_input: input.to_string(),
            available_inputs: consumer_def.input_names(),
        }
        .into());
    }

    let Some(producer_instance) = instances.get(&target.task) else {
        return Err(MissingInstanceError::Direct {
            name: target.task.to_string(),
            site: ReferenceSite::Producer,
        }
        .into());
    };

    let producer_def = producer_instance.definition();
    if !producer_def.has_output(&target.output) {
        return Err(MissingOutputError {
            alias: target.task.to_string(),
            requested_output: target.output.clone(),
            available_outputs: producer_def.output_names(),
        }
        .into());
    }

    Ok(())
}

/// Distinguish a definition missing from the task list from a mistyped alias
fn missing_consumer(consumer: &Alias, alias_lookup: &IndexMap<Alias, String>) -> MissingInstanceError {
    match alias_lookup.get(consumer) {
        Some(original) if original.as_str() != consumer.as_str() => MissingInstanceError::Aliased {
            alias: consumer.to_string(),
            original_name: original.clone(),
        },
        _ => MissingInstanceError::Direct {
            name: consumer.to_string(),
            site: ReferenceSite::Consumer,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::TaskDefinition;
    use crate::graph::TaskInstance;
    use crate::types;

    fn table() -> InstanceTable {
        let a = TaskDefinition::builder("A")
            .output("o1", types::int())
            .build()
            .unwrap();
        let b = TaskDefinition::builder("B")
            .input("i1", types::int())
            .input("i2", types::int())
            .build()
            .unwrap();

        let mut instances = InstanceTable::new();
        instances.insert(Alias::new("A"), TaskInstance::new(Alias::new("A"), a));
        instances.insert(Alias::new("B"), TaskInstance::new(Alias::new("B"), b));
        instances
    }

    fn wiring(consumer: &str, input: &str, target: DependencyTarget) -> IndexMap<Alias, InputDependencies> {
        let mut inputs = InputDependencies::new();
        inputs.insert(input.to_string(), target);
        let mut deps = IndexMap::new();
        deps.insert(Alias::new(consumer), inputs);
        deps
    }

    fn lookup(pairs: &[(&str, &str)]) -> IndexMap<Alias, String> {
        pairs
            .iter()
            .map(|(alias, name)| (Alias::new(alias), name.to_string()))
            .collect()
    }

    #[test]
    fn valid_edge_passes() {
        let deps = wiring("B", "i1", DependencyTarget::new("A", "o1"));
        assert!(validate_dependencies(&deps, &table(), &lookup(&[("B", "B")])).is_ok());
    }

    #[test]
    fn self_reference_checked_first() {
        // consumer missing and input unknown, but the cycle wins
        let deps = wiring("Z", "nope", DependencyTarget::new("Z", "whatever"));
        let err = validate_dependencies(&deps, &table(), &lookup(&[("Z", "Z")])).unwrap_err();
        assert_eq!(
            err,
            DependencyError::CircularReference(CircularReferenceError {
                alias: "Z".into(),
                input: "nope".into()
            })
        );
    }

    #[test]
    fn missing_consumer_direct_and_aliased() {
        let deps = wiring("C", "i1", DependencyTarget::new("A", "o1"));
        let err = validate_dependencies(&deps, &table(), &lookup(&[("C", "C")])).unwrap_err();
        assert!(matches!(
            err,
            DependencyError::MissingInstance(MissingInstanceError::Direct {
                ref name,
                site: ReferenceSite::Consumer
            }) if name == "C"
        ));

        let deps = wiring("C1", "i1", DependencyTarget::new("A", "o1"));
        let err = validate_dependencies(&deps, &table(), &lookup(&[("C1", "C")])).unwrap_err();
        assert_eq!(
            err,
            DependencyError::MissingInstance(MissingInstanceError::Aliased {
                alias: "C1".into(),
                original_name: "C".into()
            })
        );
    }

    #[test]
    fn missing_input_reports_declared_inputs() {
        let deps = wiring("B", "i9", DependencyTarget::new("A", "o1"));
        let err = validate_dependencies(&deps, &table(), &lookup(&[("B", "B")])).unwrap_err();
        match err {
            DependencyError::MissingInput(e) => {
                assert_eq!(e.requested_input, "i9");
                assert_eq!(e.available_inputs, ["i1", "i2"]);
            }
            other => panic!("Expected MissingInput, got {other:?}"),
        }
    }

    #[test]
    fn missing_producer_is_direct() {
        let deps = wiring("B", "i1", DependencyTarget::new("C", "o1"));
        let err = validate_dependencies(&deps, &table(), &lookup(&[("B", "B")])).unwrap_err();
        assert!(matches!(
            err,
            DependencyError::MissingInstance(MissingInstanceError::Direct {
                ref name,
                site: ReferenceSite::Producer
            }) if name == "C"
        ));
    }

    #[test]
    fn missing_output() {
        let deps = wiring("B", "i1", DependencyTarget::task("A"));
        let err = validate_dependencies(&deps, &table(), &lookup(&[("B", "B")])).unwrap_err();
        assert_eq!(
            err,
            DependencyError::MissingOutput(MissingOutputError {
                alias: "A".into(),
                requested_output: "result".into(),
                available_outputs: vec!["o1".into()],
            })
        );
    }

    #[test]
    fn collect_gathers_one_error_per_edge() {
        let mut inputs = InputDependencies::new();
        inputs.insert("i1".into(), DependencyTarget::new("A", "missing"));
        inputs.insert("i2".into(), DependencyTarget::new("A", "o1"));
        inputs.insert("i3".into(), DependencyTarget::new("B", "x"));
        let mut deps = IndexMap::new();
        deps.insert(Alias::new("B"), inputs);

        let report = collect_dependency_errors(&deps, &table(), &lookup(&[("B", "B")]));
        assert_eq!(report.len(), 2);
        assert!(matches!(report.errors[0], DependencyError::MissingOutput(_)));
        assert!(matches!(report.errors[1], DependencyError::CircularReference(_)));
    }
}
