//! Error types with fix suggestions
//!
//! Every failure is raised at definition time. A build either returns a
//! complete graph or one of the errors below, never a partial graph.

use std::fmt;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

// ─────────────────────────────────────────────────────────────
// Definition errors (WIRE-001 to WIRE-006)
// ─────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error(
        "WIRE-001: '{name}' was passed into a pipeline but it is not a task definition. \
         It has likely not been registered through TaskDefinition::builder"
    )]
    UnregisteredCallable { name: String },

    #[error("WIRE-002: Invalid item in task list: {repr}")]
    InvalidEntry { repr: String },

    #[error("WIRE-003: Alias '{alias}' is used by both '{first}' and '{second}'")]
    DuplicateAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("WIRE-004: Invalid {kind} name '{name}' (allowed: letters, digits, underscore)")]
    InvalidName { kind: &'static str, name: String },

    #[error("WIRE-005: Task '{task}' declares input '{input}' more than once")]
    DuplicateInput { task: String, input: String },

    #[error("WIRE-006: Task '{task}' declares output '{output}' more than once")]
    DuplicateOutput { task: String, output: String },
}

// ─────────────────────────────────────────────────────────────
// Dependency errors (WIRE-010 to WIRE-031)
// ─────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("WIRE-010: Circular reference detected in task '{alias}' input '{input}'")]
pub struct CircularReferenceError {
    pub alias: String,
    pub input: String,
}

/// Where an unknown task name was found in the dependency specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSite {
    /// The task owning the inputs (a specification key)
    Consumer,
    /// The task a dependency target points at
    Producer,
}

impl fmt::Display for ReferenceSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceSite::Consumer => write!(f, "dependency specification"),
            ReferenceSite::Producer => write!(f, "dependency target"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MissingInstanceError {
    #[error("WIRE-020: Task '{name}' in {site} not found in task list")]
    Direct { name: String, site: ReferenceSite },

    #[error(
        "WIRE-021: Task '{original_name}' (aliased by '{alias}' in dependency specification) \
         not found in task list"
    )]
    Aliased { alias: String, original_name: String },
}

impl MissingInstanceError {
    /// The alias that could not be resolved to an instance
    pub fn alias(&self) -> &str {
        match self {
            MissingInstanceError::Direct { name, .. } => name,
            MissingInstanceError::Aliased { alias, .. } => alias,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "WIRE-030: Task '{alias}' does not have input '{requested_input}'. Input list: {available_inputs:?}"
)]
pub struct MissingInputError {
    pub alias: String,
    pub requested_input: String,
    pub available_inputs: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "WIRE-031: Task '{alias}' does not have output '{requested_output}'. Output list: {available_outputs:?}"
)]
pub struct MissingOutputError {
    pub alias: String,
    pub requested_output: String,
    pub available_outputs: Vec<String>,
}

/// A violation found on a single dependency edge
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error(transparent)]
    CircularReference(#[from] CircularReferenceError),

    #[error(transparent)]
    MissingInstance(#[from] MissingInstanceError),

    #[error(transparent)]
    MissingInput(#[from] MissingInputError),

    #[error(transparent)]
    MissingOutput(#[from] MissingOutputError),
}

// ─────────────────────────────────────────────────────────────
// Type errors (WIRE-040)
// ─────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "WIRE-040: Type names must be unique. Two different types share the name '{name}'"
)]
pub struct DuplicateTypeNameError {
    pub name: String,
}

/// Every dependency violation of a graph, in specification order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<DependencyError>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.errors.len() == 1 {
            "dependency"
        } else {
            "dependencies"
        };
        write!(f, "{} invalid {}", self.errors.len(), noun)?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

/// Top-level error of a graph build
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error("{0}")]
    Invalid(ValidationReport),

    #[error(transparent)]
    DuplicateTypeName(#[from] DuplicateTypeNameError),
}

impl From<CircularReferenceError> for GraphError {
    fn from(err: CircularReferenceError) -> Self {
        GraphError::Dependency(err.into())
    }
}

impl From<MissingInstanceError> for GraphError {
    fn from(err: MissingInstanceError) -> Self {
        GraphError::Dependency(err.into())
    }
}

// ─────────────────────────────────────────────────────────────
// Manifest errors (WIRE-050 to WIRE-055)
// ─────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("WIRE-050: YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("WIRE-051: IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WIRE-052: Unknown type '{name}'")]
    UnknownType { name: String },

    #[error("WIRE-053: Invalid type expression '{expr}'")]
    TypeSyntax { expr: String },

    #[error("WIRE-054: Invalid dependency target '{raw}' (expected 'task' or 'task.output')")]
    InvalidTarget { raw: String },

    #[error("WIRE-055: Type '{name}' is declared more than once")]
    DuplicateTypeDeclaration { name: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl From<DefinitionError> for ManifestError {
    fn from(err: DefinitionError) -> Self {
        ManifestError::Graph(err.into())
    }
}

impl FixSuggestion for DefinitionError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            DefinitionError::UnregisteredCallable { .. } => {
                Some("Wrap the function in a TaskDefinition before adding it to the pipeline")
            }
            DefinitionError::InvalidEntry { .. } => {
                Some("Only task definitions may appear in the task list")
            }
            DefinitionError::DuplicateAlias { .. } => {
                Some("Give every use of a task a distinct alias")
            }
            DefinitionError::InvalidName { .. } => Some("Use names matching [A-Za-z0-9_]+"),
            DefinitionError::DuplicateInput { .. } => Some("Rename one of the inputs"),
            DefinitionError::DuplicateOutput { .. } => Some("Rename one of the outputs"),
        }
    }
}

impl FixSuggestion for DependencyError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            DependencyError::CircularReference(_) => {
                Some("Remove the dependency - a task cannot consume its own output")
            }
            DependencyError::MissingInstance(MissingInstanceError::Direct { .. }) => {
                Some("Add the task definition to the task list or fix the task name")
            }
            DependencyError::MissingInstance(MissingInstanceError::Aliased { .. }) => {
                Some("Add the aliased task definition to the task list")
            }
            DependencyError::MissingInput(_) => Some("Use one of the inputs from the input list"),
            DependencyError::MissingOutput(_) => {
                Some("Use one of the outputs from the output list")
            }
        }
    }
}

impl FixSuggestion for GraphError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            GraphError::Definition(err) => err.fix_suggestion(),
            GraphError::Dependency(err) => err.fix_suggestion(),
            GraphError::Invalid(_) => Some("Fix every listed dependency and rebuild"),
            GraphError::DuplicateTypeName(_) => {
                Some("Reuse one type value instead of constructing two types with the same name")
            }
        }
    }
}

impl FixSuggestion for ManifestError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ManifestError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            ManifestError::Io(_) => Some("Check file path and permissions"),
            ManifestError::UnknownType { .. } => {
                Some("Declare the type under types: before it is used, or use a built-in type")
            }
            ManifestError::TypeSyntax { .. } => Some("Use Name, List[Name] or Nullable[Name]"),
            ManifestError::InvalidTarget { .. } => Some("Use format: task or task.output"),
            ManifestError::DuplicateTypeDeclaration { .. } => {
                Some("Keep a single declaration per type name")
            }
            ManifestError::Graph(err) => err.fix_suggestion(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_lists_available_inputs() {
        let err = MissingInputError {
            alias: "B".to_string(),
            requested_input: "nope".to_string(),
            available_inputs: vec!["i1".to_string(), "i2".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("WIRE-030"));
        assert!(msg.contains(r#"["i1", "i2"]"#));
    }

    #[test]
    fn missing_instance_messages_distinguish_alias() {
        let direct = MissingInstanceError::Direct {
            name: "C".to_string(),
            site: ReferenceSite::Producer,
        };
        assert_eq!(
            direct.to_string(),
            "WIRE-020: Task 'C' in dependency target not found in task list"
        );

        let aliased = MissingInstanceError::Aliased {
            alias: "first".to_string(),
            original_name: "load".to_string(),
        };
        let msg = aliased.to_string();
        assert!(msg.contains("'load'"));
        assert!(msg.contains("'first'"));
        assert_eq!(aliased.alias(), "first");
    }

    #[test]
    fn graph_error_is_transparent() {
        let err: GraphError = CircularReferenceError {
            alias: "A".to_string(),
            input: "i1".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "WIRE-010: Circular reference detected in task 'A' input 'i1'"
        );
        assert!(err.fix_suggestion().is_some());
    }

    #[test]
    fn report_renders_every_error() {
        let report = ValidationReport {
            errors: vec![
                CircularReferenceError {
                    alias: "A".to_string(),
                    input: "x".to_string(),
                }
                .into(),
                MissingInstanceError::Direct {
                    name: "Z".to_string(),
                    site: ReferenceSite::Consumer,
                }
                .into(),
            ],
        };
        let msg = GraphError::Invalid(report).to_string();
        assert!(msg.starts_with("2 invalid dependencies"));
        assert!(msg.contains("WIRE-010"));
        assert!(msg.contains("WIRE-020"));
    }

    #[test]
    fn report_noun_agrees_with_count() {
        let report = ValidationReport {
            errors: vec![CircularReferenceError {
                alias: "A".to_string(),
                input: "x".to_string(),
            }
            .into()],
        };
        assert!(report.to_string().starts_with("1 invalid dependency\n"));
        assert_eq!(ValidationReport::default().to_string(), "0 invalid dependencies");
    }

    #[test]
    fn manifest_error_delegates_suggestion() {
        let err: ManifestError = DefinitionError::InvalidEntry {
            repr: "42".to_string(),
        }
        .into();
        assert_eq!(
            err.fix_suggestion(),
            Some("Only task definitions may appear in the task list")
        );
    }
}
