//! Task definitions and the entries of a pipeline's task list

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DefinitionError;
use crate::types::TypeDescriptor;

/// Precompiled name pattern shared by tasks, inputs, outputs and aliases
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// Check a user-supplied name against the allowed pattern
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), DefinitionError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(DefinitionError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct InputDefinition {
    pub name: String,
    pub ty: TypeDescriptor,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutputDefinition {
    pub name: String,
    pub ty: TypeDescriptor,
    pub description: Option<String>,
}

/// Immutable, reusable unit of computation.
///
/// Shared through `Arc` by every task instance that uses it.
#[derive(Debug)]
pub struct TaskDefinition {
    name: String,
    description: Option<String>,
    inputs: Vec<InputDefinition>,
    outputs: Vec<OutputDefinition>,
    config: Option<TypeDescriptor>,
}

impl TaskDefinition {
    pub fn builder(name: impl Into<String>) -> TaskDefinitionBuilder {
        TaskDefinitionBuilder {
            name: name.into(),
            description: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            config: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn inputs(&self) -> &[InputDefinition] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputDefinition] {
        &self.outputs
    }

    pub fn config(&self) -> Option<&TypeDescriptor> {
        self.config.as_ref()
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|i| i.name == name)
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o.name == name)
    }

    pub fn input(&self, name: &str) -> Option<&InputDefinition> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputDefinition> {
        self.outputs.iter().find(|o| o.name == name)
    }

    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|i| i.name.clone()).collect()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.outputs.iter().map(|o| o.name.clone()).collect()
    }

    /// Root types declared by this definition: inputs, outputs, then config
    pub fn declared_types(&self) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        self.inputs
            .iter()
            .map(|i| &i.ty)
            .chain(self.outputs.iter().map(|o| &o.ty))
            .chain(self.config.iter())
    }
}

pub struct TaskDefinitionBuilder {
    name: String,
    description: Option<String>,
    inputs: Vec<InputDefinition>,
    outputs: Vec<OutputDefinition>,
    config: Option<TypeDescriptor>,
}

impl TaskDefinitionBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn input(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.inputs.push(InputDefinition {
            name: name.into(),
            ty,
            description: None,
        });
        self
    }

    pub fn output(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.outputs.push(OutputDefinition {
            name: name.into(),
            ty,
            description: None,
        });
        self
    }

    pub fn input_def(mut self, input: InputDefinition) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output_def(mut self, output: OutputDefinition) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn config(mut self, ty: TypeDescriptor) -> Self {
        self.config = Some(ty);
        self
    }

    /// Validate names and freeze the definition
    pub fn build(self) -> Result<Arc<TaskDefinition>, DefinitionError> {
        validate_name("task", &self.name)?;

        let mut seen = HashSet::new();
        for input in &self.inputs {
            validate_name("input", &input.name)?;
            if !seen.insert(input.name.as_str()) {
                return Err(DefinitionError::DuplicateInput {
                    task: self.name.clone(),
                    input: input.name.clone(),
                });
            }
        }

        seen.clear();
        for output in &self.outputs {
            validate_name("output", &output.name)?;
            if !seen.insert(output.name.as_str()) {
                return Err(DefinitionError::DuplicateOutput {
                    task: self.name.clone(),
                    output: output.name.clone(),
                });
            }
        }

        Ok(Arc::new(TaskDefinition {
            name: self.name,
            description: self.description,
            inputs: self.inputs,
            outputs: self.outputs,
            config: self.config,
        }))
    }
}

/// Execution context whose config type feeds the type registry
#[derive(Debug, Clone)]
pub struct ContextDefinition {
    pub name: String,
    pub config: Option<TypeDescriptor>,
    pub description: Option<String>,
}

impl ContextDefinition {
    pub fn new(name: impl Into<String>) -> Result<Self, DefinitionError> {
        let name = name.into();
        validate_name("context", &name)?;
        Ok(Self {
            name,
            config: None,
            description: None,
        })
    }

    pub fn with_config(mut self, ty: TypeDescriptor) -> Self {
        self.config = Some(ty);
        self
    }
}

/// One item of a pipeline's task list, classified once at the boundary
#[derive(Debug, Clone)]
pub enum PipelineEntry {
    /// A registered task definition
    Definition(Arc<TaskDefinition>),
    /// A bare function that was never turned into a task definition
    UnregisteredCallable { name: String },
    /// Anything else
    Invalid { repr: String },
}

impl PipelineEntry {
    pub fn callable(name: impl Into<String>) -> Self {
        PipelineEntry::UnregisteredCallable { name: name.into() }
    }

    pub fn invalid(value: impl fmt::Debug) -> Self {
        PipelineEntry::Invalid {
            repr: format!("{:?}", value),
        }
    }

    /// Accept a definition, reject anything else
    pub fn definition(&self) -> Result<&Arc<TaskDefinition>, DefinitionError> {
        match self {
            PipelineEntry::Definition(def) => Ok(def),
            PipelineEntry::UnregisteredCallable { name } => {
                Err(DefinitionError::UnregisteredCallable { name: name.clone() })
            }
            PipelineEntry::Invalid { repr } => {
                Err(DefinitionError::InvalidEntry { repr: repr.clone() })
            }
        }
    }
}

impl From<Arc<TaskDefinition>> for PipelineEntry {
    fn from(def: Arc<TaskDefinition>) -> Self {
        PipelineEntry::Definition(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    #[test]
    fn builder_produces_definition() {
        let def = TaskDefinition::builder("add")
            .description("adds two numbers")
            .input("a", types::int())
            .input("b", types::int())
            .output("sum", types::int())
            .build()
            .unwrap();

        assert_eq!(def.name(), "add");
        assert!(def.has_input("a"));
        assert!(!def.has_input("sum"));
        assert!(def.has_output("sum"));
        assert_eq!(def.input_names(), ["a", "b"]);
        assert_eq!(def.output("sum").unwrap().ty.name(), "Int");
        assert_eq!(def.declared_types().count(), 3);
    }

    #[test]
    fn config_is_last_declared_type() {
        let cfg = types::TypeDescriptor::composite("AddConfig", vec![]);
        let def = TaskDefinition::builder("add")
            .input("a", types::int())
            .config(cfg.clone())
            .build()
            .unwrap();
        let last = def.declared_types().last().unwrap();
        assert!(last.is_same(&cfg));
    }

    #[test]
    fn duplicate_input_rejected() {
        let err = TaskDefinition::builder("t")
            .input("x", types::int())
            .input("x", types::string())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::DuplicateInput {
                task: "t".into(),
                input: "x".into()
            }
        );
    }

    #[test]
    fn duplicate_output_rejected() {
        let err = TaskDefinition::builder("t")
            .output("x", types::int())
            .output("x", types::int())
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateOutput { .. }));
    }

    #[test]
    fn invalid_names_rejected() {
        let err = TaskDefinition::builder("bad name").build().unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidName { kind: "task", .. }));

        let err = TaskDefinition::builder("ok")
            .output("o-1", types::int())
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidName { kind: "output", .. }));

        assert!(ContextDefinition::new("de fault").is_err());
    }

    #[test]
    fn entry_classification() {
        let def = TaskDefinition::builder("a").build().unwrap();
        let entry = PipelineEntry::from(def);
        assert_eq!(entry.definition().unwrap().name(), "a");

        let err = PipelineEntry::callable("helper").definition().unwrap_err();
        assert!(matches!(err, DefinitionError::UnregisteredCallable { ref name } if name == "helper"));
        assert!(err.to_string().contains("TaskDefinition::builder"));

        let err = PipelineEntry::invalid(42).definition().unwrap_err();
        assert_eq!(err, DefinitionError::InvalidEntry { repr: "42".into() });
    }
}
