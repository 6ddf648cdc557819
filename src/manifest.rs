//! Pipeline manifests (YAML)
//!
//! A manifest declares everything one build needs:
//!
//! ```yaml
//! name: etl
//! options:
//!   aliases: strict
//! types:
//!   - name: Row
//!     fields:
//!       id: Int
//!       note: { type: String, optional: true }
//! tasks:
//!   - name: extract
//!     outputs: [{ name: rows, type: "List[Row]" }]
//!   - name: load
//!     inputs: [{ name: rows, type: "List[Row]" }]
//! dependencies:
//!   - task: load
//!     inputs:
//!       rows: extract.rows
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use tracing::debug;

use crate::builder::BuildOptions;
use crate::definition::{
    ContextDefinition, InputDefinition, OutputDefinition, PipelineEntry, TaskDefinition,
};
use crate::dependency::{DependencySpec, DependencyTarget, TaskKey};
use crate::error::ManifestError;
use crate::pipeline::{AmbientTypes, PipelineDefinition};
use crate::types::{self, Field, TypeDescriptor, TypeExpr};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: BuildOptions,
    #[serde(default)]
    pub types: Vec<TypeSpec>,
    #[serde(default)]
    pub contexts: IndexMap<String, ContextSpec>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub tasks: Vec<EntrySpec>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEntrySpec>,
}

/// Declared type: composite when it has fields, scalar otherwise
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<IndexMap<String, FieldSpec>>,
}

/// `field: Type` or `field: { type, optional, description }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Type(String),
    Detailed(DetailedField),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedField {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextSpec {
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One item of `tasks:`
///
/// A mapping with a `name` key is a task, one with a `callable` key is a bare
/// callable; both report their own field errors. Anything else is kept as is.
#[derive(Debug)]
pub enum EntrySpec {
    Task(TaskSpec),
    Callable(CallableSpec),
    Other(serde_yaml::Value),
}

impl<'de> Deserialize<'de> for EntrySpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        let (is_task, is_callable) = match value.as_mapping() {
            Some(map) => (map.contains_key("name"), map.contains_key("callable")),
            None => (false, false),
        };

        if is_task {
            serde_yaml::from_value(value)
                .map(EntrySpec::Task)
                .map_err(de::Error::custom)
        } else if is_callable {
            serde_yaml::from_value(value)
                .map(EntrySpec::Callable)
                .map_err(de::Error::custom)
        } else {
            Ok(EntrySpec::Other(value))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: Vec<IoSpec>,
    #[serde(default)]
    pub outputs: Vec<IoSpec>,
    #[serde(default)]
    pub config: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallableSpec {
    pub callable: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoSpec {
    pub name: String,
    #[serde(rename = "type", default = "default_io_type")]
    pub ty: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_io_type() -> String {
    "Any".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyEntrySpec {
    pub task: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// input -> `task` or `task.output`
    #[serde(default)]
    pub inputs: IndexMap<String, String>,
}

/// Everything a build needs, resolved from a manifest
#[derive(Debug)]
pub struct ManifestParts {
    pub entries: Vec<PipelineEntry>,
    pub spec: DependencySpec,
    pub ambient: AmbientTypes,
}

/// Declared types by name, resolved in declaration order
#[derive(Default)]
struct TypeScope {
    declared: IndexMap<String, TypeDescriptor>,
}

impl TypeScope {
    fn lookup(&self, name: &str) -> Option<TypeDescriptor> {
        self.declared
            .get(name)
            .cloned()
            .or_else(|| types::builtin(name))
    }

    fn resolve(&self, expr: &str) -> Result<TypeDescriptor, ManifestError> {
        let parsed = TypeExpr::parse(expr).ok_or_else(|| ManifestError::TypeSyntax {
            expr: expr.to_string(),
        })?;
        parsed
            .resolve(&|name: &str| self.lookup(name))
            .map_err(|name| ManifestError::UnknownType { name })
    }

    fn declare(&mut self, spec: &TypeSpec) -> Result<(), ManifestError> {
        if self.declared.contains_key(&spec.name) || types::builtin(&spec.name).is_some() {
            return Err(ManifestError::DuplicateTypeDeclaration {
                name: spec.name.clone(),
            });
        }

        let ty = match &spec.fields {
            None => TypeDescriptor::scalar(&spec.name),
            Some(fields) => {
                let fields = fields
                    .iter()
                    .map(|(name, field)| self.field(name, field))
                    .collect::<Result<Vec<_>, _>>()?;
                TypeDescriptor::composite(&spec.name, fields)
            }
        };
        let ty = match &spec.description {
            Some(description) => ty.with_description(description),
            None => ty,
        };

        self.declared.insert(spec.name.clone(), ty);
        Ok(())
    }

    fn field(&self, name: &str, spec: &FieldSpec) -> Result<Field, ManifestError> {
        let field = match spec {
            FieldSpec::Type(expr) => Field::new(name, self.resolve(expr)?),
            FieldSpec::Detailed(detailed) => {
                let mut field = Field::new(name, self.resolve(&detailed.ty)?);
                field.optional = detailed.optional;
                field.description = detailed.description.clone();
                field
            }
        };
        Ok(field)
    }
}

impl Manifest {
    pub fn from_yaml(yaml: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Resolve types, task definitions and dependency wiring
    pub fn to_parts(&self) -> Result<ManifestParts, ManifestError> {
        let mut scope = TypeScope::default();
        for spec in &self.types {
            scope.declare(spec)?;
        }

        let entries = self
            .tasks
            .iter()
            .map(|entry| self.entry(&scope, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut spec = DependencySpec::new();
        for dep in &self.dependencies {
            let key = match &dep.alias {
                Some(alias) => TaskKey::aliased(dep.task.as_str(), alias.as_str()),
                None => TaskKey::from(dep.task.as_str()),
            };
            let inputs = dep
                .inputs
                .iter()
                .map(|(input, raw)| {
                    DependencyTarget::parse(raw)
                        .map(|target| (input.clone(), target))
                        .ok_or_else(|| ManifestError::InvalidTarget { raw: raw.clone() })
                })
                .collect::<Result<Vec<_>, _>>()?;
            spec.push(key, inputs);
        }

        let mut ambient = AmbientTypes::default();
        for (name, context) in &self.contexts {
            let mut definition = ContextDefinition::new(name.as_str())?;
            definition.description = context.description.clone();
            if let Some(config) = &context.config {
                definition = definition.with_config(scope.resolve(config)?);
            }
            ambient = ambient.with_context(definition);
        }
        if let Some(environment) = &self.environment {
            ambient = ambient.with_environment(scope.resolve(environment)?);
        }

        debug!(
            pipeline = %self.name,
            types = scope.declared.len(),
            entries = entries.len(),
            keys = spec.len(),
            "resolved manifest"
        );

        Ok(ManifestParts {
            entries,
            spec,
            ambient,
        })
    }

    /// Resolve and build, applying the manifest's own options
    pub fn build(&self) -> Result<PipelineDefinition, ManifestError> {
        self.build_with(&self.options)
    }

    pub fn build_with(&self, options: &BuildOptions) -> Result<PipelineDefinition, ManifestError> {
        let parts = self.to_parts()?;
        let pipeline = PipelineDefinition::build(
            &self.name,
            &parts.entries,
            &parts.spec,
            &parts.ambient,
            options,
        )?;
        Ok(match &self.description {
            Some(description) => pipeline.with_description(description.as_str()),
            None => pipeline,
        })
    }

    fn entry(&self, scope: &TypeScope, entry: &EntrySpec) -> Result<PipelineEntry, ManifestError> {
        let task = match entry {
            EntrySpec::Task(task) => task,
            EntrySpec::Callable(callable) => {
                return Ok(PipelineEntry::callable(callable.callable.as_str()));
            }
            EntrySpec::Other(value) => {
                let repr = serde_yaml::to_string(value)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_else(|_| format!("{:?}", value));
                return Ok(PipelineEntry::Invalid { repr });
            }
        };

        let mut builder = TaskDefinition::builder(task.name.as_str());
        if let Some(description) = &task.description {
            builder = builder.description(description.as_str());
        }
        for input in &task.inputs {
            builder = builder.input_def(InputDefinition {
                name: input.name.clone(),
                ty: scope.resolve(&input.ty)?,
                description: input.description.clone(),
            });
        }
        for output in &task.outputs {
            builder = builder.output_def(OutputDefinition {
                name: output.name.clone(),
                ty: scope.resolve(&output.ty)?,
                description: output.description.clone(),
            });
        }
        if let Some(config) = &task.config {
            builder = builder.config(scope.resolve(config)?);
        }

        Ok(PipelineEntry::Definition(builder.build()?))
    }
}
