//! Taskwire - resolve task definitions and dependency wiring into a validated
//! execution graph, before anything runs

pub mod alias;
pub mod builder;
pub mod collect;
pub mod definition;
pub mod dependency;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod pipeline;
pub mod types;
pub mod validate;

pub use alias::{resolve_aliases, AliasTables};
pub use builder::{build_execution_structure, AliasPolicy, BuildOptions, ValidationMode};
pub use collect::{collect_types, construct_type_registry, gather_types, TypeRegistry, TypeWalk};
pub use definition::{
    ContextDefinition, InputDefinition, OutputDefinition, PipelineEntry, TaskDefinition,
    TaskDefinitionBuilder,
};
pub use dependency::{
    Alias, DependencyEdge, DependencySpec, DependencyTarget, InputHandle, OutputHandle, TaskKey,
    DEFAULT_OUTPUT,
};
pub use error::{
    CircularReferenceError, DefinitionError, DependencyError, DuplicateTypeNameError,
    FixSuggestion, GraphError, ManifestError, MissingInputError, MissingInstanceError,
    MissingOutputError, ReferenceSite, ValidationReport,
};
pub use graph::{DependencyGraph, GraphSummary, InstanceTable, TaskInstance};
pub use manifest::Manifest;
pub use pipeline::{AmbientTypes, PipelineDefinition};
pub use types::{Field, TypeDescriptor, TypeHandle, TypeKind};
