//! Type collection
//!
//! Walks every type reachable from the task definitions and the ambient
//! context/environment types, emitting each distinct type once, and reduces
//! the walk into a name-keyed [`TypeRegistry`].

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::definition::TaskDefinition;
use crate::error::DuplicateTypeNameError;
use crate::pipeline::AmbientTypes;
use crate::types::{TypeDescriptor, TypeHandle};

/// Lazy post-order walk over type trees.
///
/// Nested types are emitted before the types containing them. One visited
/// set is shared by every root, so a type reachable from several roots is
/// emitted once.
#[derive(Debug, Default)]
pub struct TypeWalk {
    roots: VecDeque<TypeDescriptor>,
    stack: Vec<(TypeDescriptor, bool)>,
    seen: HashSet<TypeHandle>,
}

impl TypeWalk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roots<I>(roots: I) -> Self
    where
        I: IntoIterator<Item = TypeDescriptor>,
    {
        Self {
            roots: roots.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Queue another root behind the current ones
    pub fn push_root(&mut self, root: TypeDescriptor) {
        self.roots.push_back(root);
    }

    /// Number of distinct types visited so far
    pub fn visited(&self) -> usize {
        self.seen.len()
    }
}

impl Iterator for TypeWalk {
    type Item = TypeDescriptor;

    fn next(&mut self) -> Option<TypeDescriptor> {
        loop {
            match self.stack.pop() {
                Some((ty, true)) => return Some(ty),
                Some((ty, false)) => {
                    if !self.seen.insert(ty.handle().clone()) {
                        continue;
                    }
                    let children = ty.children();
                    self.stack.push((ty, true));
                    for child in children.into_iter().rev() {
                        if !self.seen.contains(child.handle()) {
                            self.stack.push((child, false));
                        }
                    }
                }
                None => {
                    let root = self.roots.pop_front()?;
                    self.stack.push((root, false));
                }
            }
        }
    }
}

/// Walk over every type of `definitions`, then the context configs, then the
/// environment type
pub fn gather_types(definitions: &[Arc<TaskDefinition>], ambient: &AmbientTypes) -> TypeWalk {
    let task_types = definitions
        .iter()
        .flat_map(|def| def.declared_types().cloned().collect::<Vec<_>>());
    let context_types = ambient
        .contexts
        .values()
        .filter_map(|context| context.config.clone());

    TypeWalk::with_roots(
        task_types
            .chain(context_types)
            .chain(ambient.environment.clone()),
    )
}

/// Name -> type, with at most one identity per name
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ty`. Re-registering the same type is a no-op; a different type
    /// under a known name is an error.
    pub fn insert(&mut self, ty: TypeDescriptor) -> Result<(), DuplicateTypeNameError> {
        match self.types.get(ty.name()) {
            Some(existing) if existing.is_same(&ty) => Ok(()),
            Some(_) => Err(DuplicateTypeNameError {
                name: ty.name().to_string(),
            }),
            None => {
                self.types.insert(ty.name().to_string(), ty);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Reduce a type sequence into a registry
pub fn construct_type_registry<I>(types: I) -> Result<TypeRegistry, DuplicateTypeNameError>
where
    I: IntoIterator<Item = TypeDescriptor>,
{
    let mut registry = TypeRegistry::new();
    for ty in types {
        registry.insert(ty)?;
    }
    Ok(registry)
}

/// Collect the registry for a pipeline in one pass
#[instrument(skip_all, fields(definitions = definitions.len()))]
pub fn collect_types(
    definitions: &[Arc<TaskDefinition>],
    ambient: &AmbientTypes,
) -> Result<TypeRegistry, DuplicateTypeNameError> {
    let registry = construct_type_registry(gather_types(definitions, ambient))?;
    debug!(types = registry.len(), "collected types");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ContextDefinition;
    use crate::types::{self, Field};

    fn names(walk: TypeWalk) -> Vec<String> {
        walk.map(|t| t.name().to_string()).collect()
    }

    #[test]
    fn walk_is_post_order_and_deduplicated() {
        let point = TypeDescriptor::composite(
            "Point",
            vec![Field::new("x", types::int()), Field::new("y", types::int())],
        );
        let points = TypeDescriptor::list(&point);
        let walk = TypeWalk::with_roots([points, types::int()]);
        assert_eq!(names(walk), ["Int", "Point", "List.Point"]);
    }

    #[test]
    fn walk_is_lazy_across_roots() {
        let mut walk = TypeWalk::new();
        walk.push_root(types::string());
        assert_eq!(walk.next().unwrap().name(), "String");
        assert!(walk.next().is_none());

        walk.push_root(TypeDescriptor::nullable(&types::string()));
        assert_eq!(walk.next().unwrap().name(), "Nullable.String");
        assert!(walk.next().is_none());
        assert_eq!(walk.visited(), 2);
    }

    #[test]
    fn registry_same_identity_is_noop() {
        let money = TypeDescriptor::scalar("Money");
        let mut registry = TypeRegistry::new();
        registry.insert(money.clone()).unwrap();
        registry.insert(money).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_rejects_name_clash() {
        let err = construct_type_registry([
            TypeDescriptor::scalar("Money"),
            TypeDescriptor::scalar("Money"),
        ])
        .unwrap_err();
        assert_eq!(err.name, "Money");
    }

    #[test]
    fn gather_covers_definitions_contexts_and_environment() {
        let task_cfg = TypeDescriptor::composite("TaskConfig", vec![Field::new("n", types::int())]);
        let def = TaskDefinition::builder("t")
            .input("a", types::string())
            .output("b", TypeDescriptor::list(&types::string()))
            .config(task_cfg)
            .build()
            .unwrap();

        let ctx_cfg = TypeDescriptor::composite(
            "ContextConfig",
            vec![Field::new("log_level", types::string()).optional()],
        );
        let mut ambient = AmbientTypes::default();
        ambient.contexts.insert(
            "default".into(),
            ContextDefinition::new("default").unwrap().with_config(ctx_cfg),
        );
        ambient.environment = Some(TypeDescriptor::composite(
            "Environment",
            vec![Field::new("flag", types::bool())],
        ));

        let registry = collect_types(&[def], &ambient).unwrap();
        let found: Vec<_> = registry.names().collect();
        assert_eq!(
            found,
            [
                "String",
                "List.String",
                "Int",
                "TaskConfig",
                "ContextConfig",
                "Bool",
                "Environment"
            ]
        );
    }

    #[test]
    fn shared_types_across_definitions_collected_once() {
        let a = TaskDefinition::builder("a").output("o", types::int()).build().unwrap();
        let b = TaskDefinition::builder("b").input("i", types::int()).build().unwrap();
        let registry = collect_types(&[a, b], &AmbientTypes::default()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("Int"));
        assert!(registry.get("Int").unwrap().is_same(&types::int()));
    }
}
