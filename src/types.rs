//! Type descriptors with explicit identity
//!
//! Identity is carried by a [`TypeHandle`], never by the name:
//! - named types (scalars, composites) get a fresh handle on construction
//! - `List[T]` / `Nullable[T]` derive their handle from `T`, so two wrappers
//!   around the same inner type are the same type

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum HandleRepr {
    Named(u64),
    List(Arc<HandleRepr>),
    Nullable(Arc<HandleRepr>),
}

/// Opaque identity of a [`TypeDescriptor`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeHandle(HandleRepr);

impl TypeHandle {
    fn fresh() -> Self {
        TypeHandle(HandleRepr::Named(
            NEXT_HANDLE.fetch_add(1, Ordering::Relaxed),
        ))
    }
}

/// A field of a composite type
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeDescriptor,
    pub optional: bool,
    pub description: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            description: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Scalar,
    List(TypeDescriptor),
    Nullable(TypeDescriptor),
    Composite(Vec<Field>),
}

#[derive(Debug)]
struct TypeInfo {
    handle: TypeHandle,
    name: String,
    description: Option<String>,
    kind: TypeKind,
}

/// A named type record, cheap to clone (shared)
#[derive(Debug, Clone)]
pub struct TypeDescriptor(Arc<TypeInfo>);

impl TypeDescriptor {
    /// New scalar type with its own identity
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::named(name.into(), TypeKind::Scalar)
    }

    /// New composite (dictionary) type with its own identity
    pub fn composite(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::named(name.into(), TypeKind::Composite(fields))
    }

    pub fn list(inner: &TypeDescriptor) -> Self {
        Self(Arc::new(TypeInfo {
            handle: TypeHandle(HandleRepr::List(Arc::new(inner.handle().0.clone()))),
            name: format!("List.{}", inner.name()),
            description: None,
            kind: TypeKind::List(inner.clone()),
        }))
    }

    pub fn nullable(inner: &TypeDescriptor) -> Self {
        Self(Arc::new(TypeInfo {
            handle: TypeHandle(HandleRepr::Nullable(Arc::new(inner.handle().0.clone()))),
            name: format!("Nullable.{}", inner.name()),
            description: None,
            kind: TypeKind::Nullable(inner.clone()),
        }))
    }

    fn named(name: String, kind: TypeKind) -> Self {
        Self(Arc::new(TypeInfo {
            handle: TypeHandle::fresh(),
            name,
            description: None,
            kind,
        }))
    }

    /// Same type with a description attached (identity is kept)
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self(Arc::new(TypeInfo {
            handle: self.0.handle.clone(),
            name: self.0.name.clone(),
            description: Some(description.into()),
            kind: self.0.kind.clone(),
        }))
    }

    pub fn handle(&self) -> &TypeHandle {
        &self.0.handle
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    /// True when both descriptors denote the same type
    pub fn is_same(&self, other: &TypeDescriptor) -> bool {
        self.0.handle == other.0.handle
    }

    /// Directly nested types, in declaration order
    pub fn children(&self) -> Vec<TypeDescriptor> {
        match &self.0.kind {
            TypeKind::Scalar => Vec::new(),
            TypeKind::List(inner) | TypeKind::Nullable(inner) => vec![inner.clone()],
            TypeKind::Composite(fields) => fields.iter().map(|f| f.ty.clone()).collect(),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.0.kind {
            TypeKind::Scalar => "scalar",
            TypeKind::List(_) => "list",
            TypeKind::Nullable(_) => "nullable",
            TypeKind::Composite(_) => "composite",
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────
// Built-in scalars (one identity per process)
// ─────────────────────────────────────────────────────────────

static ANY: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::scalar("Any"));
static BOOL: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::scalar("Bool"));
static INT: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::scalar("Int"));
static FLOAT: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::scalar("Float"));
static STRING: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::scalar("String"));
static PATH: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::scalar("Path"));

pub fn any() -> TypeDescriptor {
    ANY.clone()
}

pub fn bool() -> TypeDescriptor {
    BOOL.clone()
}

pub fn int() -> TypeDescriptor {
    INT.clone()
}

pub fn float() -> TypeDescriptor {
    FLOAT.clone()
}

pub fn string() -> TypeDescriptor {
    STRING.clone()
}

pub fn path() -> TypeDescriptor {
    PATH.clone()
}

/// Look up a built-in scalar by name
pub fn builtin(name: &str) -> Option<TypeDescriptor> {
    match name {
        "Any" => Some(any()),
        "Bool" => Some(bool()),
        "Int" => Some(int()),
        "Float" => Some(float()),
        "String" => Some(string()),
        "Path" => Some(path()),
        _ => None,
    }
}

/// Parsed form of a type expression such as `List[Nullable[Int]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named(String),
    List(Box<TypeExpr>),
    Nullable(Box<TypeExpr>),
}

impl TypeExpr {
    /// Parse `Name`, `List[expr]` or `Nullable[expr]`. Returns `None` on bad syntax.
    pub fn parse(input: &str) -> Option<TypeExpr> {
        let input = input.trim();
        if let Some(open) = input.find('[') {
            let inner = input[open + 1..].strip_suffix(']')?;
            let wrapped = Box::new(TypeExpr::parse(inner)?);
            return match input[..open].trim() {
                "List" => Some(TypeExpr::List(wrapped)),
                "Nullable" => Some(TypeExpr::Nullable(wrapped)),
                _ => None,
            };
        }

        let valid = !input.is_empty()
            && input
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        valid.then(|| TypeExpr::Named(input.to_string()))
    }

    /// Build a descriptor, resolving names through `lookup`.
    /// Returns the first unresolved name on failure.
    pub fn resolve<F>(&self, lookup: &F) -> Result<TypeDescriptor, String>
    where
        F: Fn(&str) -> Option<TypeDescriptor>,
    {
        match self {
            TypeExpr::Named(name) => lookup(name).ok_or_else(|| name.clone()),
            TypeExpr::List(inner) => Ok(TypeDescriptor::list(&inner.resolve(lookup)?)),
            TypeExpr::Nullable(inner) => Ok(TypeDescriptor::nullable(&inner.resolve(lookup)?)),
        }
    }
}
