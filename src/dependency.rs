//! Dependency specification: aliases, raw keys, targets and edges

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

/// Output name used when a target does not name one
pub const DEFAULT_OUTPUT: &str = "result";

/// Name of one use of a task definition inside a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Alias(Arc<str>);

impl Alias {
    pub fn new(name: &str) -> Self {
        Alias(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Alias {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Alias {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Alias {
    fn from(s: &str) -> Self {
        Alias::new(s)
    }
}

impl From<String> for Alias {
    fn from(s: String) -> Self {
        Alias(Arc::from(s))
    }
}

/// Raw key of a dependency specification entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    /// Bare definition name; the alias is the name itself
    Name(String),
    /// Definition used under an explicit alias
    Aliased { name: String, alias: String },
}

impl TaskKey {
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        TaskKey::Aliased {
            name: name.into(),
            alias: alias.into(),
        }
    }

    /// Definition name this key refers to
    pub fn name(&self) -> &str {
        match self {
            TaskKey::Name(name) => name,
            TaskKey::Aliased { name, .. } => name,
        }
    }

    /// Alias this key resolves to
    pub fn alias(&self) -> &str {
        match self {
            TaskKey::Name(name) => name,
            TaskKey::Aliased { alias, .. } => alias,
        }
    }
}

impl From<&str> for TaskKey {
    fn from(name: &str) -> Self {
        TaskKey::Name(name.to_string())
    }
}

impl From<String> for TaskKey {
    fn from(name: String) -> Self {
        TaskKey::Name(name)
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKey::Name(name) => f.write_str(name),
            TaskKey::Aliased { name, alias } => write!(f, "{} as {}", name, alias),
        }
    }
}

/// Producer side of a dependency: (producer alias, output name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyTarget {
    pub task: Alias,
    pub output: String,
}

impl DependencyTarget {
    pub fn new(task: impl Into<Alias>, output: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            output: output.into(),
        }
    }

    /// Target the default `result` output of `task`
    pub fn task(task: impl Into<Alias>) -> Self {
        Self::new(task, DEFAULT_OUTPUT)
    }

    /// Parse `task` or `task.output`
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.split_once('.') {
            None if !raw.is_empty() => Some(Self::task(raw)),
            Some((task, output)) if !task.is_empty() && !output.is_empty() && !output.contains('.') => {
                Some(Self::new(task, output))
            }
            _ => None,
        }
    }
}

impl fmt::Display for DependencyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.task, self.output)
    }
}

/// Input name -> producer, for one consumer
pub type InputDependencies = IndexMap<String, DependencyTarget>;

/// One raw entry of a dependency specification
#[derive(Debug, Clone)]
pub struct DependencyEntry {
    pub key: TaskKey,
    pub inputs: InputDependencies,
}

/// Ordered dependency specification as supplied by the caller.
///
/// Entries are kept as given, duplicates included, so alias conflicts can be
/// detected during resolution.
#[derive(Debug, Clone, Default)]
pub struct DependencySpec {
    entries: Vec<DependencyEntry>,
}

impl DependencySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry for `key` with the given input wiring
    pub fn task<K, I, S>(mut self, key: K, inputs: I) -> Self
    where
        K: Into<TaskKey>,
        I: IntoIterator<Item = (S, DependencyTarget)>,
        S: Into<String>,
    {
        self.push(key, inputs);
        self
    }

    pub fn push<K, I, S>(&mut self, key: K, inputs: I)
    where
        K: Into<TaskKey>,
        I: IntoIterator<Item = (S, DependencyTarget)>,
        S: Into<String>,
    {
        self.entries.push(DependencyEntry {
            key: key.into(),
            inputs: inputs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        });
    }

    pub fn entries(&self) -> &[DependencyEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// (alias, input) address of a consumer slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InputHandle {
    pub task: Alias,
    pub input: String,
}

impl InputHandle {
    pub fn new(task: impl Into<Alias>, input: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            input: input.into(),
        }
    }
}

impl fmt::Display for InputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.task, self.input)
    }
}

/// (alias, output) address of a producer slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OutputHandle {
    pub task: Alias,
    pub output: String,
}

impl OutputHandle {
    pub fn new(task: impl Into<Alias>, output: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            output: output.into(),
        }
    }
}

impl From<&DependencyTarget> for OutputHandle {
    fn from(target: &DependencyTarget) -> Self {
        Self {
            task: target.task.clone(),
            output: target.output.clone(),
        }
    }
}

impl fmt::Display for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.task, self.output)
    }
}

/// Validated link from a consumer input to a producer output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyEdge {
    pub input: InputHandle,
    pub output: OutputHandle,
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.input, self.output)
    }
}
