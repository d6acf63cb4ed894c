//! Role record types

use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Handle to a role record inside one role graph.
///
/// Handles carry the id of the graph that minted them, so a handle can never
/// silently address a record of another registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId {
    pub(crate) graph: u32,
    pub(crate) index: u32,
}

impl RoleId {
    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role#{}.{}", self.graph, self.index)
    }
}

/// A stored permission specifier
#[derive(Clone)]
pub(crate) struct Specifier {
    pub(crate) text: String,
    pub(crate) pattern: Option<Arc<Regex>>,
}

impl Specifier {
    /// Literal equality, or an unanchored pattern search
    pub(crate) fn matches(&self, action: &str) -> bool {
        if self.text == action {
            return true;
        }

        self.pattern
            .as_ref()
            .is_some_and(|re| re.is_match(action))
    }
}

impl fmt::Debug for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specifier")
            .field("text", &self.text)
            .field("compiled", &self.pattern.is_some())
            .finish()
    }
}

/// Graph node: one role with its specifiers and adjacency
#[derive(Debug, Clone)]
pub(crate) struct RoleNode {
    pub(crate) name: String,
    pub(crate) specifiers: Vec<Specifier>,
    pub(crate) parents: Vec<RoleId>,
    pub(crate) children: Vec<RoleId>,
}

impl RoleNode {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            specifiers: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    pub(crate) fn has_specifier(&self, text: &str) -> bool {
        self.specifiers.iter().any(|s| s.text == text)
    }

    pub(crate) fn grants(&self, action: &str) -> bool {
        self.specifiers.iter().any(|s| s.matches(action))
    }
}
