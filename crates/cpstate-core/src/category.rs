//! Resource categories used to select resources at finalize time

use std::fmt;

/// Annotation that keeps the control plane from reconciling a resource
pub const PAUSED_ANNOTATION: &str = "example.io/paused";

/// A semantic label that maps to a set of concrete kinds through discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Category(&'static str);

impl Category {
    /// Namespaced claims for composite resources
    pub const CLAIM: Category = Category("claim");
    /// Cluster scoped composite resources
    pub const COMPOSITE: Category = Category("composite");
    /// Managed resources backed by external systems
    pub const MANAGED: Category = Category("managed");

    /// Categories whose resources are created paused
    pub const PAUSABLE: [Category; 3] = [Category::CLAIM, Category::COMPOSITE, Category::MANAGED];

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
