//! Access-level classification of methods.
//!
//! The descriptor records an access level for every method. A method declared with an explicit
//! level keeps it. All others are classified by asking from which vantage point the method can be
//! reached:
//!
//! 1. reachable from an unrelated outside caller → [`Access::Public`]
//! 2. otherwise, if the class can still be derived from and the method is reachable from a
//!    derived class → [`Access::Protected`]
//! 3. otherwise → [`Access::Private`]
//!
//! The vantage test itself is the [`Vantage`] trait. [`DeclaredSection`] answers it from the
//! access section a method was declared in, which the [`crate::registry::ClassDecl`] cursor
//! records for every member.

use crate::model::{Access, MethodDescriptor};

/// Answers whether a method can be reached from a given vantage point.
pub trait Vantage {
    /// Reachable by code outside the class and its descendants.
    fn from_outside(&self, method: &MethodDescriptor) -> bool;

    /// Reachable by a class derived from the declaring class.
    fn from_derived(&self, method: &MethodDescriptor) -> bool;
}

/// Vantage test based on the section a method was declared in.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredSection;

impl Vantage for DeclaredSection {
    fn from_outside(&self, method: &MethodDescriptor) -> bool {
        method.declared_section() == Access::Public
    }

    fn from_derived(&self, method: &MethodDescriptor) -> bool {
        matches!(
            method.declared_section(),
            Access::Public | Access::Protected
        )
    }
}

/// Classifies methods without an explicit access level.
///
/// ```rust
/// use metaforge::prelude::*;
///
/// struct Target;
///
/// let prober = AccessProber::new();
/// let method = MethodDescriptor::new("run", |_: &mut Target| {}).section(Access::Protected);
///
/// assert_eq!(prober.classify(&method, false), Access::Protected);
/// assert_eq!(prober.classify(&method, true), Access::Private);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AccessProber<V = DeclaredSection> {
    vantage: V,
}

impl AccessProber {
    /// Prober using the declared section as vantage test.
    #[must_use]
    pub fn new() -> Self {
        AccessProber::default()
    }
}

impl<V: Vantage> AccessProber<V> {
    /// Prober using a custom vantage test.
    pub fn with_vantage(vantage: V) -> Self {
        AccessProber { vantage }
    }

    /// Access level of `method` in a class that is `final_class` or not.
    pub fn classify(&self, method: &MethodDescriptor, final_class: bool) -> Access {
        if let Some(access) = method.explicit_access() {
            return access;
        }

        if self.vantage.from_outside(method) {
            Access::Public
        } else if !final_class && self.vantage.from_derived(method) {
            Access::Protected
        } else {
            Access::Private
        }
    }
}
