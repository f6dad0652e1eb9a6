//! Resolution of property notify references.
//!
//! A property names the signal that announces its changes. When the signal belongs to the
//! property's own class it is referenced by its local signal index. When it lives in another
//! class of the hierarchy, or somewhere the registry cannot see, it is referenced by name and the
//! host runtime resolves it when the class is loaded.

use tracing::trace;

use crate::{
    model::PropertyDescriptor,
    registry::{ClassId, Registry},
    Error, Result,
};

/// Flag OR'ed into a string index to mark a notify signal referenced by name.
pub const IS_UNRESOLVED_SIGNAL: u32 = 0x7000_0000;

/// Where a property's notify signal is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyTarget {
    /// Local index among the signals of the property's own class
    Index(u32),
    /// Signal name, resolved by the host runtime
    Name(String),
}

/// Resolve the notify reference of `property`, declared on `class`.
///
/// The search starts at the explicitly named owner class, or at `class` itself, and walks up
/// the registered base chain:
///
/// - found in `class` → [`NotifyTarget::Index`]
/// - found in any other registered class → [`NotifyTarget::Name`]
/// - the owner or a base class is not registered → [`NotifyTarget::Name`]
///
/// # Errors
/// - [`Error::NotifySignalNotFound`] if the whole chain is registered and has no such signal
/// - [`Error::RecursionLimit`] for a cyclic base chain
pub fn resolve_notify(
    registry: &Registry,
    class: ClassId,
    property: &PropertyDescriptor,
) -> Result<Option<NotifyTarget>> {
    let Some(notify) = property.notify_ref() else {
        return Ok(None);
    };

    let entry = registry.class(class)?;
    let start = match notify.owner.as_deref() {
        None => class,
        Some(owner) if owner == entry.name() => class,
        Some(owner) => match registry.class_by_name(owner) {
            Some(id) => id,
            None => {
                trace!(property = property.name(), owner, "notify owner not registered");
                return Ok(Some(NotifyTarget::Name(notify.signal.clone())));
            }
        },
    };

    let lineage = registry.lineage(start)?;
    for candidate in std::iter::once(start).chain(lineage.registered.iter().copied()) {
        let Some(index) = registry.class(candidate)?.signal_index(&notify.signal) else {
            continue;
        };

        if candidate == class {
            let index = u32::try_from(index).map_err(|_| {
                malformed_error!("signal index {} of `{}` out of range", index, entry.name())
            })?;
            return Ok(Some(NotifyTarget::Index(index)));
        }
        return Ok(Some(NotifyTarget::Name(notify.signal.clone())));
    }

    if lineage.unresolved.is_some() {
        return Ok(Some(NotifyTarget::Name(notify.signal.clone())));
    }

    Err(Error::NotifySignalNotFound {
        property: property.name().to_string(),
        signal: notify.signal.clone(),
        class: registry.class(start)?.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::MethodDescriptor, registry::ClassDef};

    struct Object {
        x: i32,
    }

    fn property(notify: &str) -> PropertyDescriptor {
        PropertyDescriptor::new::<i32>("x")
            .getter("x", |o: &Object| o.x)
            .notify(notify)
    }

    fn signal(name: &str) -> MethodDescriptor {
        MethodDescriptor::new(name.to_string(), |_: &mut Object| {}).signal()
    }

    #[test]
    fn local_signal() {
        let registry = Registry::new();
        let class = registry.add_class(ClassDef::new::<Object>("Object")).unwrap();
        registry.register(class, signal("other")).unwrap();
        registry.register(class, signal("xChanged")).unwrap();

        let target = resolve_notify(&registry, class, &property("xChanged")).unwrap();
        assert_eq!(target, Some(NotifyTarget::Index(1)));

        let qualified = resolve_notify(&registry, class, &property("Object::xChanged")).unwrap();
        assert_eq!(qualified, Some(NotifyTarget::Index(1)));
    }

    #[test]
    fn inherited_signal() {
        let registry = Registry::new();
        let base = registry.add_class(ClassDef::named("Base")).unwrap();
        let derived = registry
            .add_class(ClassDef::new::<Object>("Derived").base("Base"))
            .unwrap();
        registry.register(base, signal("changed")).unwrap();

        let target = resolve_notify(&registry, derived, &property("changed")).unwrap();
        assert_eq!(target, Some(NotifyTarget::Name("changed".to_string())));
    }

    #[test]
    fn unregistered_base_falls_back_to_name() {
        let registry = Registry::new();
        let class = registry
            .add_class(ClassDef::new::<Object>("Object").base("QObject"))
            .unwrap();

        let target = resolve_notify(&registry, class, &property("objectNameChanged")).unwrap();
        assert_eq!(
            target,
            Some(NotifyTarget::Name("objectNameChanged".to_string()))
        );

        let foreign = resolve_notify(&registry, class, &property("Elsewhere::ping")).unwrap();
        assert_eq!(foreign, Some(NotifyTarget::Name("ping".to_string())));
    }

    #[test]
    fn missing_signal() {
        let registry = Registry::new();
        let class = registry.add_class(ClassDef::new::<Object>("Object")).unwrap();
        let err = resolve_notify(&registry, class, &property("nowhere")).unwrap_err();
        assert!(matches!(
            err,
            Error::NotifySignalNotFound { ref signal, ref class, .. }
                if signal == "nowhere" && class == "Object"
        ));
    }

    #[test]
    fn no_notify() {
        let registry = Registry::new();
        let class = registry.add_class(ClassDef::new::<Object>("Object")).unwrap();
        let plain = PropertyDescriptor::new::<i32>("x").getter("x", |o: &Object| o.x);
        assert_eq!(resolve_notify(&registry, class, &plain).unwrap(), None);
    }
}
