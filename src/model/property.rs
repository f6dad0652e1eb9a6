use std::any::Any;

use bitflags::bitflags;

use crate::{
    model::callable::{Getter, Reset, Setter},
    typesystem::TypeInfo,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Flag word of a property record
    pub struct PropertyFlags: u32 {
        /// Has a getter or member
        const READABLE = 0x0000_0001;
        /// Has a setter or member
        const WRITABLE = 0x0000_0002;
        /// Has a reset function
        const RESETTABLE = 0x0000_0004;
        /// Type is an enum or flag set of the class
        const ENUM_OR_FLAG = 0x0000_0008;
        /// Alias of another property
        const ALIAS = 0x0000_0010;
        /// Setter follows the `setName` convention
        const STD_CPP_SET = 0x0000_0100;
        /// Value never changes
        const CONSTANT = 0x0000_0400;
        /// Cannot be overridden by derived classes
        const FINAL = 0x0000_0800;
        /// Visible in designers
        const DESIGNABLE = 0x0000_1000;
        /// Accessible to scripting
        const SCRIPTABLE = 0x0000_4000;
        /// Part of the persistent state
        const STORED = 0x0001_0000;
        /// The user-facing property of the class
        const USER = 0x0010_0000;
        /// Has a notify signal
        const NOTIFY = 0x0040_0000;
        /// Carries a revision number
        const REVISIONED = 0x0080_0000;
        /// Must be set on construction
        const REQUIRED = 0x0100_0000;
        /// Has a bindable accessor
        const BINDABLE = 0x0200_0000;
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        PropertyFlags::DESIGNABLE | PropertyFlags::SCRIPTABLE | PropertyFlags::STORED
    }
}

/// An optional property facet together with its literal source spelling.
#[derive(Debug, Clone)]
pub struct Facet<T> {
    /// How the facet was spelled at the declaration site
    pub spelling: String,
    /// The accessor itself
    pub accessor: T,
}

impl<T> Facet<T> {
    fn new(spelling: impl Into<String>, accessor: T) -> Self {
        Facet {
            spelling: spelling.into(),
            accessor,
        }
    }
}

/// Direct access to a backing field.
#[derive(Debug, Clone)]
pub struct MemberAccess {
    /// Reads the field
    pub get: Getter,
    /// Writes the field
    pub set: Setter,
}

/// Reference to the signal announcing a property change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRef {
    /// Literal spelling, e.g. `valueChanged` or `Base::changed`
    pub spelling: String,
    /// Class the signal is looked up in; `None` means the property's own class
    pub owner: Option<String>,
    /// Signal name
    pub signal: String,
}

impl NotifyRef {
    /// Parse a spelling; a `Class::` prefix selects the owning class.
    #[must_use]
    pub fn parse(spelling: &str) -> Self {
        let spelling = spelling.trim();
        let name = spelling.strip_prefix('&').unwrap_or(spelling);
        match name.rsplit_once("::") {
            Some((owner, signal)) => NotifyRef {
                spelling: spelling.to_string(),
                owner: Some(owner.to_string()),
                signal: signal.to_string(),
            },
            None => NotifyRef {
                spelling: spelling.to_string(),
                owner: None,
                signal: name.to_string(),
            },
        }
    }
}

/// Descriptor of a reflected property.
///
/// ```rust
/// use metaforge::prelude::*;
///
/// struct Counter { value: i32 }
///
/// let property = PropertyDescriptor::new::<i32>("value")
///     .getter("value", |c: &Counter| c.value)
///     .setter("setValue", |c: &mut Counter, v: i32| c.value = v)
///     .notify("valueChanged");
///
/// let flags = property.flags();
/// assert!(flags.contains(PropertyFlags::READABLE | PropertyFlags::WRITABLE));
/// assert!(flags.contains(PropertyFlags::NOTIFY | PropertyFlags::STD_CPP_SET));
/// ```
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    ty: TypeInfo,
    type_name: Option<String>,
    getter: Option<Facet<Getter>>,
    setter: Option<Facet<Setter>>,
    member: Option<Facet<MemberAccess>>,
    reset: Option<Facet<Reset>>,
    notify: Option<NotifyRef>,
    bindable: Option<String>,
    revision: Option<u32>,
    declared: PropertyFlags,
}

impl PropertyDescriptor {
    /// Describe a property named `name` of type `T`.
    #[must_use]
    pub fn new<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        PropertyDescriptor {
            name: name.into(),
            ty: TypeInfo::of::<T>(),
            type_name: None,
            getter: None,
            setter: None,
            member: None,
            reset: None,
            notify: None,
            bindable: None,
            revision: None,
            declared: PropertyFlags::default(),
        }
    }

    /// Spell the property type explicitly.
    #[must_use]
    pub fn type_name(mut self, text: impl Into<String>) -> Self {
        self.type_name = Some(text.into());
        self
    }

    /// Attach a getter.
    #[must_use]
    pub fn getter<C: Any, T: Any>(
        mut self,
        spelling: impl Into<String>,
        f: impl Fn(&C) -> T + Send + Sync + 'static,
    ) -> Self {
        self.getter = Some(Facet::new(spelling, Getter::new(f)));
        self
    }

    /// Attach a setter.
    #[must_use]
    pub fn setter<C: Any, T: Any + Clone>(
        mut self,
        spelling: impl Into<String>,
        f: impl Fn(&mut C, T) + Send + Sync + 'static,
    ) -> Self {
        self.setter = Some(Facet::new(spelling, Setter::new(f)));
        self
    }

    /// Attach a backing field, readable and writable directly.
    #[must_use]
    pub fn member<C: Any, T: Any + Clone>(
        mut self,
        spelling: impl Into<String>,
        get: fn(&C) -> &T,
        get_mut: fn(&mut C) -> &mut T,
    ) -> Self {
        let access = MemberAccess {
            get: Getter::field(get),
            set: Setter::field(get_mut),
        };
        self.member = Some(Facet::new(spelling, access));
        self
    }

    /// Attach a reset function.
    #[must_use]
    pub fn reset<C: Any>(
        mut self,
        spelling: impl Into<String>,
        f: impl Fn(&mut C) + Send + Sync + 'static,
    ) -> Self {
        self.reset = Some(Facet::new(spelling, Reset::new(f)));
        self
    }

    /// Name the signal emitted on change; `Class::signal` looks it up in `Class`.
    #[must_use]
    pub fn notify(mut self, spelling: &str) -> Self {
        self.notify = Some(NotifyRef::parse(spelling));
        self
    }

    /// Name the bindable accessor.
    #[must_use]
    pub fn bindable(mut self, spelling: impl Into<String>) -> Self {
        self.bindable = Some(spelling.into());
        self
    }

    /// Attach a revision number.
    #[must_use]
    pub fn revision(mut self, revision: u32) -> Self {
        self.revision = Some(revision);
        self
    }

    /// The value never changes.
    #[must_use]
    pub fn constant(mut self) -> Self {
        self.declared |= PropertyFlags::CONSTANT;
        self
    }

    /// Derived classes cannot override the property.
    #[must_use]
    pub fn final_(mut self) -> Self {
        self.declared |= PropertyFlags::FINAL;
        self
    }

    /// The property is the user-facing property of its class.
    #[must_use]
    pub fn user(mut self) -> Self {
        self.declared |= PropertyFlags::USER;
        self
    }

    /// The property must be set when the object is created.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.declared |= PropertyFlags::REQUIRED;
        self
    }

    /// Force the enum-or-flag bit.
    #[must_use]
    pub fn enum_or_flag(mut self) -> Self {
        self.declared |= PropertyFlags::ENUM_OR_FLAG;
        self
    }

    /// Toggle designer visibility (on by default).
    #[must_use]
    pub fn designable(mut self, on: bool) -> Self {
        self.declared.set(PropertyFlags::DESIGNABLE, on);
        self
    }

    /// Toggle scripting access (on by default).
    #[must_use]
    pub fn scriptable(mut self, on: bool) -> Self {
        self.declared.set(PropertyFlags::SCRIPTABLE, on);
        self
    }

    /// Toggle the stored attribute (on by default).
    #[must_use]
    pub fn stored(mut self, on: bool) -> Self {
        self.declared.set(PropertyFlags::STORED, on);
        self
    }

    /// Property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared Rust type.
    #[must_use]
    pub fn ty(&self) -> &TypeInfo {
        &self.ty
    }

    /// Explicit type spelling, if any.
    #[must_use]
    pub fn type_text(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Getter facet.
    #[must_use]
    pub fn get_facet(&self) -> Option<&Facet<Getter>> {
        self.getter.as_ref()
    }

    /// Setter facet.
    #[must_use]
    pub fn set_facet(&self) -> Option<&Facet<Setter>> {
        self.setter.as_ref()
    }

    /// Member facet.
    #[must_use]
    pub fn member_facet(&self) -> Option<&Facet<MemberAccess>> {
        self.member.as_ref()
    }

    /// Reset facet.
    #[must_use]
    pub fn reset_facet(&self) -> Option<&Facet<Reset>> {
        self.reset.as_ref()
    }

    /// Notify reference.
    #[must_use]
    pub fn notify_ref(&self) -> Option<&NotifyRef> {
        self.notify.as_ref()
    }

    /// Bindable accessor spelling.
    #[must_use]
    pub fn bindable_spelling(&self) -> Option<&str> {
        self.bindable.as_deref()
    }

    /// Revision number.
    #[must_use]
    pub fn revision_number(&self) -> Option<u32> {
        self.revision
    }

    /// Whether any way to read or write the property is attached.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.getter.is_some() || self.setter.is_some() || self.member.is_some()
    }

    /// Flag word: the declared attributes plus the bits implied by the attached facets.
    #[must_use]
    pub fn flags(&self) -> PropertyFlags {
        let mut flags = self.declared;
        flags.set(
            PropertyFlags::READABLE,
            self.getter.is_some() || self.member.is_some(),
        );
        flags.set(
            PropertyFlags::WRITABLE,
            self.setter.is_some() || self.member.is_some(),
        );
        flags.set(PropertyFlags::RESETTABLE, self.reset.is_some());
        flags.set(PropertyFlags::NOTIFY, self.notify.is_some());
        flags.set(PropertyFlags::BINDABLE, self.bindable.is_some());
        flags.set(PropertyFlags::REVISIONED, self.revision.is_some());
        flags.set(PropertyFlags::STD_CPP_SET, self.is_std_setter());
        flags
    }

    fn is_std_setter(&self) -> bool {
        let Some(setter) = &self.setter else {
            return false;
        };
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => {
                let expected: String = first.to_uppercase().chain(chars).collect();
                setter.spelling.strip_prefix("set") == Some(expected.as_str())
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        count: i32,
    }

    #[test]
    fn default_flags() {
        let flags = PropertyDescriptor::new::<i32>("count").flags();
        assert_eq!(
            flags,
            PropertyFlags::DESIGNABLE | PropertyFlags::SCRIPTABLE | PropertyFlags::STORED
        );
    }

    #[test]
    fn member_is_readable_and_writable() {
        let property = PropertyDescriptor::new::<i32>("count").member(
            "m_count",
            |i: &Item| &i.count,
            |i: &mut Item| &mut i.count,
        );
        assert!(property.is_accessible());
        let flags = property.flags();
        assert!(flags.contains(PropertyFlags::READABLE | PropertyFlags::WRITABLE));
        assert!(!flags.contains(PropertyFlags::STD_CPP_SET));
    }

    #[test]
    fn read_only_with_reset() {
        let property = PropertyDescriptor::new::<i32>("count")
            .getter("count", |i: &Item| i.count)
            .reset("clear", |i: &mut Item| i.count = 0)
            .constant()
            .designable(false);
        let flags = property.flags();
        assert!(flags.contains(PropertyFlags::READABLE | PropertyFlags::RESETTABLE));
        assert!(flags.contains(PropertyFlags::CONSTANT));
        assert!(!flags.contains(PropertyFlags::WRITABLE));
        assert!(!flags.contains(PropertyFlags::DESIGNABLE));
    }

    #[test]
    fn std_setter_detection() {
        let std = PropertyDescriptor::new::<i32>("count")
            .setter("setCount", |i: &mut Item, v: i32| i.count = v);
        assert!(std.flags().contains(PropertyFlags::STD_CPP_SET));

        let custom = PropertyDescriptor::new::<i32>("count")
            .setter("assign", |i: &mut Item, v: i32| i.count = v);
        assert!(!custom.flags().contains(PropertyFlags::STD_CPP_SET));
    }

    #[test]
    fn notify_parse() {
        let local = NotifyRef::parse("countChanged");
        assert_eq!(local.owner, None);
        assert_eq!(local.signal, "countChanged");

        let qualified = NotifyRef::parse("&Base::changed");
        assert_eq!(qualified.owner.as_deref(), Some("Base"));
        assert_eq!(qualified.signal, "changed");
        assert_eq!(qualified.spelling, "&Base::changed");
    }
}
