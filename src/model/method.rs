use bitflags::bitflags;
use strum::{Display, EnumIter};

use crate::{
    model::callable::{IntoInvoker, Invoker},
    utils::textview::{argument_name, split_arguments, TextView},
};

/// Access level of a reflected member, with the host runtime's flag bits as discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[repr(u32)]
pub enum Access {
    /// Visible only inside the class
    Private = 0x00,
    /// Visible to the class and derived classes
    Protected = 0x01,
    /// Visible everywhere
    Public = 0x02,
}

impl Access {
    /// The flag bits of this access level.
    #[must_use]
    pub fn bits(self) -> u32 {
        self as u32
    }
}

/// What kind of callable a method descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[repr(u32)]
pub enum MethodKind {
    /// Plain invokable method
    Method = 0x00,
    /// Signal
    Signal = 0x04,
    /// Slot
    Slot = 0x08,
    /// Constructor
    Constructor = 0x0c,
}

impl MethodKind {
    /// The flag bits of this kind.
    #[must_use]
    pub fn bits(self) -> u32 {
        self as u32
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Flag word of a method record.
    ///
    /// Access and kind occupy the low nibble (see [`Access`] and [`MethodKind`]); the remaining
    /// bits are per-method attributes.
    pub struct MethodFlags: u32 {
        /// Protected access
        const ACCESS_PROTECTED = 0x01;
        /// Public access
        const ACCESS_PUBLIC = 0x02;
        /// Mask over the access bits
        const ACCESS_MASK = 0x03;
        /// Method is a signal
        const METHOD_SIGNAL = 0x04;
        /// Method is a slot
        const METHOD_SLOT = 0x08;
        /// Mask over the kind bits
        const METHOD_TYPE_MASK = 0x0c;
        /// Kept for compatibility with older signatures
        const COMPATIBILITY = 0x10;
        /// Clone produced for a default argument
        const CLONED = 0x20;
        /// Exposed to scripting
        const SCRIPTABLE = 0x40;
        /// Carries a revision number
        const REVISIONED = 0x80;
        /// Callable on a const receiver
        const CONST = 0x100;
    }
}

/// Descriptor of a signal, slot or plain invokable method.
///
/// Built by chained calls; only the name and callable are required.
///
/// ```rust
/// use metaforge::prelude::*;
///
/// struct Player { volume: i32 }
///
/// let method = MethodDescriptor::new("setVolume", |p: &mut Player, v: i32| p.volume = v)
///     .slot()
///     .public()
///     .params("int volume");
///
/// assert_eq!(method.kind(), MethodKind::Slot);
/// assert_eq!(method.arity(), 1);
/// assert_eq!(method.param_name(0), "volume");
/// ```
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    name: String,
    invoker: Invoker,
    kind: MethodKind,
    access: Option<Access>,
    section: Access,
    attributes: MethodFlags,
    revision: Option<u32>,
    param_types: Vec<String>,
    param_names: Vec<String>,
}

impl MethodDescriptor {
    /// Describe a method named `name` calling `f`.
    ///
    /// The descriptor starts out as a plain method with no explicit access, declared in a
    /// private section.
    pub fn new<C, M>(name: impl Into<String>, f: impl IntoInvoker<C, M>) -> Self {
        MethodDescriptor {
            name: name.into(),
            invoker: f.into_invoker(),
            kind: MethodKind::Method,
            access: None,
            section: Access::Private,
            attributes: MethodFlags::empty(),
            revision: None,
            param_types: Vec::new(),
            param_names: Vec::new(),
        }
    }

    /// Mark as signal.
    #[must_use]
    pub fn signal(mut self) -> Self {
        self.kind = MethodKind::Signal;
        self
    }

    /// Mark as slot.
    #[must_use]
    pub fn slot(mut self) -> Self {
        self.kind = MethodKind::Slot;
        self
    }

    /// Mark as plain invokable method (the default).
    #[must_use]
    pub fn invokable(mut self) -> Self {
        self.kind = MethodKind::Method;
        self
    }

    /// Set an explicit access level, bypassing auto-detection.
    #[must_use]
    pub fn access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    /// Explicitly public.
    #[must_use]
    pub fn public(self) -> Self {
        self.access(Access::Public)
    }

    /// Explicitly protected.
    #[must_use]
    pub fn protected(self) -> Self {
        self.access(Access::Protected)
    }

    /// Explicitly private.
    #[must_use]
    pub fn private(self) -> Self {
        self.access(Access::Private)
    }

    /// Record the access section the method was declared in.
    #[must_use]
    pub fn section(mut self, section: Access) -> Self {
        self.section = section;
        self
    }

    /// Callable on a const receiver.
    #[must_use]
    pub fn constant(mut self) -> Self {
        self.attributes |= MethodFlags::CONST;
        self
    }

    /// Exposed to scripting.
    #[must_use]
    pub fn scriptable(mut self) -> Self {
        self.attributes |= MethodFlags::SCRIPTABLE;
        self
    }

    /// Kept for compatibility.
    #[must_use]
    pub fn compat(mut self) -> Self {
        self.attributes |= MethodFlags::COMPATIBILITY;
        self
    }

    /// Clone produced for a default argument.
    #[must_use]
    pub fn cloned(mut self) -> Self {
        self.attributes |= MethodFlags::CLONED;
        self
    }

    /// Attach a revision number.
    #[must_use]
    pub fn revision(mut self, revision: u32) -> Self {
        self.revision = Some(revision);
        self.attributes |= MethodFlags::REVISIONED;
        self
    }

    /// Spell the leading parameter types. Missing entries fall back to the static types.
    #[must_use]
    pub fn param_types(mut self, types: &[&str]) -> Self {
        self.param_types = types.iter().map(ToString::to_string).collect();
        self
    }

    /// Name the leading parameters. Missing entries use the empty placeholder.
    #[must_use]
    pub fn param_names(mut self, names: &[&str]) -> Self {
        self.param_names = names.iter().map(ToString::to_string).collect();
        self
    }

    /// Take parameter types and names from a declaration such as `"int count, QString label"`.
    #[must_use]
    pub fn params(mut self, declaration: &str) -> Self {
        let mut types = Vec::new();
        let mut names = Vec::new();
        for item in split_arguments(TextView::new(declaration)) {
            let name = argument_name(item);
            let ty = if name.is_empty() {
                item
            } else {
                item.slice(0, name.begin() - item.begin()).trim()
            };
            types.push(ty.as_str().to_string());
            names.push(name.as_str().to_string());
        }
        self.param_types = types;
        self.param_names = names;
        self
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Callable.
    #[must_use]
    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Kind of method.
    #[must_use]
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// Explicit access, if any.
    #[must_use]
    pub fn explicit_access(&self) -> Option<Access> {
        self.access
    }

    /// Section the method was declared in.
    #[must_use]
    pub fn declared_section(&self) -> Access {
        self.section
    }

    /// Attribute bits (everything above access and kind).
    #[must_use]
    pub fn attributes(&self) -> MethodFlags {
        self.attributes
    }

    /// Revision number, if revisioned.
    #[must_use]
    pub fn revision_number(&self) -> Option<u32> {
        self.revision
    }

    /// Number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.invoker.arity()
    }

    /// Spelled type of parameter `index`, if one was given.
    #[must_use]
    pub fn param_type(&self, index: usize) -> Option<&str> {
        self.param_types.get(index).map(String::as_str)
    }

    /// Name of parameter `index`, or the empty placeholder.
    #[must_use]
    pub fn param_name(&self, index: usize) -> &str {
        self.param_names.get(index).map_or("", String::as_str)
    }

    /// Full flag word for the given resolved access.
    #[must_use]
    pub fn flags(&self, access: Access) -> u32 {
        access.bits() | self.kind.bits() | self.attributes.bits()
    }

    pub(crate) fn with_kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Target;

    #[test]
    fn defaults() {
        let method = MethodDescriptor::new("run", |_: &mut Target| {});
        assert_eq!(method.kind(), MethodKind::Method);
        assert_eq!(method.explicit_access(), None);
        assert_eq!(method.declared_section(), Access::Private);
        assert_eq!(method.arity(), 0);
        assert_eq!(method.param_name(0), "");
    }

    #[test]
    fn flag_word() {
        let method = MethodDescriptor::new("changed", |_: &mut Target| {})
            .signal()
            .revision(2)
            .constant();
        let flags = MethodFlags::from_bits_truncate(method.flags(Access::Public));
        assert!(flags.contains(MethodFlags::ACCESS_PUBLIC));
        assert!(flags.contains(MethodFlags::METHOD_SIGNAL));
        assert!(flags.contains(MethodFlags::REVISIONED | MethodFlags::CONST));
        assert_eq!(method.revision_number(), Some(2));
        assert_eq!(method.flags(Access::Private) & MethodFlags::ACCESS_MASK.bits(), 0);
    }

    #[test]
    fn params_from_declaration() {
        let method = MethodDescriptor::new("move", |_: &mut Target, _: i32, _: String| {})
            .params("int dx, const QString &label");
        assert_eq!(method.param_type(0), Some("int"));
        assert_eq!(method.param_type(1), Some("const QString &"));
        assert_eq!(method.param_name(0), "dx");
        assert_eq!(method.param_name(1), "label");
    }

    #[test]
    fn params_without_names() {
        let method =
            MethodDescriptor::new("move", |_: &mut Target, _: i32| {}).params("int");
        assert_eq!(method.param_type(0), Some("int"));
        assert_eq!(method.param_name(0), "");
    }

    #[test]
    fn params_with_multi_word_types() {
        let method = MethodDescriptor::new(
            "store",
            |_: &mut Target, _: i64, _: u8, _: String, _: u32| {},
        )
        .params("long long, unsigned char, const QString, unsigned int x");
        assert_eq!(method.param_type(0), Some("long long"));
        assert_eq!(method.param_type(1), Some("unsigned char"));
        assert_eq!(method.param_type(2), Some("const QString"));
        assert_eq!(method.param_type(3), Some("unsigned int"));
        assert_eq!(method.param_name(0), "");
        assert_eq!(method.param_name(1), "");
        assert_eq!(method.param_name(2), "");
        assert_eq!(method.param_name(3), "x");
    }

    #[test]
    fn partial_names() {
        let method = MethodDescriptor::new("pair", |_: &mut Target, _: i32, _: i32| {})
            .param_names(&["first"]);
        assert_eq!(method.param_name(0), "first");
        assert_eq!(method.param_name(1), "");
        assert_eq!(method.param_type(1), None);
    }
}
