use thiserror::Error;

use crate::registry::Category;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! layout_error {
    ($msg:expr) => {
        crate::Error::LayoutMismatch {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::LayoutMismatch {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant surfaces while a class is being registered or its descriptor is being built,
/// with the exception of [`Error::WrongAccessorShape`] and [`Error::IndexOutOfRange`], which are
/// reported by the dispatch glue at the call site that exercised the mismatching member.
///
/// # Error Categories
///
/// ## Declaration Errors
/// - [`Error::UnregisteredType`] - A parameter, return or property type has no built-in id and
///   no external registration
/// - [`Error::MalformedProperty`] - A property has neither getter, setter nor member
/// - [`Error::NotifySignalNotFound`] - A property's notify reference matches no signal
/// - [`Error::Malformed`] - Any other structurally invalid declaration
/// - [`Error::DuplicateClass`] / [`Error::ClassNotFound`] - Class registry misuse
///
/// ## Build Errors
/// - [`Error::InvalidConfig`] - Layout configuration with unsupported record sizes
/// - [`Error::LayoutMismatch`] - Measuring and emitting pass disagree (internal defect)
/// - [`Error::RecursionLimit`] - Base-class chain too deep or cyclic
///
/// ## Dispatch Errors
/// - [`Error::WrongAccessorShape`] - Argument or object slot of the wrong type
/// - [`Error::IndexOutOfRange`] - Member index beyond the category size
///
/// # Examples
///
/// ```rust
/// use metaforge::{prelude::*, Error};
///
/// struct Widget;
///
/// let registry = Registry::new();
/// let class = registry.add_class(ClassDef::new::<Widget>("Widget")).unwrap();
///
/// match registry.register(class, PropertyDescriptor::new::<i32>("width")) {
///     Err(Error::MalformedProperty(name)) => assert_eq!(name, "width"),
///     other => panic!("unexpected result: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A type used by a member cannot be expressed in the descriptor.
    ///
    /// Raised when a return, argument or property type is neither a built-in type nor registered
    /// through [`crate::Registry::register_type`] / [`crate::Registry::declare_type`], and no
    /// literal type spelling was supplied at the declaration site.
    #[error("Type `{type_name}` used by `{member}` is not registered")]
    UnregisteredType {
        /// Rust name of the offending type
        type_name: String,
        /// The member that referenced it
        member: String,
    },

    /// A property was declared without any way to access it.
    ///
    /// The associated value is the property name.
    #[error("Property `{0}` has neither getter, setter nor member")]
    MalformedProperty(String),

    /// The notify reference of a property matches no signal in the reachable hierarchy.
    #[error("Notify signal `{signal}` of property `{property}` not found in `{class}`")]
    NotifySignalNotFound {
        /// Property that declared the notify reference
        property: String,
        /// Name of the signal that was looked up
        signal: String,
        /// Class the search started at
        class: String,
    },

    /// An accessor, invoker or factory was exercised with slots of an incompatible type.
    ///
    /// This is detected lazily, only when the mismatching operation is actually performed.
    #[error("Wrong accessor shape for `{member}`: expected `{expected}`")]
    WrongAccessorShape {
        /// Member whose callable rejected its inputs
        member: String,
        /// Rust type the callable expected
        expected: &'static str,
    },

    /// A member index was out of range for its category.
    #[error("Index {index} out of range for {category} (count {count})")]
    IndexOutOfRange {
        /// Category that was indexed
        category: Category,
        /// Requested index
        index: usize,
        /// Number of members in the category
        count: usize,
    },

    /// The measuring and emitting passes disagreed about the descriptor layout.
    ///
    /// Both passes are driven by the same traversal, so this indicates an internal defect rather
    /// than a user error.
    #[error("Layout mismatch - {file}:{line}: {message}")]
    LayoutMismatch {
        /// The message to be printed for the LayoutMismatch error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A declaration is structurally invalid.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The layout configuration requests record shapes no host revision uses.
    #[error("Invalid layout configuration - {0}")]
    InvalidConfig(String),

    /// No class with this name or id is known to the registry.
    #[error("Class `{0}` is not registered")]
    ClassNotFound(String),

    /// A class with this name was already registered.
    #[error("Class `{0}` is already registered")]
    DuplicateClass(String),

    /// Recursion limit reached.
    ///
    /// Walking the base-class chain is bounded to guard against cyclic declarations. The
    /// associated value shows the limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// Failure while (de)serialising a configuration or companion descriptor.
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),
}
