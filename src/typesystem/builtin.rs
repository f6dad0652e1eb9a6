use std::any::TypeId;

use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};

/// Types the host runtime knows by a small numeric id.
///
/// A reference to one of these is emitted as the bare id instead of a string-pool reference with
/// a type-handle slot. The discriminants are the host runtime's type ids.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter, EnumCount,
)]
#[repr(u32)]
pub enum BuiltinType {
    /// `bool`
    #[strum(to_string = "bool")]
    Bool = 1,
    /// 32-bit signed integer
    #[strum(to_string = "int", serialize = "qint32", serialize = "signed int")]
    Int = 2,
    /// 32-bit unsigned integer
    #[strum(
        to_string = "uint",
        serialize = "unsigned int",
        serialize = "unsigned",
        serialize = "quint32"
    )]
    UInt = 3,
    /// 64-bit signed integer
    #[strum(to_string = "qlonglong", serialize = "qint64", serialize = "long long")]
    LongLong = 4,
    /// 64-bit unsigned integer
    #[strum(
        to_string = "qulonglong",
        serialize = "quint64",
        serialize = "unsigned long long"
    )]
    ULongLong = 5,
    /// Double precision float
    #[strum(to_string = "double", serialize = "qreal")]
    Double = 6,
    /// UTF-16 code unit
    #[strum(to_string = "QChar")]
    QChar = 7,
    /// String keyed variant map
    #[strum(to_string = "QVariantMap")]
    QVariantMap = 8,
    /// Variant list
    #[strum(to_string = "QVariantList")]
    QVariantList = 9,
    /// Host string
    #[strum(to_string = "QString")]
    QString = 10,
    /// List of host strings
    #[strum(to_string = "QStringList")]
    QStringList = 11,
    /// Byte array
    #[strum(to_string = "QByteArray")]
    QByteArray = 12,
    /// Untyped pointer
    #[strum(to_string = "void*")]
    VoidStar = 31,
    /// C `long`
    #[strum(to_string = "long")]
    Long = 32,
    /// 16-bit signed integer
    #[strum(to_string = "short", serialize = "qint16")]
    Short = 33,
    /// C `char`
    #[strum(to_string = "char")]
    Char = 34,
    /// C `unsigned long`
    #[strum(to_string = "ulong", serialize = "unsigned long")]
    ULong = 35,
    /// 16-bit unsigned integer
    #[strum(to_string = "ushort", serialize = "unsigned short", serialize = "quint16")]
    UShort = 36,
    /// 8-bit unsigned integer
    #[strum(to_string = "uchar", serialize = "unsigned char", serialize = "quint8")]
    UChar = 37,
    /// Single precision float
    #[strum(to_string = "float")]
    Float = 38,
    /// Pointer to a host object
    #[strum(to_string = "QObject*")]
    QObjectStar = 39,
    /// 8-bit signed integer
    #[strum(to_string = "signed char", serialize = "qint8")]
    SChar = 40,
    /// Variant
    #[strum(to_string = "QVariant")]
    QVariant = 41,
    /// No value
    #[strum(to_string = "void")]
    Void = 43,
    /// Null pointer type
    #[strum(to_string = "std::nullptr_t")]
    Nullptr = 51,
}

impl BuiltinType {
    /// The host runtime's numeric id for this type.
    #[must_use]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Look up a built-in type by its spelled name, after normalisation.
    ///
    /// `const int &`, `int` and `qint32` all map to [`BuiltinType::Int`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        normalize_type_name(name).parse().ok()
    }

    /// Map a Rust type to the built-in type with identical representation, if any.
    #[must_use]
    pub fn for_type_id(id: TypeId) -> Option<Self> {
        BuiltinType::iter().find(|builtin| builtin.rust_type() == Some(id))
    }

    /// The Rust type that is represented by this built-in type, if there is one.
    #[must_use]
    pub fn rust_type(self) -> Option<TypeId> {
        let id = match self {
            BuiltinType::Bool => TypeId::of::<bool>(),
            BuiltinType::Int => TypeId::of::<i32>(),
            BuiltinType::UInt => TypeId::of::<u32>(),
            BuiltinType::LongLong => TypeId::of::<i64>(),
            BuiltinType::ULongLong => TypeId::of::<u64>(),
            BuiltinType::Double => TypeId::of::<f64>(),
            BuiltinType::QString => TypeId::of::<String>(),
            BuiltinType::QStringList => TypeId::of::<Vec<String>>(),
            BuiltinType::QByteArray => TypeId::of::<Vec<u8>>(),
            BuiltinType::Short => TypeId::of::<i16>(),
            BuiltinType::UShort => TypeId::of::<u16>(),
            BuiltinType::UChar => TypeId::of::<u8>(),
            BuiltinType::Float => TypeId::of::<f32>(),
            BuiltinType::SChar => TypeId::of::<i8>(),
            BuiltinType::Void => TypeId::of::<()>(),
            _ => return None,
        };
        Some(id)
    }
}

/// Normalise a spelled type name the way the host runtime compares signatures.
///
/// Drops a leading `const` on by-value and by-reference parameters (the reference goes with
/// it), collapses whitespace, and binds `*` and `&` to the preceding token.
#[must_use]
pub fn normalize_type_name(name: &str) -> String {
    let mut collapsed = String::with_capacity(name.len());
    for word in name.split_whitespace() {
        let glue = word.starts_with(['*', '&', ',', '>', ':']) || collapsed.ends_with(['<', ':']);
        if !collapsed.is_empty() && !glue {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }

    if let Some(inner) = collapsed.strip_prefix("const ") {
        if let Some(value) = inner.strip_suffix('&') {
            if !value.ends_with('&') {
                return value.trim_end().to_string();
            }
        }
        if !inner.contains(['*', '&']) {
            return inner.to_string();
        }
    }

    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_host() {
        assert_eq!(BuiltinType::Bool.id(), 1);
        assert_eq!(BuiltinType::Int.id(), 2);
        assert_eq!(BuiltinType::QString.id(), 10);
        assert_eq!(BuiltinType::Void.id(), 43);
    }

    #[test]
    fn names_round_trip() {
        for builtin in BuiltinType::iter() {
            assert_eq!(BuiltinType::from_name(&builtin.to_string()), Some(builtin));
        }
    }

    #[test]
    fn aliases_and_normalisation() {
        assert_eq!(BuiltinType::from_name("qint64"), Some(BuiltinType::LongLong));
        assert_eq!(BuiltinType::from_name("unsigned   int"), Some(BuiltinType::UInt));
        assert_eq!(BuiltinType::from_name("const QString &"), Some(BuiltinType::QString));
        assert_eq!(BuiltinType::from_name("QObject *"), Some(BuiltinType::QObjectStar));
        assert_eq!(BuiltinType::from_name("const QString"), Some(BuiltinType::QString));
        assert_eq!(BuiltinType::from_name("unsigned char"), Some(BuiltinType::UChar));
        assert_eq!(BuiltinType::from_name("long long"), Some(BuiltinType::LongLong));
        assert_eq!(BuiltinType::from_name("Point"), None);
    }

    #[test]
    fn rust_types() {
        assert_eq!(BuiltinType::for_type_id(TypeId::of::<i32>()), Some(BuiltinType::Int));
        assert_eq!(BuiltinType::for_type_id(TypeId::of::<String>()), Some(BuiltinType::QString));
        assert_eq!(BuiltinType::for_type_id(TypeId::of::<()>()), Some(BuiltinType::Void));
        assert_eq!(BuiltinType::for_type_id(TypeId::of::<char>()), None);
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_type_name(" QMap< int , bool > "), "QMap<int, bool>");
        assert_eq!(normalize_type_name("const Point &"), "Point");
        assert_eq!(normalize_type_name("Point &"), "Point&");
        assert_eq!(normalize_type_name("char *"), "char*");
        assert_eq!(normalize_type_name("const QString"), "QString");
        assert_eq!(normalize_type_name("const char *"), "const char*");
    }
}
