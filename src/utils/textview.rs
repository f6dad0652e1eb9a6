//! Zero-copy views over declaration text.
//!
//! Declarations frequently carry their information as literal text: a parameter list spelled
//! `"int count, const QString &name"`, or the stringified enumerator list of an enum
//! (`"Color::Red, Color::Green"`). [`TextView`] is a borrowed `(begin, end)` window over such text
//! and the splitting helpers walk it without allocating.
//!
//! # Key Components
//!
//! - [`TextView`] - Borrowed range over immutable text
//! - [`split_arguments`] - Split a comma-joined argument list, honouring nested brackets
//! - [`split_enumerators`] - Split an enumerator list, dropping any scope qualification
//! - [`argument_name`] - Extract the trailing identifier of a single parameter declaration

use std::fmt;

/// A view over `text[begin..end]` that never owns the underlying memory.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextView<'a> {
    text: &'a str,
    begin: usize,
    end: usize,
}

impl<'a> TextView<'a> {
    /// Create a view spanning the whole of `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        TextView {
            text,
            begin: 0,
            end: text.len(),
        }
    }

    /// Create a view over `text[begin..end]`, clamped to the text and to character boundaries.
    #[must_use]
    pub fn range(text: &'a str, begin: usize, end: usize) -> Self {
        let mut end = end.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut begin = begin.min(end);
        while !text.is_char_boundary(begin) {
            begin -= 1;
        }

        TextView { text, begin, end }
    }

    /// Offset of the first byte of the view within the underlying text.
    #[must_use]
    pub fn begin(&self) -> usize {
        self.begin
    }

    /// Offset one past the last byte of the view within the underlying text.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Length of the view in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Returns `true` if the view covers no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// The viewed text.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        &self.text[self.begin..self.end]
    }

    /// Narrow the view by dropping leading and trailing whitespace.
    #[must_use]
    pub fn trim(&self) -> TextView<'a> {
        let s = self.as_str();
        let leading = s.len() - s.trim_start().len();
        let trailing = s.len() - s.trim_end().len();
        TextView {
            text: self.text,
            begin: self.begin + leading,
            end: (self.end - trailing).max(self.begin + leading),
        }
    }

    /// A sub-view relative to this view.
    #[must_use]
    pub fn slice(&self, begin: usize, end: usize) -> TextView<'a> {
        TextView::range(self.text, self.begin + begin, self.begin + end.min(self.len()))
    }
}

impl fmt::Debug for TextView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextView({:?} @ {}..{})", self.as_str(), self.begin, self.end)
    }
}

impl fmt::Display for TextView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'a> From<&'a str> for TextView<'a> {
    fn from(text: &'a str) -> Self {
        TextView::new(text)
    }
}

/// Iterator over the top-level, comma-separated items of a [`TextView`].
///
/// Commas nested inside `<>`, `()`, `[]` or `{}` do not split. Items are trimmed; an empty input
/// yields no items, but an empty item between two commas is yielded as an empty view.
pub struct SplitArguments<'a> {
    view: TextView<'a>,
    cursor: usize,
    done: bool,
}

impl<'a> Iterator for SplitArguments<'a> {
    type Item = TextView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let bytes = self.view.as_str().as_bytes();
        let start = self.cursor;
        let mut depth = 0usize;
        let mut pos = start;

        while pos < bytes.len() {
            match bytes[pos] {
                b'<' | b'(' | b'[' | b'{' => depth += 1,
                b'>' | b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => break,
                _ => {}
            }
            pos += 1;
        }

        if pos >= bytes.len() {
            self.done = true;
        } else {
            self.cursor = pos + 1;
        }

        Some(self.view.slice(start, pos).trim())
    }
}

/// Split a comma-joined argument list such as `"int a, QMap<int, bool> b"`.
///
/// # Examples
///
/// ```rust
/// use metaforge::utils::textview::split_arguments;
///
/// let items: Vec<&str> = split_arguments("int a, QMap<int, bool> b".into())
///     .map(|v| v.as_str())
///     .collect();
/// assert_eq!(items, ["int a", "QMap<int, bool> b"]);
/// ```
#[must_use]
pub fn split_arguments(view: TextView<'_>) -> SplitArguments<'_> {
    let view = view.trim();
    SplitArguments {
        view,
        cursor: 0,
        done: view.is_empty(),
    }
}

/// Split an enumerator list, stripping any `Scope::` qualification from each entry.
///
/// Initialisers (`Red = 1`) are dropped as well, leaving only the enumerator identifier.
///
/// # Examples
///
/// ```rust
/// use metaforge::utils::textview::split_enumerators;
///
/// let items: Vec<&str> = split_enumerators("Color::Red, Color::Green,Blue".into())
///     .map(|v| v.as_str())
///     .collect();
/// assert_eq!(items, ["Red", "Green", "Blue"]);
/// ```
pub fn split_enumerators(view: TextView<'_>) -> impl Iterator<Item = TextView<'_>> {
    split_arguments(view)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let s = item.as_str();
            let end = s.find('=').unwrap_or(s.len());
            let start = s[..end].rfind("::").map_or(0, |p| p + 2);
            item.slice(start, end).trim()
        })
}

/// Words that only ever belong to a type spelling.
const TYPE_KEYWORDS: &[&str] = &[
    "void", "bool", "char", "short", "int", "long", "float", "double", "signed", "unsigned",
    "const", "volatile",
];

/// Words that qualify the type following them.
const TYPE_QUALIFIERS: &[&str] = &[
    "const", "volatile", "struct", "class", "enum", "union", "typename",
];

/// Extract the parameter name of a single declaration such as `"const QString &name"`.
///
/// Returns an empty view if the declaration consists of a type only (`"int"`, `"QString &"`,
/// `"unsigned char"`, `"const QString"`). A declaration made of one identifier is treated as
/// type-only, mirroring unnamed parameters.
#[must_use]
pub fn argument_name(decl: TextView<'_>) -> TextView<'_> {
    let decl = decl.trim();
    let s = decl.as_str();
    let s_no_default = &s[..s.find('=').unwrap_or(s.len())];
    let body = s_no_default.trim_end();

    let ident_start = body
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map_or(body.len(), |(i, _)| i);

    let ident = &body[ident_start..];
    let prefix = body[..ident_start].trim_end();
    let qualifiers_only = prefix
        .split_whitespace()
        .all(|word| TYPE_QUALIFIERS.contains(&word));
    if prefix.is_empty()
        || prefix.ends_with("::")
        || qualifiers_only
        || TYPE_KEYWORDS.contains(&ident)
    {
        return decl.slice(0, 0);
    }

    decl.slice(ident_start, body.len())
}
