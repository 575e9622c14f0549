//! [JSON Pointer](https://www.rfc-editor.org/rfc/rfc6901) addressing into [`Value`] graphs.

use crate::error::PointerError;
use crate::uri::Uri;
use crate::value::{Value, ValueKind};
use std::fmt;
use std::str::FromStr;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A structural address into a [`Value`]: an ordered sequence of string atoms.
///
/// ```
/// use oxjsonschema::Pointer;
///
/// let pointer = Pointer::new(["foo", "b~a/r"]);
/// assert_eq!(pointer.to_string(), "/foo/b~0a~1r");
/// assert_eq!("/foo/b~0a~1r".parse::<Pointer>()?, pointer);
/// # Result::<_, oxjsonschema::PointerError>::Ok(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Pointer {
    atoms: Vec<String>,
}

impl Pointer {
    /// The empty pointer, designating the whole document.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a pointer from unescaped atoms.
    pub fn new<A: Into<String>>(atoms: impl IntoIterator<Item = A>) -> Self {
        Self {
            atoms: atoms.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses the string form of a pointer (`""` or `/atom/atom...`).
    pub fn parse(pointer: &str) -> Result<Self, PointerError> {
        if pointer.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = pointer.strip_prefix('/') else {
            return Err(PointerError::invalid_pointer(
                pointer,
                "a non-empty pointer must start with '/'",
            ));
        };
        let atoms = rest
            .split('/')
            .map(|atom| unescape_atom(pointer, atom))
            .collect::<Result<_, _>>()?;
        Ok(Self { atoms })
    }

    /// Parses the fragment of a URI as a pointer.
    ///
    /// A URI without fragment designates the whole document.
    pub fn from_uri_fragment(uri: &Uri) -> Result<Self, PointerError> {
        Self::from_fragment(uri.fragment().unwrap_or_default())
    }

    /// Parses a percent-encoded URI fragment (without the leading `#`) as a pointer.
    pub fn from_fragment(fragment: &str) -> Result<Self, PointerError> {
        Self::parse(&percent_decode(fragment)?)
    }

    /// The unescaped atoms of this pointer.
    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    /// The last atom, if any.
    pub fn last(&self) -> Option<&str> {
        self.atoms.last().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// The pointer to the container of the designated value.
    pub fn parent(&self) -> Result<Self, PointerError> {
        let Some((_, parent)) = self.atoms.split_last() else {
            return Err(PointerError::NoParent);
        };
        Ok(Self {
            atoms: parent.to_vec(),
        })
    }

    /// The pointer to the member `atom` of the designated value.
    #[must_use]
    pub fn child(&self, atom: impl Into<String>) -> Self {
        let mut atoms = self.atoms.clone();
        atoms.push(atom.into());
        Self { atoms }
    }

    /// The pointer to the element `index` of the designated array.
    #[must_use]
    pub fn child_index(&self, index: usize) -> Self {
        self.child(index.to_string())
    }

    /// Follows this pointer from `root`.
    ///
    /// Array atoms must be canonical non-negative indices; the `-` token designates
    /// the position past the end and so never resolves to a value.
    pub fn resolve(&self, root: &Value) -> Result<Value, PointerError> {
        let mut current = root.clone();
        for (depth, atom) in self.atoms.iter().enumerate() {
            let next = match current.kind() {
                ValueKind::Array => {
                    let index = parse_index(atom).ok_or_else(|| {
                        self.undefined(depth, format!("'{atom}' is not an array index"))
                    })?;
                    current.at(index).ok_or_else(|| {
                        let len = current.len();
                        self.undefined(depth, format!("index {index} is out of bounds ({len} elements)"))
                    })?
                }
                ValueKind::Object | ValueKind::Reference => current
                    .get(atom)
                    .ok_or_else(|| self.undefined(depth, format!("no member named '{atom}'")))?,
                kind => {
                    return Err(self.undefined(depth, format!("cannot step into a {kind} value")));
                }
            };
            current = next;
        }
        Ok(current)
    }

    fn undefined(&self, depth: usize, message: String) -> PointerError {
        PointerError::undefined_value(self.to_string(), format!("at atom {depth}: {message}"))
    }

    /// Renders this pointer as a percent-encoded URI fragment (without the leading `#`).
    pub fn to_uri_fragment(&self) -> String {
        let mut fragment = String::new();
        for byte in self.to_string().bytes() {
            if is_fragment_byte(byte) {
                fragment.push(char::from(byte));
            } else {
                fragment.push('%');
                fragment.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
                fragment.push(char::from(HEX_DIGITS[usize::from(byte & 0xF)]));
            }
        }
        fragment
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for atom in &self.atoms {
            f.write_str("/")?;
            for c in atom.chars() {
                match c {
                    '~' => f.write_str("~0")?,
                    '/' => f.write_str("~1")?,
                    c => write!(f, "{c}")?,
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Pointer {
    type Err = PointerError;

    fn from_str(pointer: &str) -> Result<Self, PointerError> {
        Self::parse(pointer)
    }
}

impl<A: Into<String>> FromIterator<A> for Pointer {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self::new(iter)
    }
}

fn unescape_atom(pointer: &str, atom: &str) -> Result<String, PointerError> {
    let mut chars = atom.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0' | '1')) {
            return Err(PointerError::invalid_pointer(
                pointer,
                "'~' must be followed by '0' or '1'",
            ));
        }
    }
    // '~1' first so that '~01' becomes '~1' and not '/'
    Ok(atom.replace("~1", "/").replace("~0", "~"))
}

fn parse_index(atom: &str) -> Option<usize> {
    if atom.is_empty() || !atom.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if atom.len() > 1 && atom.starts_with('0') {
        return None;
    }
    atom.parse().ok()
}

fn percent_decode(input: &str) -> Result<String, PointerError> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| {
                    PointerError::invalid_pointer(input, "invalid percent-encoded sequence")
                })?;
            decoded.push(hex);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).map_err(|_| {
        PointerError::invalid_pointer(input, "percent-decoded fragment is not valid UTF-8")
    })
}

fn is_fragment_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'-' | b'.'
                | b'_'
                | b'~'
                | b'!'
                | b'$'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'*'
                | b'+'
                | b','
                | b';'
                | b'='
                | b':'
                | b'@'
                | b'/'
                | b'?'
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rfc6901_document() -> Value {
        Value::from(json!({
            "foo": ["bar", "baz"],
            "": 0,
            "a/b": 1,
            "c%d": 2,
            "e^f": 3,
            "g|h": 4,
            "i\\j": 5,
            "k\"l": 6,
            " ": 7,
            "m~n": 8
        }))
    }

    #[test]
    fn test_round_trip() {
        let pointer = Pointer::new(["foo", "b~a/r", "b/a~z", "q~1ux"]);
        assert_eq!(pointer.to_string(), "/foo/b~0a~1r/b~1a~0z/q~01ux");
        assert_eq!(
            Pointer::parse("/foo/b~0a~1r/b~1a~0z/q~01ux").unwrap(),
            pointer
        );
    }

    #[test]
    fn test_empty_atoms() {
        assert_eq!(Pointer::parse("").unwrap(), Pointer::root());
        assert_eq!(Pointer::parse("/").unwrap().atoms(), [""]);
        assert_eq!(Pointer::parse("//").unwrap().atoms(), ["", ""]);
        assert_eq!(Pointer::new([""]).to_string(), "/");
    }

    #[test]
    fn test_invalid_pointers() {
        assert!(matches!(
            Pointer::parse("foo"),
            Err(PointerError::InvalidPointer { .. })
        ));
        assert!(matches!(
            Pointer::parse("/a~2"),
            Err(PointerError::InvalidPointer { .. })
        ));
        assert!(matches!(
            Pointer::parse("/a~"),
            Err(PointerError::InvalidPointer { .. })
        ));
    }

    #[test]
    fn test_rfc6901_string_representation() {
        let document = rfc6901_document();
        let resolve = |p: &str| Pointer::parse(p).unwrap().resolve(&document).unwrap();
        assert!(resolve("").ptr_eq(&document));
        assert_eq!(resolve("/foo"), Value::from(json!(["bar", "baz"])));
        assert_eq!(resolve("/foo/0"), Value::from("bar"));
        assert_eq!(resolve("/"), Value::from(0_i64));
        assert_eq!(resolve("/a~1b"), Value::from(1_i64));
        assert_eq!(resolve("/c%d"), Value::from(2_i64));
        assert_eq!(resolve("/e^f"), Value::from(3_i64));
        assert_eq!(resolve("/g|h"), Value::from(4_i64));
        assert_eq!(resolve("/i\\j"), Value::from(5_i64));
        assert_eq!(resolve("/k\"l"), Value::from(6_i64));
        assert_eq!(resolve("/ "), Value::from(7_i64));
        assert_eq!(resolve("/m~0n"), Value::from(8_i64));
    }

    #[test]
    fn test_rfc6901_fragment_representation() {
        let document = rfc6901_document();
        let resolve = |f: &str| Pointer::from_fragment(f).unwrap().resolve(&document).unwrap();
        assert!(resolve("").ptr_eq(&document));
        assert_eq!(resolve("/foo/0"), Value::from("bar"));
        assert_eq!(resolve("/"), Value::from(0_i64));
        assert_eq!(resolve("/a~1b"), Value::from(1_i64));
        assert_eq!(resolve("/c%25d"), Value::from(2_i64));
        assert_eq!(resolve("/e%5Ef"), Value::from(3_i64));
        assert_eq!(resolve("/g%7Ch"), Value::from(4_i64));
        assert_eq!(resolve("/i%5Cj"), Value::from(5_i64));
        assert_eq!(resolve("/k%22l"), Value::from(6_i64));
        assert_eq!(resolve("/%20"), Value::from(7_i64));
        assert_eq!(resolve("/m~0n"), Value::from(8_i64));
    }

    #[test]
    fn test_uri_fragment_rendering() {
        let pointer = Pointer::new(["c%d", " ", "a/b"]);
        assert_eq!(pointer.to_uri_fragment(), "/c%25d/%20/a~1b");
        assert_eq!(
            Pointer::from_fragment(&pointer.to_uri_fragment()).unwrap(),
            pointer
        );
    }

    #[test]
    fn test_undefined_values() {
        let document = rfc6901_document();
        for pointer in ["/foo/2", "/foo/-", "/foo/01", "/foo/bar", "/missing", "/a~1b/x"] {
            assert!(
                matches!(
                    Pointer::parse(pointer).unwrap().resolve(&document),
                    Err(PointerError::UndefinedValue { .. })
                ),
                "{pointer} should not resolve"
            );
        }
    }

    #[test]
    fn test_parent_and_child() {
        let pointer = Pointer::new(["a", "b"]);
        assert_eq!(pointer.parent().unwrap(), Pointer::new(["a"]));
        assert_eq!(pointer.parent().unwrap().parent().unwrap(), Pointer::root());
        assert_eq!(Pointer::root().parent(), Err(PointerError::NoParent));
        assert_eq!(Pointer::root().child("x").child_index(3).to_string(), "/x/3");
        assert_eq!(pointer.last(), Some("b"));
    }
}
