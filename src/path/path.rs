//! Path element and path types.

use super::parse::{escape_plain, escape_selector, parse_path};
use super::ParseError;
use std::fmt;
use std::str::FromStr;

/// PathElement represents one level of path navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// Map key, written bare.
    Plain(String),
    /// Selects the list entry whose field `key` stringifies to `value`,
    /// written `[key:value]`.
    KeyValue { key: String, value: String },
    /// Selects the list entry whose stringified form equals the value,
    /// written `[value]`.
    Value(String),
}

impl PathElement {
    /// Creates a new plain path element.
    pub fn plain(name: impl Into<String>) -> Self {
        PathElement::Plain(name.into())
    }

    /// Creates a new key/value selector element.
    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        PathElement::KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a new value selector element.
    pub fn value(value: impl Into<String>) -> Self {
        PathElement::Value(value.into())
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, PathElement::Plain(_))
    }

    pub fn is_key_value(&self) -> bool {
        matches!(self, PathElement::KeyValue { .. })
    }

    pub fn is_value(&self) -> bool {
        matches!(self, PathElement::Value(_))
    }

    /// Returns the name if this is a plain element.
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            PathElement::Plain(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Plain(name) => write!(f, "{}", escape_plain(name)),
            PathElement::KeyValue { key, value } => {
                write!(f, "[{}:{}]", key, escape_selector(value))
            }
            PathElement::Value(value) => write!(f, "[{}]", escape_selector(value)),
        }
    }
}

/// Path is an ordered sequence of path elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    /// Creates a new empty path.
    pub fn new() -> Self {
        Path {
            elements: Vec::new(),
        }
    }

    /// Creates a path from a vector of elements.
    pub fn from_elements(elements: Vec<PathElement>) -> Self {
        Path { elements }
    }

    /// Creates a path of plain elements, one per name.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().map(PathElement::plain).collect()
    }

    /// Parses a path string, see the module documentation for the grammar.
    pub fn parse(s: &str) -> Result<Path, ParseError> {
        parse_path(s)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.elements.iter()
    }

    pub fn push(&mut self, element: PathElement) {
        self.elements.push(element);
    }

    pub fn pop(&mut self) -> Option<PathElement> {
        self.elements.pop()
    }

    pub fn first(&self) -> Option<&PathElement> {
        self.elements.first()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Creates a new path with the given element appended.
    pub fn with(&self, element: PathElement) -> Self {
        let mut new_path = self.clone();
        new_path.push(element);
        new_path
    }

    /// Creates a new path with all elements of `suffix` appended.
    pub fn join(&self, suffix: &[PathElement]) -> Self {
        let mut new_path = self.clone();
        new_path.elements.extend_from_slice(suffix);
        new_path
    }

    pub fn as_slice(&self) -> &[PathElement] {
        &self.elements
    }

    /// Returns true if `prefix` matches the leading elements of this path.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.elements.starts_with(&prefix.elements)
    }
}

impl FromStr for Path {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s)
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<T: IntoIterator<Item = PathElement>>(iter: T) -> Self {
        Path {
            elements: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Path {
    type Item = PathElement;
    type IntoIter = std::vec::IntoIter<PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_element_plain() {
        let pe = PathElement::plain("foo");
        assert!(pe.is_plain());
        assert_eq!(pe.as_plain(), Some("foo"));
        assert!(!PathElement::value("v").is_plain());
    }

    #[test]
    fn test_path_operations() {
        let mut path = Path::new();
        assert!(path.is_empty());

        path.push(PathElement::plain("metadata"));
        path.push(PathElement::plain("name"));
        assert_eq!(path.len(), 2);
        assert_eq!(path.last(), Some(&PathElement::Plain("name".to_string())));

        let popped = path.pop();
        assert_eq!(popped, Some(PathElement::Plain("name".to_string())));
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_path_display() {
        let path = Path::from_elements(vec![
            PathElement::plain("spec"),
            PathElement::plain("containers"),
            PathElement::key_value("name", "proxy"),
            PathElement::plain("args"),
            PathElement::value("--log:debug"),
        ]);
        assert_eq!(
            path.to_string(),
            r"spec.containers.[name:proxy].args.[--log\:debug]"
        );
    }

    #[test]
    fn test_path_display_escapes_dotted_keys() {
        let path = Path::from_names(["metadata", "annotations", "sidecar.istio.io/inject"]);
        assert_eq!(
            path.to_string(),
            r"metadata.annotations.sidecar\.istio\.io/inject"
        );
        assert_eq!(Path::parse(&path.to_string()).unwrap(), path);
    }

    #[test]
    fn test_starts_with() {
        let path = Path::from_names(["a", "b", "c"]);
        assert!(path.starts_with(&Path::from_names(["a", "b"])));
        assert!(path.starts_with(&Path::new()));
        assert!(!path.starts_with(&Path::from_names(["b"])));
    }
}
