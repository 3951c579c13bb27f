//! Parsing of path strings into [`Path`] values.

use super::path::{Path, PathElement};
use thiserror::Error;

/// ParseError reports a malformed path element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path element {token:?} at position {position}: {reason}")]
pub struct ParseError {
    /// The offending token, as written.
    pub token: String,
    /// Index of the element within the path.
    pub position: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(token: impl Into<String>, position: usize, reason: impl Into<String>) -> Self {
        ParseError {
            token: token.into(),
            position,
            reason: reason.into(),
        }
    }
}

/// Parses a dotted path string.
///
/// The empty string is the empty path.
pub fn parse_path(s: &str) -> Result<Path, ParseError> {
    if s.is_empty() {
        return Ok(Path::new());
    }
    split_path(s)?
        .iter()
        .enumerate()
        .map(|(position, token)| parse_element(token, position))
        .collect()
}

/// Splits a path on `.` characters that are neither escaped nor inside a
/// bracketed selector.
fn split_path(s: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut escaped = false;

    for c in s.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                current.push(c);
                escaped = true;
            }
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                current.push(c);
                if depth == 0 {
                    return Err(ParseError::new(current, tokens.len(), "unmatched ']'"));
                }
                depth -= 1;
            }
            '.' if depth == 0 => tokens.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if depth > 0 {
        return Err(ParseError::new(current, tokens.len(), "unmatched '['"));
    }
    if escaped {
        return Err(ParseError::new(current, tokens.len(), "dangling escape"));
    }
    tokens.push(current);
    Ok(tokens)
}

fn parse_element(token: &str, position: usize) -> Result<PathElement, ParseError> {
    if token.is_empty() {
        return Err(ParseError::new(token, position, "empty path element"));
    }
    if let Some(inner) = bracket_inner(token) {
        return match find_unescaped_colon(inner) {
            Some(idx) => {
                let (key, value) = split_kv(token, inner, idx, position)?;
                Ok(PathElement::KeyValue { key, value })
            }
            None if inner.is_empty() => Err(ParseError::new(token, position, "empty selector")),
            None => Ok(PathElement::Value(unescape_selector(inner))),
        };
    }
    parse_plain(token, position)
}

/// Parses a plain element, unescaping `\.`. Besides `[A-Za-z0-9_-]` a plain
/// key may contain `/`, as in `sidecar\.istio\.io/inject`.
fn parse_plain(token: &str, position: usize) -> Result<PathElement, ParseError> {
    if is_plain(token) {
        return Ok(PathElement::Plain(token.to_string()));
    }
    let mut key = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('.') => key.push('.'),
                _ => {
                    return Err(ParseError::new(
                        token,
                        position,
                        "only '.' may be escaped in a plain element",
                    ))
                }
            },
            c if is_plain_char(c) || c == '/' => key.push(c),
            _ => {
                return Err(ParseError::new(
                    token,
                    position,
                    "plain elements may only contain [A-Za-z0-9_-/] and escaped dots",
                ))
            }
        }
    }
    Ok(PathElement::Plain(key))
}

fn split_kv(
    token: &str,
    inner: &str,
    colon: usize,
    position: usize,
) -> Result<(String, String), ParseError> {
    let key = &inner[..colon];
    if key.is_empty() {
        return Err(ParseError::new(token, position, "empty key"));
    }
    if !is_plain(key) {
        return Err(ParseError::new(
            token,
            position,
            "selector key may only contain [A-Za-z0-9_-]",
        ));
    }
    Ok((key.to_string(), unescape_selector(&inner[colon + 1..])))
}

/// Returns the content between the outer brackets of `[...]`.
fn bracket_inner(token: &str) -> Option<&str> {
    if token.len() >= 2 && token.starts_with('[') && token.ends_with(']') {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

/// Byte index of the first `:` not preceded by a backslash.
fn find_unescaped_colon(s: &str) -> Option<usize> {
    let mut chars = s.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, ':')) = chars.peek() {
                    chars.next();
                }
            }
            ':' => return Some(idx),
            _ => {}
        }
    }
    None
}

fn unescape_selector(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&':') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Escapes `:` so a selector value survives a parse.
pub(crate) fn escape_selector(s: &str) -> String {
    s.replace(':', "\\:")
}

/// Escapes `.` so a plain key survives a parse.
pub(crate) fn escape_plain(s: &str) -> String {
    s.replace('.', "\\.")
}

fn is_plain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Returns true if `token` is a plain element: one or more `[A-Za-z0-9_-]`.
pub fn is_plain(token: &str) -> bool {
    !token.is_empty() && token.chars().all(is_plain_char)
}

/// Returns true if `token` is a `[key:value]` selector.
pub fn is_kv(token: &str) -> bool {
    bracket_inner(token)
        .and_then(find_unescaped_colon)
        .is_some()
}

/// Returns true if `token` is a `[value]` selector.
pub fn is_value(token: &str) -> bool {
    matches!(bracket_inner(token), Some(inner) if !inner.is_empty() && find_unescaped_colon(inner).is_none())
}

/// Splits a `[key:value]` token into its key and unescaped value.
pub fn path_kv(token: &str) -> Result<(String, String), ParseError> {
    let inner = bracket_inner(token)
        .ok_or_else(|| ParseError::new(token, 0, "expected a bracketed [key:value] selector"))?;
    let colon = find_unescaped_colon(inner)
        .ok_or_else(|| ParseError::new(token, 0, "selector has no key"))?;
    split_kv(token, inner, colon, 0)
}

/// Returns the unescaped value of a `[value]` token.
pub fn path_v(token: &str) -> Result<String, ParseError> {
    if !is_value(token) {
        return Err(ParseError::new(token, 0, "expected a bracketed [value] selector"));
    }
    bracket_inner(token)
        .map(unescape_selector)
        .ok_or_else(|| ParseError::new(token, 0, "expected a bracketed [value] selector"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plain_path() {
        let path = parse_path("spec.template.metadata").unwrap();
        assert_eq!(path, Path::from_names(["spec", "template", "metadata"]));
    }

    #[test]
    fn test_parse_selectors() {
        let path = parse_path("a.b.[name:n2].list.[v2]").unwrap();
        assert_eq!(
            path,
            Path::from_elements(vec![
                PathElement::plain("a"),
                PathElement::plain("b"),
                PathElement::key_value("name", "n2"),
                PathElement::plain("list"),
                PathElement::value("v2"),
            ])
        );
    }

    #[test]
    fn test_dots_inside_brackets_do_not_split() {
        let path = parse_path("spec.env.[value:a.b.c]").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.last(), Some(&PathElement::key_value("value", "a.b.c")));
    }

    #[test]
    fn test_escaped_colon() {
        let path = parse_path(r"args.[--addr\:15000]").unwrap();
        assert_eq!(path.last(), Some(&PathElement::value("--addr:15000")));

        let path = parse_path(r"ports.[name:http\:alt]").unwrap();
        assert_eq!(path.last(), Some(&PathElement::key_value("name", "http:alt")));
    }

    #[test]
    fn test_escaped_dot_in_plain_element() {
        let path = parse_path(r"metadata.annotations.sidecar\.istio\.io/inject").unwrap();
        assert_eq!(
            path,
            Path::from_names(["metadata", "annotations", "sidecar.istio.io/inject"])
        );

        let path = parse_path(r"metadata.labels.app\.kubernetes\.io/name").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(
            path.last(),
            Some(&PathElement::plain("app.kubernetes.io/name"))
        );

        let err = parse_path(r"a.b\:c").unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.reason, "only '.' may be escaped in a plain element");
    }

    #[test]
    fn test_round_trip() {
        for s in [
            "a",
            "a.b.c",
            "a.[name:n1].value",
            "a.b.[name:n2].list.[v3_regex]",
            r"x.[k:v\:w]",
            r"x.[v\:w]",
            "spec.[name:a.b]",
            r"metadata.annotations.sidecar\.istio\.io/inject",
        ] {
            let path = parse_path(s).unwrap();
            assert_eq!(path.to_string(), s);
            assert_eq!(parse_path(&path.to_string()).unwrap(), path);
        }
    }

    #[test]
    fn test_classification() {
        assert!(is_plain("istio-pilot_1"));
        assert!(!is_plain("a.b"));
        assert!(!is_plain(""));
        assert!(is_kv("[name:foo]"));
        assert!(!is_kv(r"[name\:foo]"));
        assert!(is_value(r"[name\:foo]"));
        assert!(is_value("[foo]"));
        assert!(!is_value("[]"));
        assert!(!is_value("foo"));
    }

    #[test]
    fn test_path_kv_and_v() {
        assert_eq!(
            path_kv(r"[name:a\:b]").unwrap(),
            ("name".to_string(), "a:b".to_string())
        );
        assert!(path_kv("[value]").is_err());
        assert!(path_kv("name:foo").is_err());
        assert_eq!(path_v("[v2]").unwrap(), "v2");
        assert!(path_v("[k:v]").is_err());
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_path("a.[:v]").unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.token, "[:v]");
        assert_eq!(err.reason, "empty key");

        let err = parse_path("a.[name:foo").unwrap_err();
        assert_eq!(err.reason, "unmatched '['");

        let err = parse_path("a.b]").unwrap_err();
        assert_eq!(err.position, 1);

        let err = parse_path("a..b").unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.reason, "empty path element");

        assert!(parse_path("a.b c").is_err());
    }

    #[test]
    fn test_empty_path() {
        assert!(parse_path("").unwrap().is_empty());
    }
}
