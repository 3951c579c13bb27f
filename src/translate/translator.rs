//! Translation of typed configuration into a values tree.

use super::error::{TranslateError, TranslateErrors};
use super::tree::set_tree;
use crate::path::{parse_path, ParseError, Path, PathElement};
use crate::value::{Map, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Custom translation hook, called with the tree, the resolved destination
/// path and the leaf value.
pub type TranslateFn =
    Arc<dyn Fn(&mut Map, &Path, &Value) -> Result<(), TranslateError> + Send + Sync>;

/// Translation is the destination of one source path prefix.
#[derive(Clone)]
pub struct Translation {
    pub out_path: Path,
    pub func: Option<TranslateFn>,
}

impl fmt::Debug for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translation")
            .field("out_path", &self.out_path.to_string())
            .field("custom", &self.func.is_some())
            .finish()
    }
}

/// What happens to leaves that no mapping covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnmappedPolicy {
    /// Untranslated fields are not copied.
    #[default]
    Drop,
    /// Untranslated fields are copied to the same path, the way the legacy
    /// whole-tree mirror mode does.
    Mirror,
}

/// Mappings is a table of source path prefixes to translations.
#[derive(Debug, Clone, Default)]
pub struct Mappings {
    rules: HashMap<Vec<String>, Translation>,
    unmapped: UnmappedPolicy,
}

impl Mappings {
    pub fn new() -> Self {
        Mappings::default()
    }

    /// Sets the policy for leaves no mapping covers.
    pub fn with_unmapped_policy(mut self, policy: UnmappedPolicy) -> Self {
        self.unmapped = policy;
        self
    }

    pub fn unmapped_policy(&self) -> UnmappedPolicy {
        self.unmapped
    }

    /// Maps `source` (plain elements only) to the `dest` path.
    pub fn add(&mut self, source: &str, dest: &str) -> Result<&mut Self, ParseError> {
        self.insert(source, dest, None)
    }

    /// Maps `source` to `dest` through a custom function.
    pub fn add_with<F>(&mut self, source: &str, dest: &str, func: F) -> Result<&mut Self, ParseError>
    where
        F: Fn(&mut Map, &Path, &Value) -> Result<(), TranslateError> + Send + Sync + 'static,
    {
        self.insert(source, dest, Some(Arc::new(func)))
    }

    fn insert(
        &mut self,
        source: &str,
        dest: &str,
        func: Option<TranslateFn>,
    ) -> Result<&mut Self, ParseError> {
        let source_path = parse_path(source)?;
        let mut key = Vec::with_capacity(source_path.len());
        for (position, element) in source_path.iter().enumerate() {
            match element {
                PathElement::Plain(name) => key.push(name.clone()),
                other => {
                    return Err(ParseError::new(
                        other.to_string(),
                        position,
                        "source paths may only contain plain elements",
                    ))
                }
            }
        }
        let out_path = parse_path(dest)?;
        self.rules.insert(key, Translation { out_path, func });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolves a source path against the longest registered prefix.
    ///
    /// Returns the destination prefix with the unmatched suffix appended,
    /// and the custom function of the matched rule if it has one.
    pub fn resolve(&self, source: &[String]) -> Option<(Path, Option<&TranslateFn>)> {
        (0..=source.len()).rev().find_map(|len| {
            self.rules.get(&source[..len]).map(|t| {
                let suffix: Vec<PathElement> = source[len..]
                    .iter()
                    .map(|s| PathElement::Plain(s.clone()))
                    .collect();
                (t.out_path.join(&suffix), t.func.as_ref())
            })
        })
    }
}

/// Translator walks a configuration document and fills a values tree.
#[derive(Debug, Clone, Copy)]
pub struct Translator<'a> {
    mappings: &'a Mappings,
}

impl<'a> Translator<'a> {
    pub fn new(mappings: &'a Mappings) -> Self {
        Translator { mappings }
    }

    /// Translates `root` into a new tree.
    ///
    /// Errors do not stop the walk; every problem found is returned.
    pub fn to_tree<T: Serialize + ?Sized>(&self, root: &T) -> (Map, TranslateErrors) {
        let mut tree = Map::new();
        let mut errors = TranslateErrors::new();
        match serde_yaml::to_value(root) {
            Ok(doc) => self.walk(&doc, &mut Vec::new(), &mut tree, &mut errors),
            Err(e) => errors.add(TranslateError::decode(e.to_string())),
        }
        (tree, errors)
    }

    fn walk(
        &self,
        node: &serde_yaml::Value,
        path: &mut Vec<String>,
        tree: &mut Map,
        errors: &mut TranslateErrors,
    ) {
        use serde_yaml::Value as Yaml;

        match node {
            Yaml::Null => {}
            Yaml::Bool(b) => self.leaf(tree, path, Value::Bool(*b), errors),
            Yaml::Number(n) => {
                let leaf = match n.as_i64() {
                    Some(i) => Value::Int(i),
                    None => Value::Float(n.as_f64().unwrap_or_default()),
                };
                self.leaf(tree, path, leaf, errors)
            }
            Yaml::String(s) => self.leaf(tree, path, Value::String(s.clone()), errors),
            // Elements share the path of their list.
            Yaml::Sequence(items) => {
                for item in items {
                    self.walk(item, path, tree, errors);
                }
            }
            Yaml::Mapping(mapping) => {
                for (key, child) in mapping {
                    let Some(name) = mapping_key(key) else {
                        errors.add(TranslateError::unsupported_type(
                            path.join("."),
                            "non-scalar map key",
                        ));
                        continue;
                    };
                    path.push(name);
                    self.walk(child, path, tree, errors);
                    path.pop();
                }
            }
            Yaml::Tagged(tagged) => errors.add(TranslateError::unsupported_type(
                path.join("."),
                format!("tagged value {}", tagged.tag),
            )),
        }
    }

    fn leaf(&self, tree: &mut Map, path: &[String], value: Value, errors: &mut TranslateErrors) {
        if let Err(e) = self.insert_leaf(tree, path, value) {
            errors.add(e);
        }
    }

    /// Writes one leaf value found at `source` into `tree`.
    pub fn insert_leaf(
        &self,
        tree: &mut Map,
        source: &[String],
        value: Value,
    ) -> Result<(), TranslateError> {
        match self.mappings.resolve(source) {
            Some((dest, Some(func))) => {
                trace!(source = %source.join("."), dest = %dest, "custom translation");
                func(tree, &dest, &value)
            }
            Some((dest, None)) => default_translate(tree, &dest, &value),
            None => match self.mappings.unmapped {
                UnmappedPolicy::Drop => {
                    debug!(source = %source.join("."), "no translation, dropping field");
                    Ok(())
                }
                UnmappedPolicy::Mirror => {
                    default_translate(tree, &Path::from_names(source.iter().cloned()), &value)
                }
            },
        }
    }
}

/// Translates `root` with `mappings`, see [`Translator::to_tree`].
pub fn to_tree<T: Serialize + ?Sized>(mappings: &Mappings, root: &T) -> (Map, TranslateErrors) {
    Translator::new(mappings).to_tree(root)
}

/// The translation used when a rule has no custom function.
///
/// Empty strings are skipped. The first character of every plain segment
/// of `dest` is lowercased.
pub fn default_translate(tree: &mut Map, dest: &Path, value: &Value) -> Result<(), TranslateError> {
    if matches!(value, Value::String(s) if s.is_empty()) {
        return Ok(());
    }
    let dest: Path = dest
        .iter()
        .map(|element| match element {
            PathElement::Plain(name) => PathElement::Plain(lower_first(name)),
            other => other.clone(),
        })
        .collect();
    set_tree(tree, &dest, value.clone())
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn mapping_key(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
