//! Object sets and multi-document parsing.

use super::object::Object;
use super::ManifestError;
use indexmap::IndexMap;

/// ObjectSet is an ordered collection of objects with unique identities.
#[derive(Debug, Clone, Default)]
pub struct ObjectSet {
    objects: Vec<Object>,
    /// Identity to position in `objects`.
    index: IndexMap<String, usize>,
    /// Set by `iter_mut`; identities may have changed since the last index.
    stale: bool,
}

impl PartialEq for ObjectSet {
    fn eq(&self, other: &Self) -> bool {
        self.objects == other.objects
    }
}

impl ObjectSet {
    pub fn new() -> Self {
        ObjectSet::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    /// Mutable access to the objects. Callers that change identities must
    /// call [`ObjectSet::check_unique`] afterwards; lookups fall back to a
    /// scan until then.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.stale = true;
        self.objects.iter_mut()
    }

    /// Appends an object, rejecting an identity that is already present.
    pub fn push(&mut self, object: Object) -> Result<(), ManifestError> {
        if self.stale {
            self.check_unique()?;
        }
        let hash = object.hash();
        if self.index.contains_key(&hash) {
            return Err(ManifestError::Duplicate { hash });
        }
        self.index.insert(hash, self.objects.len());
        self.objects.push(object);
        Ok(())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.get(hash).is_some()
    }

    pub fn get(&self, hash: &str) -> Option<&Object> {
        if self.stale {
            return self.objects.iter().find(|o| o.hash() == hash);
        }
        self.index.get(hash).map(|&idx| &self.objects[idx])
    }

    /// Verifies that no two objects share an identity and rebuilds the
    /// identity index.
    pub fn check_unique(&mut self) -> Result<(), ManifestError> {
        let mut index = IndexMap::with_capacity(self.objects.len());
        for (idx, object) in self.objects.iter().enumerate() {
            let hash = object.hash();
            if index.contains_key(&hash) {
                return Err(ManifestError::Duplicate { hash });
            }
            index.insert(hash, idx);
        }
        self.index = index;
        self.stale = false;
        Ok(())
    }

    fn reindex(&mut self) {
        self.index = self
            .objects
            .iter()
            .enumerate()
            .map(|(idx, o)| (o.hash(), idx))
            .collect();
    }

    /// Returns the objects keyed by identity, in set order.
    pub fn to_map(&self) -> IndexMap<String, &Object> {
        self.objects.iter().map(|o| (o.hash(), o)).collect()
    }

    /// Returns a new set holding copies of the objects of `kind`.
    pub fn filter_kind(&self, kind: &str) -> ObjectSet {
        let mut set = ObjectSet {
            objects: self
                .objects
                .iter()
                .filter(|o| o.kind() == kind)
                .cloned()
                .collect(),
            ..ObjectSet::default()
        };
        set.reindex();
        set
    }

    /// Sorts by `(score, group, kind, name)`. The sort is stable.
    pub fn sort<F>(&mut self, score: F)
    where
        F: Fn(&Object) -> i32,
    {
        self.objects.sort_by_cached_key(|o| {
            (
                score(o),
                o.group().to_string(),
                o.kind().to_string(),
                o.name().to_string(),
            )
        });
        if !self.stale {
            self.reindex();
        }
    }

    /// Returns all objects as one multi-document YAML string.
    pub fn yaml(&self) -> Result<String, ManifestError> {
        let docs = self
            .objects
            .iter()
            .map(|o| o.yaml())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(docs.join("---\n"))
    }
}

impl IntoIterator for ObjectSet {
    type Item = Object;
    type IntoIter = std::vec::IntoIter<Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}

impl<'a> IntoIterator for &'a ObjectSet {
    type Item = &'a Object;
    type IntoIter = std::slice::Iter<'a, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

/// Parses a multi-document manifest.
///
/// Documents holding only blank and `#` comment lines are skipped. The
/// first document that fails to decode aborts the parse.
pub fn parse_objects(text: &str) -> Result<ObjectSet, ManifestError> {
    let mut set = ObjectSet::new();
    for document in split_documents(text) {
        if is_blank_or_comment(&document) {
            continue;
        }
        set.push(Object::from_yaml(&document)?)?;
    }
    Ok(set)
}

/// Splits `text` on lines that read exactly `---`.
pub fn split_documents(text: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line == "---" {
            documents.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    documents.push(current);
    documents
}

fn is_blank_or_comment(document: &str) -> bool {
    document.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with('#')
    })
}
