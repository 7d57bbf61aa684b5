//! Feature module - feature names, per-document value maps and the global schema

use crate::MISSING_SENTINEL;
use std::borrow::Borrow;
use std::fmt;

/// A short feature label such as "Revenue"
///
/// Wording and case come from the model and are not normalized beyond
/// trimming surrounding whitespace. Names are opaque string keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureName(String);

impl FeatureName {
    /// Create a feature name, trimming surrounding whitespace
    ///
    /// Returns `None` when nothing is left after trimming.
    ///
    /// # Examples
    ///
    /// ```
    /// use docfeat_domain::FeatureName;
    ///
    /// let name = FeatureName::new("  Revenue ").unwrap();
    /// assert_eq!(name.as_str(), "Revenue");
    /// assert!(FeatureName::new("   ").is_none());
    /// ```
    pub fn new(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FeatureName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FeatureName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Insertion-ordered mapping from feature name to extracted value
///
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureMap {
    entries: Vec<(FeatureName, String)>,
}

impl FeatureMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value
    pub fn insert(&mut self, name: FeatureName, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Insert the missing sentinel for `name`
    pub fn insert_missing(&mut self, name: FeatureName) {
        self.insert(name, MISSING_SENTINEL);
    }

    /// Look up a value by exact name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the map holds `name`
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &FeatureName> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&FeatureName, &str)> {
        self.entries.iter().map(|(key, value)| (key, value.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(FeatureName, String)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (FeatureName, String)>>(iter: I) -> Self {
        let mut map = FeatureMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// The running, batch-wide ordered set of known feature names
///
/// Names are unique by exact string match. The schema is replaced wholesale
/// after each merge step; whatever the merge returns becomes the new schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalSchema {
    features: Vec<FeatureName>,
}

impl GlobalSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from names, keeping the first occurrence of exact duplicates
    ///
    /// # Examples
    ///
    /// ```
    /// use docfeat_domain::{FeatureName, GlobalSchema};
    ///
    /// let names = ["Revenue", "Diagnosis", "Revenue"]
    ///     .iter()
    ///     .filter_map(|n| FeatureName::new(n));
    /// let schema = GlobalSchema::from_names(names);
    /// assert_eq!(schema.len(), 2);
    /// ```
    pub fn from_names<I>(names: I) -> Self
    where
        I: IntoIterator<Item = FeatureName>,
    {
        let mut schema = Self::new();
        for name in names {
            schema.push(name);
        }
        schema
    }

    /// Append a name unless an identical one is already present
    ///
    /// Returns true when the name was added.
    pub fn push(&mut self, name: FeatureName) -> bool {
        if self.features.contains(&name) {
            return false;
        }
        self.features.push(name);
        true
    }

    /// Whether the schema holds exactly `name`
    pub fn contains(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.as_str() == name)
    }

    /// Feature names in schema order
    pub fn iter(&self) -> std::slice::Iter<'_, FeatureName> {
        self.features.iter()
    }

    /// Feature names as a slice
    pub fn as_slice(&self) -> &[FeatureName] {
        &self.features
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the schema is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Names joined as a comma-separated list, the format used in prompts
    pub fn to_delimited(&self) -> String {
        self.features
            .iter()
            .map(FeatureName::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<'a> IntoIterator for &'a GlobalSchema {
    type Item = &'a FeatureName;
    type IntoIter = std::slice::Iter<'a, FeatureName>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
