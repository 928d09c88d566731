//! Document metadata
//!
//! Metadata is an ordered multimap from case-sensitive keys to lists of values.
//! The first value of a key is treated as its primary value. Every document
//! and every discovered outlink owns its own `Metadata`; deriving metadata for
//! a child always copies, it never aliases the parent's storage.

mod transfer;

pub use transfer::MetadataTransfer;

use std::collections::BTreeMap;

/// Ordered multimap of string keys to string values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, Vec<String>>,
}

impl Metadata {
    /// Creates an empty metadata map
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first value stored under `key`
    pub fn first_value(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the first value of the first key equal to `key` ignoring ASCII case
    ///
    /// Used for HTTP header names, which fetchers store with varying case.
    pub fn first_value_ignore_case(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.first_value(key) {
            return Some(value);
        }
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// Returns all values stored under `key`, in insertion order
    pub fn values(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns all values of every key equal to `key` ignoring ASCII case
    pub fn values_ignore_case(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .flat_map(|(_, values)| values.iter().map(String::as_str))
            .collect()
    }

    /// Replaces any values under `key` with a single value
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), vec![value.into()]);
    }

    /// Replaces any values under `key` with `values`
    pub fn set_values<I, S>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .insert(key.into(), values.into_iter().map(Into::into).collect());
    }

    /// Appends a value to the list stored under `key`
    pub fn add_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    /// Appends several values to the list stored under `key`
    pub fn add_values<I, S>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Removes a key and returns its values
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(key)
    }

    /// Returns true if the key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over keys and their values, ordered by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut metadata = Metadata::new();
        for (key, value) in iter {
            metadata.add_value(key, value);
        }
        metadata
    }
}
