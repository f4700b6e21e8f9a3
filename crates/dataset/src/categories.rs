//! Category vocabulary: immutable name↔id table.
//!
//! Built once from configuration and passed explicitly to every component
//! that needs it. Ids are stable list positions, so the id space is defined
//! entirely by the configured category order.

use std::collections::HashMap;

/// Bidirectional mapping between category display names and integer ids.
#[derive(Debug, Clone)]
pub struct CategoryVocab {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl CategoryVocab {
    /// Build a vocabulary from an ordered list of category names.
    ///
    /// The id of a category is its position in the list.
    ///
    /// # Errors
    /// Returns an error if the list is empty or contains duplicate names.
    pub fn new(names: Vec<String>) -> anyhow::Result<Self> {
        if names.is_empty() {
            anyhow::bail!("category list must not be empty");
        }
        let mut ids = HashMap::with_capacity(names.len());
        for (id, name) in names.iter().enumerate() {
            if ids.insert(name.clone(), id).is_some() {
                anyhow::bail!("duplicate category name: {name}");
            }
        }
        Ok(Self { names, ids })
    }

    /// Id for a category name, if present.
    pub fn id(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    /// Display name for a category id, if in range.
    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the vocabulary has no categories. Construction rejects this,
    /// so it only exists to pair with `len`.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All category names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}
