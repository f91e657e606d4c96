//! In-memory resolver, mostly for tests and generated content.

use super::{BoxRead, ResourceResolver};
use crate::error::Result;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Cursor;

/// Resources held in a map of name to bytes.
///
/// # Example
///
/// ```
/// use resbuf_materialize::resolver::InMemory;
///
/// let mut resolver = InMemory::with_resources([
///     ("one.txt", b"first".to_vec()),
///     ("two.txt", b"second".to_vec()),
/// ]);
/// resolver.insert("three.txt", "third");
/// assert_eq!(resolver.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemory {
    resources: BTreeMap<String, Vec<u8>>,
}

impl InMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(resources: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let resources = resources.into_iter().map(|(name, data)| (name.into(), data.into())).collect();
        Self { resources }
    }

    /// Add or replace a resource. Replacing does not affect copies already
    /// materialized on disk.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.resources.insert(name.into(), data.into());
        self
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl ResourceResolver for InMemory {
    fn open(&self, name: &str) -> Result<Option<BoxRead<'_>>> {
        Ok(self.resources.get(name).map(|data| Box::new(Cursor::new(data.as_slice())) as BoxRead<'_>))
    }

    fn names(&self) -> Result<Vec<Cow<'_, str>>> {
        Ok(self.resources.keys().map(|name| Cow::Borrowed(name.as_str())).collect())
    }
}
