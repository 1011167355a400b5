use crate::error::{Error, Result};
use crate::RowId;
use std::collections::HashMap;

/// Lookup key for a title: surrounding whitespace trimmed, lower-cased.
pub fn normalize(title: &str) -> String {
    title.trim().to_lowercase()
}

/// What to do when two raw titles normalize to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// The mapping that comes later in build order replaces the earlier one.
    #[default]
    LastWriteWins,
    /// Fail the build.
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    map: HashMap<String, RowId>,
}

impl TitleIndex {
    /// Builds the index from raw `(title, row)` pairs, in the order given.
    pub fn build<I, S>(raw: I, policy: CollisionPolicy) -> Result<Self>
    where
        I: IntoIterator<Item = (S, RowId)>,
        S: AsRef<str>,
    {
        let mut map: HashMap<String, RowId> = HashMap::new();
        for (title, row) in raw {
            let key = normalize(title.as_ref());
            match map.get(&key).copied() {
                Some(prev) if prev != row => match policy {
                    CollisionPolicy::Reject => {
                        return Err(Error::TitleCollision { key, first: prev, second: row });
                    }
                    CollisionPolicy::LastWriteWins => {
                        tracing::warn!(%key, replaced = prev, row, "title collision, keeping later row");
                        map.insert(key, row);
                    }
                },
                Some(_) => {}
                None => {
                    map.insert(key, row);
                }
            }
        }
        Ok(Self { map })
    }

    pub fn lookup(&self, title: &str) -> Result<RowId> {
        self.map
            .get(&normalize(title))
            .copied()
            .ok_or_else(|| Error::NotFound(title.to_string()))
    }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    /// Largest row id referenced by any key.
    pub fn max_row(&self) -> Option<RowId> { self.map.values().copied().max() }
}
