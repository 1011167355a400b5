use crate::error::{Error, Result};
use crate::RowId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub row_id: RowId,
    pub title: String,
}

/// Documents in row order. Position `i` always holds the document with `row_id == i`.
#[derive(Debug, Clone, Default)]
pub struct DocumentTable {
    docs: Vec<Document>,
}

impl DocumentTable {
    /// Builds the table, rejecting row ids that are not dense and 0-based.
    pub fn new(docs: Vec<Document>) -> Result<Self> {
        for (pos, doc) in docs.iter().enumerate() {
            if doc.row_id as usize != pos {
                return Err(Error::ShapeMismatch(format!(
                    "document at position {pos} has row id {}",
                    doc.row_id
                )));
            }
        }
        Ok(Self { docs })
    }

    pub fn from_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let docs = titles
            .into_iter()
            .enumerate()
            .map(|(i, t)| Document { row_id: i as RowId, title: t.into() })
            .collect();
        Self { docs }
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn get(&self, row: RowId) -> Result<&Document> {
        self.docs
            .get(row as usize)
            .ok_or(Error::IndexOutOfRange { row: row as usize, rows: self.docs.len() })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> { self.docs.iter() }

    pub fn as_slice(&self) -> &[Document] { &self.docs }
}
