use crate::documents::DocumentTable;
use crate::error::{Error, Result};
use crate::title_index::TitleIndex;
use crate::vector_space::VectorSpace;
use crate::RowId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub score: f32,
}

/// The loaded, read-only recommendation context.
///
/// Documents, title index and vector space share one row-id space; the
/// constructor refuses artifacts whose shapes disagree.
#[derive(Debug)]
pub struct Recommender {
    documents: DocumentTable,
    titles: TitleIndex,
    space: VectorSpace,
}

impl Recommender {
    pub fn new(documents: DocumentTable, titles: TitleIndex, space: VectorSpace) -> Result<Self> {
        if documents.len() != space.row_count() {
            return Err(Error::ShapeMismatch(format!(
                "{} documents but {} matrix rows",
                documents.len(),
                space.row_count()
            )));
        }
        if let Some(max) = titles.max_row() {
            if max as usize >= space.row_count() {
                return Err(Error::ShapeMismatch(format!(
                    "title index references row {max} but matrix has {} rows",
                    space.row_count()
                )));
            }
        }
        Ok(Self { documents, titles, space })
    }

    pub fn documents(&self) -> &DocumentTable { &self.documents }

    pub fn titles(&self) -> &TitleIndex { &self.titles }

    pub fn space(&self) -> &VectorSpace { &self.space }

    /// Up to `top_n` documents most similar to `title`, best first.
    ///
    /// Ordered by score descending, then row id ascending. The queried
    /// document itself is never returned.
    pub fn recommend(&self, title: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        let query_row = self.titles.lookup(title)?;
        self.recommend_row(query_row, top_n).map_err(|e| {
            if let Error::IndexOutOfRange { row, rows } = &e {
                tracing::error!(title, row, rows, "artifact consistency error");
            }
            e
        })
    }

    fn recommend_row(&self, query_row: RowId, top_n: usize) -> Result<Vec<Recommendation>> {
        let query = self.space.row(query_row as usize)?;
        let scores = self.space.dot_all(&query);

        let mut ranked: Vec<(RowId, f32)> = scores
            .into_iter()
            .enumerate()
            .map(|(i, s)| (i as RowId, s))
            .filter(|&(i, _)| i != query_row)
            .collect();
        top_k(&mut ranked, top_n);

        ranked
            .into_iter()
            .map(|(row, score)| {
                let doc = self.documents.get(row)?;
                Ok(Recommendation { title: doc.title.clone(), score })
            })
            .collect()
    }
}

/// Leaves the best `k` entries of `items`, sorted by [`rank_order`].
fn top_k(items: &mut Vec<(RowId, f32)>, k: usize) {
    if k == 0 {
        items.clear();
        return;
    }
    if k < items.len() {
        // Row ids are unique, so the order is total and the selection deterministic.
        items.select_nth_unstable_by(k - 1, rank_order);
        items.truncate(k);
    }
    items.sort_unstable_by(rank_order);
}

fn rank_order(a: &(RowId, f32), b: &(RowId, f32)) -> Ordering {
    score_desc(a.1, b.1).then(a.0.cmp(&b.0))
}

// NaN sorts after every real score.
fn score_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_breaks_ties_by_row() {
        let mut items = vec![(4, 0.5), (1, 0.5), (3, 0.9), (2, 0.5), (0, 0.1)];
        top_k(&mut items, 3);
        assert_eq!(items, vec![(3, 0.9), (1, 0.5), (2, 0.5)]);
    }

    #[test]
    fn top_k_zero_and_oversized() {
        let mut items = vec![(0, 0.2), (1, 0.3)];
        top_k(&mut items, 0);
        assert!(items.is_empty());

        let mut items = vec![(0, 0.2), (1, 0.3)];
        top_k(&mut items, 10);
        assert_eq!(items, vec![(1, 0.3), (0, 0.2)]);
    }

    #[test]
    fn nan_ranks_last_and_signed_zero_ties() {
        let mut items = vec![(0, f32::NAN), (1, -0.0), (2, 0.0), (3, -1.0)];
        top_k(&mut items, 4);
        let rows: Vec<RowId> = items.iter().map(|(r, _)| *r).collect();
        assert_eq!(rows, vec![1, 2, 3, 0]);
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let docs = DocumentTable::from_titles(["A", "B"]);
        let titles = TitleIndex::build([("A", 0), ("B", 1)], Default::default()).unwrap();
        let space = VectorSpace::from_dense(&[vec![1.0]]).unwrap();
        assert!(matches!(Recommender::new(docs, titles, space), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn rejects_title_beyond_matrix() {
        let docs = DocumentTable::from_titles(["A"]);
        let titles = TitleIndex::build([("A", 0), ("Ghost", 7)], Default::default()).unwrap();
        let space = VectorSpace::from_dense(&[vec![1.0]]).unwrap();
        assert!(matches!(Recommender::new(docs, titles, space), Err(Error::ShapeMismatch(_))));
    }
}
