use crate::error::{Error, Result};
use crate::TermId;
use serde::{Deserialize, Serialize};

/// Borrowed view of one stored row: strictly increasing column ids with their weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseRow<'a> {
    pub indices: &'a [TermId],
    pub values: &'a [f32],
}

impl<'a> SparseRow<'a> {
    pub fn nnz(&self) -> usize { self.indices.len() }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, f32)> + 'a {
        let (indices, values) = (self.indices, self.values);
        indices.iter().copied().zip(values.iter().copied())
    }

    /// Inner product by merging the two sorted index lists.
    pub fn dot(&self, other: &SparseRow<'_>) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut acc = 0.0f32;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }
}

/// Serialized CSR layout; validated before it becomes a [`VectorSpace`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrParts {
    pub rows: usize,
    pub cols: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<TermId>,
    pub data: Vec<f32>,
}

/// Immutable documents × terms matrix in compressed sparse row form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CsrParts")]
pub struct VectorSpace {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<TermId>,
    data: Vec<f32>,
}

impl TryFrom<CsrParts> for VectorSpace {
    type Error = Error;

    fn try_from(p: CsrParts) -> Result<Self> {
        Self::from_csr(p.rows, p.cols, p.indptr, p.indices, p.data)
    }
}

impl VectorSpace {
    pub fn from_csr(
        rows: usize,
        cols: usize,
        indptr: Vec<usize>,
        indices: Vec<TermId>,
        data: Vec<f32>,
    ) -> Result<Self> {
        if indptr.len() != rows + 1 {
            return Err(Error::InvalidMatrix(format!(
                "indptr has {} entries, expected {}",
                indptr.len(),
                rows + 1
            )));
        }
        if indptr[0] != 0 {
            return Err(Error::InvalidMatrix("indptr must start at 0".into()));
        }
        if indices.len() != data.len() || indptr[rows] != indices.len() {
            return Err(Error::InvalidMatrix(format!(
                "indptr ends at {}, indices {}, data {}",
                indptr[rows],
                indices.len(),
                data.len()
            )));
        }
        for r in 0..rows {
            let (start, end) = (indptr[r], indptr[r + 1]);
            if start > end || end > indices.len() {
                return Err(Error::InvalidMatrix(format!("indptr out of order at row {r}")));
            }
            let cols_in_row = &indices[start..end];
            if let Some(&c) = cols_in_row.iter().find(|&&c| c as usize >= cols) {
                return Err(Error::InvalidMatrix(format!("row {r} has column {c} >= {cols}")));
            }
            if cols_in_row.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::InvalidMatrix(format!("row {r} columns not strictly increasing")));
            }
        }
        Ok(Self { rows, cols, indptr, indices, data })
    }

    /// Builds a matrix from per-row `(column, weight)` entries in any order.
    pub fn from_rows(cols: usize, rows: Vec<Vec<(TermId, f32)>>) -> Result<Self> {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        let n = rows.len();
        for mut row in rows {
            row.sort_by_key(|&(c, _)| c);
            for (c, w) in row {
                indices.push(c);
                data.push(w);
            }
            indptr.push(indices.len());
        }
        Self::from_csr(n, cols, indptr, indices, data)
    }

    /// Dense rows, convenient for small fixtures. Zeros are not stored.
    pub fn from_dense(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let sparse = rows
            .iter()
            .map(|r| {
                r.iter()
                    .enumerate()
                    .filter(|(_, w)| **w != 0.0)
                    .map(|(c, w)| (c as TermId, *w))
                    .collect()
            })
            .collect();
        Self::from_rows(cols, sparse)
    }

    pub fn row_count(&self) -> usize { self.rows }

    pub fn column_count(&self) -> usize { self.cols }

    pub fn nnz(&self) -> usize { self.indices.len() }

    pub fn row(&self, i: usize) -> Result<SparseRow<'_>> {
        if i >= self.rows {
            return Err(Error::IndexOutOfRange { row: i, rows: self.rows });
        }
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        Ok(SparseRow { indices: &self.indices[start..end], values: &self.data[start..end] })
    }

    /// Inner product of `query` with every stored row.
    ///
    /// The query is scattered into a lookup of `column_count` slots and each
    /// stored nonzero is visited once; the matrix itself is never densified.
    pub fn dot_all(&self, query: &SparseRow<'_>) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.rows];
        if query.nnz() == 0 {
            return scores;
        }
        let mut lookup = vec![0.0f32; self.cols];
        for (c, w) in query.iter() {
            if let Some(slot) = lookup.get_mut(c as usize) {
                *slot = w;
            }
        }
        for (r, score) in scores.iter_mut().enumerate() {
            let (start, end) = (self.indptr[r], self.indptr[r + 1]);
            let mut acc = 0.0f32;
            for k in start..end {
                acc += self.data[k] * lookup[self.indices[k] as usize];
            }
            *score = acc;
        }
        scores
    }

    /// Whether every nonempty row has unit L2 norm, within `tol`.
    pub fn is_l2_normalized(&self, tol: f32) -> bool {
        (0..self.rows).all(|r| {
            let vals = &self.data[self.indptr[r]..self.indptr[r + 1]];
            vals.is_empty() || (vals.iter().map(|v| v * v).sum::<f32>().sqrt() - 1.0).abs() <= tol
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> VectorSpace {
        VectorSpace::from_dense(&[vec![1.0, 0.0, 0.0], vec![0.8, 0.2, 0.0], vec![0.0, 0.0, 1.0]]).unwrap()
    }

    #[test]
    fn dimensions_and_rows() {
        let m = space();
        assert_eq!((m.row_count(), m.column_count(), m.nnz()), (3, 3, 4));
        let r1 = m.row(1).unwrap();
        assert_eq!(r1.indices, &[0, 1]);
        assert_eq!(r1.values, &[0.8, 0.2]);
        assert!(matches!(m.row(3), Err(Error::IndexOutOfRange { row: 3, rows: 3 })));
    }

    #[test]
    fn dot_all_matches_pairwise_dot() {
        let m = space();
        for i in 0..m.row_count() {
            let q = m.row(i).unwrap();
            let all = m.dot_all(&q);
            for (j, s) in all.iter().enumerate() {
                let expected = q.dot(&m.row(j).unwrap());
                assert!((s - expected).abs() < 1e-6, "row {i} vs {j}");
            }
        }
        assert_eq!(m.dot_all(&m.row(0).unwrap()), vec![1.0, 0.8, 0.0]);
    }

    #[test]
    fn empty_query_scores_zero() {
        let m = space();
        let q = SparseRow { indices: &[], values: &[] };
        assert_eq!(m.dot_all(&q), vec![0.0; 3]);
    }

    #[test]
    fn rejects_malformed_csr() {
        assert!(VectorSpace::from_csr(2, 3, vec![0, 1], vec![0], vec![1.0]).is_err());
        assert!(VectorSpace::from_csr(1, 3, vec![0, 2], vec![2, 1], vec![1.0, 1.0]).is_err());
        assert!(VectorSpace::from_csr(1, 3, vec![0, 1], vec![3], vec![1.0]).is_err());
        assert!(VectorSpace::from_csr(1, 3, vec![0, 2], vec![0], vec![1.0]).is_err());
        assert!(VectorSpace::from_csr(2, 3, vec![0, 2, 1], vec![0, 1], vec![1.0, 1.0]).is_err());
        assert!(VectorSpace::from_csr(2, 3, vec![0, 5, 2], vec![0, 1], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn deserialization_validates() {
        let bad = CsrParts { rows: 1, cols: 1, indptr: vec![0, 1], indices: vec![5], data: vec![1.0] };
        let bytes = bincode::serialize(&bad).unwrap();
        assert!(bincode::deserialize::<VectorSpace>(&bytes).is_err());
    }

    #[test]
    fn normalization_check() {
        assert!(!space().is_l2_normalized(1e-4));
        let unit = VectorSpace::from_dense(&[vec![0.6, 0.8], vec![0.0, 1.0]]).unwrap();
        assert!(unit.is_l2_normalized(1e-4));
    }
}
