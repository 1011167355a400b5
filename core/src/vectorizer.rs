//! Offline TF-IDF fitting that produces the artifacts the engine loads.

use crate::documents::Document;
use crate::error::Result;
use crate::persist::{Artifacts, MetaFile, FORMAT_VERSION};
use crate::tokenizer::tokenize;
use crate::vector_space::VectorSpace;
use crate::{RowId, TermId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct TfidfOptions {
    /// `ln((1 + N) / (1 + df)) + 1` instead of `ln(N / df)`.
    pub smoothed_idf: bool,
    /// `1 + ln(tf)` instead of the raw count.
    pub sublinear_tf: bool,
    /// Terms found in fewer documents are dropped from the vocabulary.
    pub min_df: u32,
    pub l2_normalize: bool,
}

impl Default for TfidfOptions {
    fn default() -> Self {
        Self { smoothed_idf: false, sublinear_tf: true, min_df: 1, l2_normalize: true }
    }
}

#[derive(Default)]
pub struct TfidfBuilder {
    dictionary: HashMap<String, TermId>,
    df: Vec<u32>,
    counts: Vec<Vec<(TermId, u32)>>,
    titles: Vec<String>,
}

impl TfidfBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn num_docs(&self) -> usize { self.titles.len() }

    pub fn num_terms(&self) -> usize { self.dictionary.len() }

    /// Adds one document; rows are numbered in insertion order.
    pub fn add(&mut self, title: &str, description: &str) -> RowId {
        let row = self.titles.len() as RowId;
        let mut tf: HashMap<TermId, u32> = HashMap::new();
        for term in tokenize(description) {
            let next = self.dictionary.len() as TermId;
            let tid = *self.dictionary.entry(term).or_insert(next);
            if tid == next {
                self.df.push(0);
            }
            *tf.entry(tid).or_insert(0) += 1;
        }
        for tid in tf.keys() {
            self.df[*tid as usize] += 1;
        }
        let mut row_counts: Vec<(TermId, u32)> = tf.into_iter().collect();
        row_counts.sort_unstable_by_key(|&(t, _)| t);
        self.counts.push(row_counts);
        self.titles.push(title.to_string());
        row
    }

    pub fn finish(self, opts: TfidfOptions, created_at: String) -> Result<Artifacts> {
        let n = self.titles.len().max(1) as f32;

        // Surviving terms keep their relative order under new dense ids.
        let mut remap: Vec<Option<TermId>> = Vec::with_capacity(self.df.len());
        let mut num_terms: TermId = 0;
        for &df in &self.df {
            if df >= opts.min_df {
                remap.push(Some(num_terms));
                num_terms += 1;
            } else {
                remap.push(None);
            }
        }

        let idf: Vec<f32> = self
            .df
            .iter()
            .map(|&df| {
                let df = df.max(1) as f32;
                if opts.smoothed_idf {
                    ((1.0 + n) / (1.0 + df)).ln() + 1.0
                } else {
                    (n / df).ln()
                }
            })
            .collect();

        let mut rows: Vec<Vec<(TermId, f32)>> = Vec::with_capacity(self.counts.len());
        for row_counts in self.counts {
            let mut weights: Vec<(TermId, f32)> = row_counts
                .into_iter()
                .filter_map(|(tid, raw)| {
                    let new_id = remap[tid as usize]?;
                    let tf = if opts.sublinear_tf { 1.0 + (raw as f32).ln() } else { raw as f32 };
                    let w = tf * idf[tid as usize];
                    (w != 0.0).then_some((new_id, w))
                })
                .collect();
            if opts.l2_normalize {
                let norm = weights.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for (_, w) in weights.iter_mut() {
                        *w /= norm;
                    }
                }
            }
            rows.push(weights);
        }

        let space = VectorSpace::from_rows(num_terms as usize, rows)?;
        let documents: Vec<Document> = self
            .titles
            .iter()
            .enumerate()
            .map(|(i, t)| Document { row_id: i as RowId, title: t.clone() })
            .collect();
        let titles: Vec<(String, RowId)> =
            self.titles.into_iter().enumerate().map(|(i, t)| (t, i as RowId)).collect();
        let meta = MetaFile {
            num_docs: documents.len() as u32,
            num_terms,
            nnz: space.nnz() as u64,
            l2_normalized: opts.l2_normalize,
            created_at,
            version: FORMAT_VERSION,
        };
        tracing::info!(docs = meta.num_docs, terms = meta.num_terms, nnz = meta.nnz, "tf-idf fitted");
        Ok(Artifacts { documents, titles, space, meta })
    }
}
