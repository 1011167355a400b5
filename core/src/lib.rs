//! Content-similarity recommendations over a precomputed TF-IDF vector space.

pub mod documents;
pub mod engine;
pub mod error;
pub mod handle;
pub mod persist;
pub mod title_index;
pub mod tokenizer;
pub mod vector_space;
pub mod vectorizer;

pub use documents::{Document, DocumentTable};
pub use engine::{Recommendation, Recommender};
pub use error::{Error, Result};
pub use handle::EngineHandle;
pub use title_index::{normalize, CollisionPolicy, TitleIndex};
pub use vector_space::{SparseRow, VectorSpace};

pub type RowId = u32;
pub type TermId = u32;
