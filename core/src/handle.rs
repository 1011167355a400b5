use crate::engine::Recommender;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared slot holding the loaded [`Recommender`].
///
/// Empty until loading finishes. Publishing replaces the whole context in one
/// step, so readers see either nothing or a complete engine.
#[derive(Clone, Default)]
pub struct EngineHandle {
    slot: Arc<RwLock<Option<Arc<Recommender>>>>,
}

impl EngineHandle {
    pub fn new() -> Self { Self::default() }

    pub fn ready(engine: Recommender) -> Self {
        let handle = Self::new();
        handle.publish(engine);
        handle
    }

    pub fn get(&self) -> Result<Arc<Recommender>> {
        self.slot.read().clone().ok_or(Error::NotReady)
    }

    pub fn publish(&self, engine: Recommender) {
        *self.slot.write() = Some(Arc::new(engine));
    }

    pub fn is_ready(&self) -> bool { self.slot.read().is_some() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DocumentTable, TitleIndex, VectorSpace};

    fn tiny() -> Recommender {
        let docs = DocumentTable::from_titles(["A", "B"]);
        let titles = TitleIndex::build([("A", 0), ("B", 1)], Default::default()).unwrap();
        let space = VectorSpace::from_dense(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        Recommender::new(docs, titles, space).unwrap()
    }

    #[test]
    fn not_ready_until_published() {
        let handle = EngineHandle::new();
        assert!(!handle.is_ready());
        assert!(matches!(handle.get(), Err(Error::NotReady)));

        let reader = handle.clone();
        handle.publish(tiny());
        assert!(reader.is_ready());
        assert_eq!(reader.get().unwrap().documents().len(), 2);
    }
}
