//! Batch building — lazy finite sequences of entities.

use std::fmt;
use std::sync::Arc;

use crate::compile::EntityType;
use crate::entity::Entity;
use crate::{Error, Result};

/// Per-index initializer run on each entity before it is yielded.
pub type BatchInit = Box<dyn FnMut(&mut Entity, usize)>;

/// A lazy, finite iterator producing `count` entities of one compiled type,
/// in index order. Plain and sequential — no concurrency of its own.
pub struct Batch {
    ty: Arc<EntityType>,
    remaining: usize,
    index: usize,
    init: Option<BatchInit>,
}

impl Batch {
    pub(crate) fn new(ty: Arc<EntityType>, count: usize, init: Option<BatchInit>) -> Result<Self> {
        if count < 1 {
            return Err(Error::Range(count));
        }
        Ok(Self { ty, remaining: count, index: 0, init })
    }
}

impl Iterator for Batch {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mut entity = Entity::new(Arc::clone(&self.ty));
        if let Some(init) = &mut self.init {
            init(&mut entity, self.index);
        }
        self.index += 1;
        Some(entity)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Batch {}
impl std::iter::FusedIterator for Batch {}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("contract", &self.ty.contract())
            .field("remaining", &self.remaining)
            .finish()
    }
}
