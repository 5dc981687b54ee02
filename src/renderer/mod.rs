//! Render boundary
//!
//! Turns a published `FieldSnapshot` into per-model instance batches ready
//! for upload. Nothing here touches simulation state.

pub mod instance;

use std::collections::BTreeMap;

pub use instance::{InstanceRaw, ModelKey};

use crate::sim::FieldSnapshot;

/// Instances grouped by the model they are drawn with, in stable key order
#[derive(Debug, Default, Clone)]
pub struct InstanceBatches {
    batches: BTreeMap<ModelKey, Vec<InstanceRaw>>,
}

impl InstanceBatches {
    pub fn from_snapshot(snapshot: &FieldSnapshot) -> Self {
        let mut batches = Self::default();
        for asteroid in &snapshot.asteroids {
            batches.push(
                ModelKey::Asteroid {
                    kind: asteroid.kind,
                    detail: asteroid.detail,
                },
                asteroid.into(),
            );
        }
        for decoration in &snapshot.decorations {
            batches.push(ModelKey::Decoration { kind: decoration.kind }, decoration.into());
        }
        for item in &snapshot.items {
            batches.push(ModelKey::Item { kind: item.kind.index() }, item.into());
        }
        batches
    }

    fn push(&mut self, key: ModelKey, instance: InstanceRaw) {
        self.batches.entry(key).or_default().push(instance);
    }

    pub fn get(&self, key: ModelKey) -> &[InstanceRaw] {
        self.batches.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Batches in draw order
    pub fn iter(&self) -> impl Iterator<Item = (ModelKey, &[InstanceRaw])> {
        self.batches.iter().map(|(key, instances)| (*key, instances.as_slice()))
    }

    /// Raw bytes of one batch for a GPU buffer upload
    pub fn bytes(&self, key: ModelKey) -> &[u8] {
        bytemuck::cast_slice(self.get(key))
    }

    pub fn draw_calls(&self) -> usize {
        self.batches.len()
    }

    pub fn instance_count(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }
}
