//! Render Collection
//!
//! Registry of positioned mesh instances drawn by the viewport, keyed by
//! instance identity.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use foxworks_core::ObjectId;
use glam::Mat4;

use crate::mesh::DisplayableMesh;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A mesh placed in the world
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: InstanceId,
    /// Object the instance draws
    pub object: ObjectId,
    pub mesh: Arc<DisplayableMesh>,
    /// World transform
    pub transform: Mat4,
}

impl Instance {
    /// Create an instance at the origin with a fresh id
    pub fn new(object: ObjectId, mesh: Arc<DisplayableMesh>) -> Self {
        Self {
            id: InstanceId::next(),
            object,
            mesh,
            transform: Mat4::IDENTITY,
        }
    }
}

/// Instances currently drawn by the viewport
#[derive(Debug, Default)]
pub struct RenderCollection {
    instances: AHashMap<InstanceId, Instance>,
}

impl RenderCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Register an instance, replacing any with the same id
    pub fn add(&mut self, instance: Instance) {
        self.instances.insert(instance.id, instance);
    }

    /// Deregister an instance
    pub fn remove(&mut self, id: InstanceId) -> Option<Instance> {
        self.instances.remove(&id)
    }

    /// Replace an already registered instance; returns `false` if absent
    pub fn replace_if_present(&mut self, instance: Instance) -> bool {
        match self.instances.get_mut(&instance.id) {
            Some(slot) => {
                *slot = instance;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    /// Number of registered instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Iterate over instances in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    /// Triangles over all instances and levels
    pub fn total_triangle_count(&self) -> usize {
        self.instances
            .values()
            .map(|i| i.mesh.total_triangle_count())
            .sum()
    }
}
