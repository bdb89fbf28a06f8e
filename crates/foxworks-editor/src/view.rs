//! Vessel View
//!
//! The 3D view of one vessel: owns the object tree, one renderer per object
//! and the instance collection drawn by the viewport. Every edit goes
//! through the view so meshes and transforms follow the model.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use foxworks_core::{GeometryEvaluator, ObjectId, ObjectTree, ObjectType, Variable};
use foxworks_renderer::{EventQueue, RenderCollection, RenderEvent, RendererRegistry};
use glam::{Mat4, Vec3};
use serde::Serialize;

use crate::{EditorConfig, EditorError, EditorResult};

/// Counters describing the view's current state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewStats {
    pub objects: usize,
    pub renderers: usize,
    pub instances: usize,
    pub triangles: usize,
    /// LOD sets completed across all generators
    pub completed_generations: u64,
}

/// Object tree with renderers kept in sync
pub struct VesselView {
    config: EditorConfig,
    tree: ObjectTree,
    collection: RenderCollection,
    registry: RendererRegistry,
    queue: EventQueue,
    repaint_requested: bool,
}

impl VesselView {
    /// Create an empty view
    pub fn new(config: EditorConfig, evaluator: Arc<dyn GeometryEvaluator>) -> EditorResult<Self> {
        let queue = EventQueue::new();
        let registry = RendererRegistry::new(evaluator, config.renderer.clone(), queue.sender())?;
        log::info!(
            "Vessel view created with {} LOD levels",
            config.renderer.lod_levels
        );
        Ok(Self {
            config,
            tree: ObjectTree::new(),
            collection: RenderCollection::new(),
            registry,
            queue,
            repaint_requested: false,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tree(&self) -> &ObjectTree {
        &self.tree
    }

    pub fn collection(&self) -> &RenderCollection {
        &self.collection
    }

    pub fn registry(&self) -> &RendererRegistry {
        &self.registry
    }

    /// Add an object and its renderer
    pub fn add_object(
        &mut self,
        parent: Option<ObjectId>,
        name: &str,
        object_type: ObjectType,
    ) -> EditorResult<ObjectId> {
        let id = self.tree.add_object(parent, name, object_type)?;
        if let Err(error) = self.registry.create(&self.tree, &mut self.collection, id) {
            self.tree.remove_object(id)?;
            return Err(error.into());
        }
        self.repaint_requested = true;
        Ok(id)
    }

    /// Remove an object with its subtree.
    ///
    /// Each renderer's worker is joined before its instance is released.
    pub fn remove_object(&mut self, id: ObjectId) -> EditorResult<Vec<ObjectId>> {
        let removed = self.tree.remove_object(id)?;
        for &object in &removed {
            self.registry.remove(object, &mut self.collection);
        }
        log::debug!("Removed {} objects under {}", removed.len(), id);
        self.repaint_requested = true;
        Ok(removed)
    }

    /// Change a geometry parameter and regenerate the object's meshes
    pub fn set_parameter(
        &mut self,
        id: ObjectId,
        name: &str,
        value: impl Into<Variable>,
    ) -> EditorResult<()> {
        self.tree.set_parameter(id, name, value)?;
        self.registry.invalidate_mesh(&self.tree, &mut self.collection, id);
        self.repaint_requested = true;
        Ok(())
    }

    /// Move an object; its subtree follows
    pub fn set_position(&mut self, id: ObjectId, position: Vec3) -> EditorResult<()> {
        self.tree.set_position(id, position)?;
        self.registry.invalidate_transform(&self.tree, &mut self.collection, id);
        self.repaint_requested = true;
        Ok(())
    }

    /// Move an object under a new parent, or make it a root
    pub fn reparent(&mut self, id: ObjectId, parent: Option<ObjectId>) -> EditorResult<()> {
        self.tree.set_parent(id, parent)?;
        self.registry.invalidate_transform(&self.tree, &mut self.collection, id);
        self.repaint_requested = true;
        Ok(())
    }

    /// World transform of an object's instance
    pub fn world_transform(&self, id: ObjectId) -> Option<Mat4> {
        self.registry.get(id).map(|r| r.world_transform())
    }

    /// Triangles per LOD level of an object's displayable mesh
    pub fn lod_triangles(&self, id: ObjectId) -> Option<Vec<usize>> {
        let renderer = self.registry.get(id)?;
        let mesh = renderer.mesh();
        Some(
            (0..renderer.generator().num_lods())
                .map(|lod| mesh.triangle_count(lod))
                .collect(),
        )
    }

    /// Handle queued background events.
    ///
    /// Returns the number of meshes rebuilt.
    pub fn process_events(&mut self) -> usize {
        let mut rebuilt = 0;
        for event in self.queue.drain() {
            match event {
                RenderEvent::LodsReady {
                    object,
                    generator,
                    generation,
                } => {
                    if self.registry.handle_lods_ready(
                        &self.tree,
                        &mut self.collection,
                        object,
                        generator,
                        generation,
                    ) {
                        rebuilt += 1;
                    }
                }
                RenderEvent::RepaintRequested => self.repaint_requested = true,
            }
        }
        rebuilt
    }

    /// Take the pending repaint request, if any
    pub fn take_repaint_request(&mut self) -> bool {
        std::mem::take(&mut self.repaint_requested)
    }

    /// Whether all LOD work is finished and delivered
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.registry.is_idle()
    }

    /// Pump events until all LOD work is delivered or `timeout` elapses
    pub fn wait_until_idle(&mut self, timeout: Duration) -> EditorResult<usize> {
        let start = Instant::now();
        let mut rebuilt = 0;
        loop {
            rebuilt += self.process_events();
            if self.is_idle() {
                return Ok(rebuilt);
            }
            if start.elapsed() >= timeout {
                return Err(EditorError::Timeout(timeout));
            }
            thread::sleep(self.config.pump_interval());
        }
    }

    pub fn stats(&self) -> ViewStats {
        ViewStats {
            objects: self.tree.len(),
            renderers: self.registry.len(),
            instances: self.collection.len(),
            triangles: self.collection.total_triangle_count(),
            completed_generations: self
                .registry
                .iter()
                .map(|r| r.generator().completed_generation())
                .sum(),
        }
    }
}

impl Drop for VesselView {
    fn drop(&mut self) {
        self.registry.clear(&mut self.collection);
    }
}
