//! Object Renderers
//!
//! Bridges vessel objects to their on-screen instances. Each
//! [`ObjectRenderer`] owns one LOD generator, one displayable mesh and one
//! instance; the [`RendererRegistry`] keeps one renderer per object and
//! propagates world transforms down the object tree.
//!
//! All methods run on the owning thread. Background work only reaches a
//! renderer through [`RenderEvent::LodsReady`] events drained by that thread.

use std::sync::Arc;

use ahash::AHashMap;
use foxworks_core::math::translation;
use foxworks_core::{GeometryEvaluator, Mesh, Object, ObjectId, ObjectTree, SnapshotSource};
use glam::{Mat4, Vec3};

use crate::collection::{Instance, InstanceId, RenderCollection};
use crate::events::{EventSender, RenderEvent};
use crate::lod::{GeneratorId, LodGenerator, LodSet};
use crate::material::Material;
use crate::mesh::DisplayableMesh;
use crate::{RendererConfig, RendererResult};

/// On-screen representation of one object
pub struct ObjectRenderer {
    object: ObjectId,
    generator: LodGenerator,
    evaluator: Arc<dyn GeometryEvaluator>,
    config: RendererConfig,
    instance: Instance,
    events: EventSender,
    /// Latest generation announced to this renderer
    seen_generation: u64,
}

impl ObjectRenderer {
    /// Create the renderer, start its generator and build an initial mesh.
    ///
    /// The instance is not registered until the first transform update.
    pub fn new(
        tree: &ObjectTree,
        object: ObjectId,
        evaluator: Arc<dyn GeometryEvaluator>,
        config: RendererConfig,
        events: EventSender,
    ) -> RendererResult<Self> {
        let target = tree.get(object)?;
        let generator = LodGenerator::new(object, evaluator.clone(), &config, events.clone())?;
        let mut renderer = Self {
            object,
            generator,
            evaluator,
            config,
            instance: Instance::new(object, Arc::new(DisplayableMesh::new())),
            events,
            seen_generation: 0,
        };

        renderer.generator.request_update(tree);
        renderer.build_preview(tree, target);
        log::debug!(
            "Created renderer for object {} ({}) with generator {}",
            object,
            target.name(),
            renderer.generator.id()
        );
        Ok(renderer)
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn generator_id(&self) -> GeneratorId {
        self.generator.id()
    }

    pub fn generator(&self) -> &LodGenerator {
        &self.generator
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance.id
    }

    /// Current world transform of the instance
    pub fn world_transform(&self) -> Mat4 {
        self.instance.transform
    }

    /// Displayable mesh currently shown
    pub fn mesh(&self) -> &DisplayableMesh {
        &self.instance.mesh
    }

    /// Geometry parameters changed.
    ///
    /// Queues a background regeneration and immediately rebuilds from the
    /// last completed set, which may be stale, so the view is never left
    /// empty. Only evaluates on this thread when `quick_preview` is set.
    pub fn on_mesh_invalidated(&mut self, tree: &ObjectTree, collection: &mut RenderCollection) {
        let Ok(target) = tree.get(self.object) else {
            log::debug!("Mesh invalidated for removed object {}", self.object);
            return;
        };
        self.generator.request_update(tree);
        self.build_preview(tree, target);
        collection.replace_if_present(self.instance.clone());
    }

    /// Whether every completed generation has been announced and no
    /// regeneration is queued or running
    pub fn is_settled(&self) -> bool {
        !self.generator.is_busy() && self.seen_generation >= self.generator.completed_generation()
    }

    /// Background generation `generation` completed.
    ///
    /// Rebuilds every level from the completed set and asks for a repaint.
    /// Returns `false` when nothing was rebuilt because a newer generation
    /// is already queued or the object is gone.
    pub fn on_mesh_ready(
        &mut self,
        tree: &ObjectTree,
        collection: &mut RenderCollection,
        generation: u64,
    ) -> bool {
        self.seen_generation = self.seen_generation.max(generation);
        let Some(set) = self.generator.ready_set() else {
            log::debug!(
                "Skipping rebuild of object {}: newer LODs pending",
                self.object
            );
            return false;
        };
        let Ok(target) = tree.get(self.object) else {
            return false;
        };

        let mesh = self.assemble(&set, Material::for_object(target));
        log::debug!(
            "Rebuilt object {} from generation {} ({} triangles)",
            self.object,
            set.generation(),
            mesh.total_triangle_count()
        );
        self.install(mesh);
        collection.replace_if_present(self.instance.clone());
        self.events.send(RenderEvent::RepaintRequested);
        true
    }

    /// Recompute the world transform from the parent's world transform and
    /// the object's local position, and register the instance.
    ///
    /// A missing parent transform counts as identity.
    pub fn on_transform_invalidated(
        &mut self,
        parent_world: Option<Mat4>,
        local_position: Vec3,
        collection: &mut RenderCollection,
    ) -> Mat4 {
        let world = parent_world.unwrap_or(Mat4::IDENTITY) * translation(local_position);
        self.instance.transform = world;
        collection.add(self.instance.clone());
        world
    }

    /// Stop and join the generator, then deregister the instance.
    ///
    /// No event from this renderer's generator is posted after the join.
    pub fn shutdown(mut self, collection: &mut RenderCollection) {
        if !self.generator.shutdown() {
            log::warn!("LOD worker of object {} panicked", self.object);
        }
        collection.remove(self.instance.id);
        log::debug!("Destroyed renderer for object {}", self.object);
    }

    fn build_preview(&mut self, tree: &ObjectTree, target: &Object) {
        let material = Material::for_object(target);
        if self.config.quick_preview {
            let resolution = self.config.coarsest_resolution();
            let preview = tree.snapshot(self.object).map(|snapshot| {
                self.evaluator
                    .evaluate(&snapshot, resolution, self.config.mesh_flags)
            });
            match preview {
                Some(Ok(preview)) => {
                    let mesh = self.fill_levels(Some(&preview), material);
                    self.install(mesh);
                    return;
                }
                Some(Err(error)) => log::warn!(
                    "Preview of object {} failed, showing last LODs: {}",
                    self.object,
                    error
                ),
                None => {}
            }
        }

        let mesh = match self.generator.last_completed() {
            Some(set) => self.assemble(&set, material),
            None => self.fill_levels(Some(&Mesh::new()), material),
        };
        self.install(mesh);
    }

    /// Same mesh in every level
    fn fill_levels(&self, source: Option<&Mesh>, material: Material) -> DisplayableMesh {
        let mut mesh = DisplayableMesh::new();
        for lod in 0..self.generator.num_lods() {
            mesh.add_lod(lod, source, material, self.config.cutaway.as_ref());
        }
        mesh.finish();
        mesh
    }

    fn assemble(&self, set: &LodSet, material: Material) -> DisplayableMesh {
        let mut mesh = DisplayableMesh::new();
        for lod in 0..self.generator.num_lods() {
            mesh.add_lod(
                lod,
                set.mesh(lod).map(|m| m.as_ref()),
                material,
                self.config.cutaway.as_ref(),
            );
        }
        mesh.finish();
        mesh
    }

    fn install(&mut self, mesh: DisplayableMesh) {
        self.instance.mesh = Arc::new(mesh);
    }
}

/// One renderer per object, with tree-wide transform propagation
pub struct RendererRegistry {
    renderers: AHashMap<ObjectId, ObjectRenderer>,
    evaluator: Arc<dyn GeometryEvaluator>,
    config: RendererConfig,
    events: EventSender,
}

impl RendererRegistry {
    pub fn new(
        evaluator: Arc<dyn GeometryEvaluator>,
        config: RendererConfig,
        events: EventSender,
    ) -> RendererResult<Self> {
        config.validate()?;
        Ok(Self {
            renderers: AHashMap::new(),
            evaluator,
            config,
            events,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Create the renderer of `object` if it has none, and place it
    pub fn create(
        &mut self,
        tree: &ObjectTree,
        collection: &mut RenderCollection,
        object: ObjectId,
    ) -> RendererResult<()> {
        if self.renderers.contains_key(&object) {
            return Ok(());
        }
        let renderer = ObjectRenderer::new(
            tree,
            object,
            self.evaluator.clone(),
            self.config.clone(),
            self.events.clone(),
        )?;
        self.renderers.insert(object, renderer);
        self.invalidate_transform(tree, collection, object);
        Ok(())
    }

    /// Recompute world transforms of `object` and its whole subtree,
    /// parents before children.
    ///
    /// Objects without a renderer contribute no transform; their children
    /// are still updated, starting from identity.
    pub fn invalidate_transform(
        &mut self,
        tree: &ObjectTree,
        collection: &mut RenderCollection,
        object: ObjectId,
    ) {
        let parent_world = tree
            .parent(object)
            .and_then(|parent| self.renderers.get(&parent))
            .map(ObjectRenderer::world_transform);
        self.propagate(tree, collection, object, parent_world);
    }

    fn propagate(
        &mut self,
        tree: &ObjectTree,
        collection: &mut RenderCollection,
        object: ObjectId,
        parent_world: Option<Mat4>,
    ) {
        let Ok(target) = tree.get(object) else {
            return;
        };
        let world = self
            .renderers
            .get_mut(&object)
            .map(|r| r.on_transform_invalidated(parent_world, target.position(), collection));

        for &child in target.children() {
            self.propagate(tree, collection, child, world);
        }
    }

    /// Forward a parameter change to the object's renderer
    pub fn invalidate_mesh(
        &mut self,
        tree: &ObjectTree,
        collection: &mut RenderCollection,
        object: ObjectId,
    ) -> bool {
        match self.renderers.get_mut(&object) {
            Some(renderer) => {
                renderer.on_mesh_invalidated(tree, collection);
                true
            }
            None => false,
        }
    }

    /// Deliver a completion event to the renderer that owns `generator`.
    ///
    /// Events from a generator that no longer belongs to a live renderer
    /// are dropped.
    pub fn handle_lods_ready(
        &mut self,
        tree: &ObjectTree,
        collection: &mut RenderCollection,
        object: ObjectId,
        generator: GeneratorId,
        generation: u64,
    ) -> bool {
        match self.renderers.get_mut(&object) {
            Some(renderer) if renderer.generator_id() == generator => {
                renderer.on_mesh_ready(tree, collection, generation)
            }
            _ => {
                log::debug!(
                    "Dropping stale LOD event for object {} from {}",
                    object,
                    generator
                );
                false
            }
        }
    }

    /// Shut down and drop the renderer of `object`
    pub fn remove(&mut self, object: ObjectId, collection: &mut RenderCollection) -> bool {
        match self.renderers.remove(&object) {
            Some(renderer) => {
                renderer.shutdown(collection);
                true
            }
            None => false,
        }
    }

    /// Shut down every renderer
    pub fn clear(&mut self, collection: &mut RenderCollection) {
        for (_, renderer) in self.renderers.drain() {
            renderer.shutdown(collection);
        }
    }

    pub fn get(&self, object: ObjectId) -> Option<&ObjectRenderer> {
        self.renderers.get(&object)
    }

    pub fn get_mut(&mut self, object: ObjectId) -> Option<&mut ObjectRenderer> {
        self.renderers.get_mut(&object)
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.renderers.contains_key(&object)
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// True when every renderer is settled; see [`ObjectRenderer::is_settled`]
    pub fn is_idle(&self) -> bool {
        self.renderers.values().all(ObjectRenderer::is_settled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectRenderer> {
        self.renderers.values()
    }
}
