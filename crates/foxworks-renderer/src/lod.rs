//! LOD Generation
//!
//! Background regeneration of an object's level-of-detail meshes.
//!
//! Each [`LodGenerator`] owns one worker thread. The owning thread installs
//! object snapshots with [`LodGenerator::request_update`]; the worker takes
//! the latest one, evaluates every level from finest to coarsest outside the
//! lock, and abandons the set as soon as a newer snapshot arrives. A fully
//! evaluated set replaces the previous one in a single swap and is announced
//! with [`RenderEvent::LodsReady`].
//!
//! Level 0 is the finest mesh.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use foxworks_core::{
    GeometryError, GeometryEvaluator, Mesh, MeshFlags, ObjectId, ObjectSnapshot, SnapshotSource,
    StopToken, TaskHandle,
};
use parking_lot::Mutex;

use crate::events::{EventSender, RenderEvent};
use crate::{RendererConfig, RendererResult};

static NEXT_GENERATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one generator instance, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratorId(u64);

impl GeneratorId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    fn next() -> Self {
        Self(NEXT_GENERATOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lod-{}", self.0)
    }
}

/// A fully evaluated set of LOD meshes
#[derive(Debug)]
pub struct LodSet {
    generation: u64,
    revision: u64,
    meshes: Vec<Arc<Mesh>>,
}

impl LodSet {
    /// Sequence number of this set within its generator, starting at 1
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Object revision the set was evaluated from
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Mesh of one level
    pub fn mesh(&self, lod: usize) -> Option<&Arc<Mesh>> {
        self.meshes.get(lod)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// State shared between the generator and its worker
struct Shared {
    /// Latest snapshot not yet taken by the worker
    next: Mutex<Option<ObjectSnapshot>>,
    /// Set with `next` under its lock; cleared when the worker takes it
    pending: AtomicBool,
    /// True while the worker evaluates a taken snapshot
    in_flight: AtomicBool,
    /// Most recent fully evaluated set
    completed: Mutex<Option<Arc<LodSet>>>,
    generations: AtomicU64,
}

/// Everything the worker thread needs
struct Worker {
    id: GeneratorId,
    object: ObjectId,
    levels: usize,
    resolutions: Vec<f32>,
    flags: MeshFlags,
    poll_interval: Duration,
    evaluator: Arc<dyn GeometryEvaluator>,
    shared: Arc<Shared>,
    events: EventSender,
}

enum Outcome {
    Completed(Vec<Arc<Mesh>>),
    Superseded { finished_levels: usize },
    Stopped,
    Failed { level: usize, error: GeometryError },
}

impl Worker {
    fn run(self, stop: StopToken) {
        log::debug!("LOD worker {} started for object {}", self.id, self.object);
        while !stop.is_stop_requested() {
            let snapshot = {
                let mut next = self.shared.next.lock();
                let snapshot = next.take();
                if snapshot.is_some() {
                    self.shared.in_flight.store(true, Ordering::Release);
                    self.shared.pending.store(false, Ordering::Release);
                }
                snapshot
            };

            let Some(snapshot) = snapshot else {
                if !stop.idle(self.poll_interval) {
                    break;
                }
                continue;
            };

            match self.generate(&snapshot, &stop) {
                Outcome::Completed(meshes) => self.publish(snapshot.revision(), meshes, &stop),
                Outcome::Superseded { finished_levels } => {
                    log::debug!(
                        "LOD job for object {} aborted after {} of {} levels",
                        self.object,
                        finished_levels,
                        self.levels
                    );
                }
                Outcome::Stopped => {}
                Outcome::Failed { level, error } => {
                    log::warn!(
                        "LOD level {} of object {} failed, keeping previous set: {}",
                        level,
                        self.object,
                        error
                    );
                }
            }
            self.shared.in_flight.store(false, Ordering::Release);
        }
        self.shared.in_flight.store(false, Ordering::Release);
        log::debug!("LOD worker {} exiting", self.id);
    }

    fn generate(&self, snapshot: &ObjectSnapshot, stop: &StopToken) -> Outcome {
        let mut meshes = Vec::with_capacity(self.levels);
        for (level, &resolution) in self.resolutions.iter().enumerate() {
            if stop.is_stop_requested() {
                return Outcome::Stopped;
            }
            if self.shared.pending.load(Ordering::Acquire) {
                return Outcome::Superseded {
                    finished_levels: meshes.len(),
                };
            }

            log::debug!(
                "Generating mesh for object {} level {} at resolution {}",
                self.object,
                level,
                resolution
            );
            // A panicking evaluator fails the level, not the worker.
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                self.evaluator.evaluate(snapshot, resolution, self.flags)
            }))
            .unwrap_or_else(|payload| {
                Err(GeometryError::Evaluation(panic_message(payload.as_ref())))
            });
            match result {
                Ok(mesh) => meshes.push(Arc::new(mesh)),
                Err(error) => return Outcome::Failed { level, error },
            }
        }
        Outcome::Completed(meshes)
    }

    fn publish(&self, revision: u64, meshes: Vec<Arc<Mesh>>, stop: &StopToken) {
        if stop.is_stop_requested() {
            return;
        }
        // A request that arrived during the last level wins; its set follows.
        if self.shared.pending.load(Ordering::Acquire) {
            log::debug!("LOD set for object {} superseded before delivery", self.object);
            return;
        }

        let generation = self.shared.generations.fetch_add(1, Ordering::AcqRel) + 1;
        *self.shared.completed.lock() = Some(Arc::new(LodSet {
            generation,
            revision,
            meshes,
        }));
        self.shared.in_flight.store(false, Ordering::Release);

        log::info!(
            "LODs ready for object {} (generation {}, revision {})",
            self.object,
            generation,
            revision
        );
        self.events.send(RenderEvent::LodsReady {
            object: self.object,
            generator: self.id,
            generation,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("evaluator panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("evaluator panicked: {}", message)
    } else {
        "evaluator panicked".to_string()
    }
}

/// Background generator of one object's LOD meshes
pub struct LodGenerator {
    id: GeneratorId,
    object: ObjectId,
    levels: usize,
    shared: Arc<Shared>,
    task: TaskHandle,
}

impl LodGenerator {
    /// Start a generator and its worker for `object`
    pub fn new(
        object: ObjectId,
        evaluator: Arc<dyn GeometryEvaluator>,
        config: &RendererConfig,
        events: EventSender,
    ) -> RendererResult<Self> {
        config.validate()?;

        let id = GeneratorId::next();
        let shared = Arc::new(Shared {
            next: Mutex::new(None),
            pending: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            completed: Mutex::new(None),
            generations: AtomicU64::new(0),
        });

        let worker = Worker {
            id,
            object,
            levels: config.lod_levels,
            resolutions: (0..config.lod_levels)
                .map(|level| config.lod_resolution(level))
                .collect(),
            flags: config.mesh_flags,
            poll_interval: config.poll_interval(),
            evaluator,
            shared: shared.clone(),
            events,
        };
        let task = TaskHandle::spawn(format!("lod-{}", object.index()), move |stop| {
            worker.run(stop)
        })?;

        Ok(Self {
            id,
            object,
            levels: config.lod_levels,
            shared,
            task,
        })
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }

    /// Number of levels per set, fixed at construction
    pub fn num_lods(&self) -> usize {
        self.levels
    }

    /// Whether the worker is alive and has not been told to stop
    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    /// Ask for a fresh set built from the object's current state.
    ///
    /// Replaces any snapshot the worker has not taken yet. Returns `false`
    /// if the worker is not running or the object no longer exists.
    pub fn request_update(&self, source: &dyn SnapshotSource) -> bool {
        if !self.is_running() {
            log::debug!("Ignoring LOD request for object {}: worker stopped", self.object);
            return false;
        }

        {
            let mut next = self.shared.next.lock();
            let Some(snapshot) = source.snapshot(self.object) else {
                return false;
            };
            *next = Some(snapshot);
            self.shared.pending.store(true, Ordering::Release);
        }
        self.task.wake();
        true
    }

    /// True when a regeneration is queued or being evaluated
    pub fn is_busy(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire) || self.shared.in_flight.load(Ordering::Acquire)
    }

    /// True when the latest completed set is current and readable
    pub fn is_ready(&self) -> bool {
        self.ready_set().is_some()
    }

    /// The latest completed set, unless a regeneration is queued or running
    /// or the worker is stopped.
    ///
    /// Read every level from one returned set to never mix generations.
    pub fn ready_set(&self) -> Option<Arc<LodSet>> {
        if !self.is_running() || self.is_busy() {
            return None;
        }
        self.shared.completed.lock().clone()
    }

    /// Mesh of level `lod` from the latest completed set.
    ///
    /// Returns `None` whenever [`ready_set`](Self::ready_set) does, or when
    /// `lod` is out of range.
    pub fn get_mesh(&self, lod: usize) -> Option<Arc<Mesh>> {
        self.ready_set().and_then(|set| set.mesh(lod).cloned())
    }

    /// Latest completed set regardless of pending work; may be stale
    pub fn last_completed(&self) -> Option<Arc<LodSet>> {
        self.shared.completed.lock().clone()
    }

    /// Number of sets completed so far
    pub fn completed_generation(&self) -> u64 {
        self.shared.generations.load(Ordering::Acquire)
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// No completion event is posted once this returns.
    pub fn shutdown(&mut self) -> bool {
        self.task.shutdown()
    }
}

impl fmt::Debug for LodGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LodGenerator")
            .field("id", &self.id)
            .field("object", &self.object)
            .field("levels", &self.levels)
            .field("generation", &self.completed_generation())
            .finish()
    }
}
