//! Vessel Object Tree
//!
//! Hierarchical vessel model edited by the user:
//! - Stable object identities
//! - Ordered children with single-parent ownership
//! - Typed parameters driving geometry
//! - Physical state (local position relative to the parent)

use std::fmt;

use ahash::AHashMap;
use glam::Vec3;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{CoreError, CoreResult};

/// Stable identity of an object within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Create an id from a raw index
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw index
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Object type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// Top-level vessel or sub-vessel
    Vessel,
    /// Propellant tank, fuel or oxidizer
    FuelTank,
    /// Rocket engine
    Engine,
    /// Any other type, kept by its tag
    Generic(String),
}

impl ObjectType {
    /// Parse a type tag
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "vessel" => Self::Vessel,
            "fuel_tank" => Self::FuelTank,
            "rocket_engine" => Self::Engine,
            other => Self::Generic(other.to_string()),
        }
    }

    /// The type tag string
    pub fn tag(&self) -> &str {
        match self {
            Self::Vessel => "vessel",
            Self::FuelTank => "fuel_tank",
            Self::Engine => "rocket_engine",
            Self::Generic(tag) => tag,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Value of an object parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Variable {
    /// Numeric value; booleans read as 0/1
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            Self::Text(_) => None,
        }
    }

    /// Boolean value; non-zero floats read as true
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Float(value) => Some(*value != 0.0),
            Self::Text(_) => None,
        }
    }
}

impl From<f64> for Variable {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Variable {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Variable {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Ordered parameter table of an object
pub type Parameters = IndexMap<String, Variable>;

/// Physical state of an object relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateVector {
    /// Local position
    pub position: Vec3,
}

/// A node of the vessel tree
#[derive(Debug, Clone)]
pub struct Object {
    id: ObjectId,
    name: String,
    object_type: ObjectType,
    parameters: Parameters,
    state: StateVector,
    parent: Option<ObjectId>,
    children: SmallVec<[ObjectId; 8]>,
    /// Bumped on every geometry-affecting edit
    revision: u64,
}

impl Object {
    fn new(id: ObjectId, name: String, object_type: ObjectType, parent: Option<ObjectId>) -> Self {
        Self {
            id,
            name,
            object_type,
            parameters: Parameters::new(),
            state: StateVector::default(),
            parent,
            children: SmallVec::new(),
            revision: 0,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Look up a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&Variable> {
        self.parameters.get(name)
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    /// Local position relative to the parent
    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Children in order
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn children_count(&self) -> usize {
        self.children.len()
    }

    /// Get the child at `index`
    pub fn child(&self, index: usize) -> Option<ObjectId> {
        self.children.get(index).copied()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether this is a fuel tank holding oxidizer
    pub fn is_oxidizer_tank(&self) -> bool {
        self.object_type == ObjectType::FuelTank
            && self
                .parameter("is_oxidizer")
                .and_then(Variable::as_bool)
                .unwrap_or(false)
    }
}

/// Tree of vessel objects
pub struct ObjectTree {
    objects: AHashMap<ObjectId, Object>,
    /// Objects without a parent, in insertion order
    roots: Vec<ObjectId>,
    next_id: u32,
}

impl ObjectTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            objects: AHashMap::new(),
            roots: Vec::new(),
            next_id: 0,
        }
    }

    /// Add a new object as the last child of `parent`, or as a root
    pub fn add_object(
        &mut self,
        parent: Option<ObjectId>,
        name: impl Into<String>,
        object_type: ObjectType,
    ) -> CoreResult<ObjectId> {
        if let Some(parent) = parent {
            if !self.objects.contains_key(&parent) {
                return Err(CoreError::UnknownObject(parent));
            }
        }

        let id = ObjectId::new(self.next_id);
        self.next_id += 1;
        self.objects
            .insert(id, Object::new(id, name.into(), object_type, parent));

        match parent.and_then(|p| self.objects.get_mut(&p)) {
            Some(parent_object) => parent_object.children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Remove an object with its whole subtree.
    ///
    /// Returns the removed ids with children before their parents.
    pub fn remove_object(&mut self, id: ObjectId) -> CoreResult<Vec<ObjectId>> {
        let parent = self.get(id)?.parent;
        match parent.and_then(|p| self.objects.get_mut(&p)) {
            Some(parent_object) => parent_object.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }

        let mut removed = Vec::new();
        self.collect_post_order(id, &mut removed);
        for removed_id in &removed {
            self.objects.remove(removed_id);
        }
        Ok(removed)
    }

    fn collect_post_order(&self, id: ObjectId, result: &mut Vec<ObjectId>) {
        if let Some(object) = self.objects.get(&id) {
            for &child in &object.children {
                self.collect_post_order(child, result);
            }
            result.push(id);
        }
    }

    /// Move `child` under `parent` (appended last), or make it a root
    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> CoreResult<()> {
        let old_parent = self.get(child)?.parent;
        if let Some(parent) = parent {
            self.get(parent)?;
            if parent == child || self.descendants(child).contains(&parent) {
                return Err(CoreError::CyclicParent { child, parent });
            }
        }

        match old_parent.and_then(|p| self.objects.get_mut(&p)) {
            Some(old) => old.children.retain(|c| *c != child),
            None => self.roots.retain(|r| *r != child),
        }
        match parent.and_then(|p| self.objects.get_mut(&p)) {
            Some(new) => new.children.push(child),
            None => self.roots.push(child),
        }
        if let Some(object) = self.objects.get_mut(&child) {
            object.parent = parent;
        }
        Ok(())
    }

    /// Get an object
    pub fn get(&self, id: ObjectId) -> CoreResult<&Object> {
        self.objects.get(&id).ok_or(CoreError::UnknownObject(id))
    }

    fn get_mut(&mut self, id: ObjectId) -> CoreResult<&mut Object> {
        self.objects.get_mut(&id).ok_or(CoreError::UnknownObject(id))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Parent of an object, `None` for roots and unknown ids
    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects.get(&id).and_then(|o| o.parent)
    }

    /// Ordered children of an object, empty for unknown ids
    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.objects.get(&id).map(|o| o.children()).unwrap_or(&[])
    }

    /// Root objects
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    /// All descendants of an object, depth-first pre-order
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut descendants = Vec::new();
        self.collect_descendants(id, &mut descendants);
        descendants
    }

    fn collect_descendants(&self, id: ObjectId, result: &mut Vec<ObjectId>) {
        for &child in self.children(id) {
            result.push(child);
            self.collect_descendants(child, result);
        }
    }

    /// Set a parameter, bumping the object's revision
    pub fn set_parameter(
        &mut self,
        id: ObjectId,
        name: impl Into<String>,
        value: impl Into<Variable>,
    ) -> CoreResult<()> {
        let object = self.get_mut(id)?;
        object.parameters.insert(name.into(), value.into());
        object.revision += 1;
        Ok(())
    }

    /// Set the local position
    pub fn set_position(&mut self, id: ObjectId, position: Vec3) -> CoreResult<()> {
        self.get_mut(id)?.state.position = position;
        Ok(())
    }

    /// Number of objects in the tree
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over all objects in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }
}

impl Default for ObjectTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> (ObjectTree, ObjectId, ObjectId, ObjectId) {
        let mut tree = ObjectTree::new();
        let vessel = tree.add_object(None, "Vessel", ObjectType::Vessel).unwrap();
        let tank = tree.add_object(Some(vessel), "Tank", ObjectType::FuelTank).unwrap();
        let engine = tree.add_object(Some(tank), "Engine", ObjectType::Engine).unwrap();
        (tree, vessel, tank, engine)
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(ObjectType::from_tag("fuel_tank"), ObjectType::FuelTank);
        assert_eq!(ObjectType::from_tag("rocket_engine").tag(), "rocket_engine");
        assert_eq!(
            ObjectType::from_tag("static_body"),
            ObjectType::Generic("static_body".to_string())
        );
    }

    #[test]
    fn test_add_object() {
        let (tree, vessel, tank, engine) = sample_tree();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.roots(), &[vessel]);
        assert_eq!(tree.parent(tank), Some(vessel));
        assert_eq!(tree.get(vessel).unwrap().child(0), Some(tank));
        assert_eq!(tree.get(tank).unwrap().children_count(), 1);
        assert_eq!(tree.children(tank), &[engine]);
    }

    #[test]
    fn test_add_object_unknown_parent() {
        let mut tree = ObjectTree::new();
        let result = tree.add_object(Some(ObjectId::new(7)), "Orphan", ObjectType::Vessel);
        assert!(matches!(result, Err(CoreError::UnknownObject(_))));
    }

    #[test]
    fn test_remove_subtree() {
        let (mut tree, vessel, tank, engine) = sample_tree();
        let removed = tree.remove_object(tank).unwrap();
        assert_eq!(removed, vec![engine, tank]);
        assert_eq!(tree.len(), 1);
        assert!(tree.children(vessel).is_empty());
        assert!(!tree.contains(engine));
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let (mut tree, vessel, _tank, engine) = sample_tree();
        let result = tree.set_parent(vessel, Some(engine));
        assert!(matches!(result, Err(CoreError::CyclicParent { .. })));
        assert!(tree.set_parent(vessel, Some(vessel)).is_err());
    }

    #[test]
    fn test_set_parent_moves_child() {
        let (mut tree, vessel, tank, engine) = sample_tree();
        tree.set_parent(engine, Some(vessel)).unwrap();
        assert_eq!(tree.children(vessel), &[tank, engine]);
        assert!(tree.children(tank).is_empty());

        tree.set_parent(engine, None).unwrap();
        assert_eq!(tree.roots(), &[vessel, engine]);
        assert_eq!(tree.parent(engine), None);
    }

    #[test]
    fn test_descendants_pre_order() {
        let (mut tree, vessel, tank, engine) = sample_tree();
        let second = tree.add_object(Some(vessel), "Second", ObjectType::FuelTank).unwrap();
        assert_eq!(tree.descendants(vessel), vec![tank, engine, second]);
    }

    #[test]
    fn test_parameters_bump_revision() {
        let (mut tree, _vessel, tank, _engine) = sample_tree();
        assert_eq!(tree.get(tank).unwrap().revision(), 0);

        tree.set_parameter(tank, "radius", 1.5).unwrap();
        tree.set_parameter(tank, "is_oxidizer", true).unwrap();

        let object = tree.get(tank).unwrap();
        assert_eq!(object.revision(), 2);
        assert_eq!(object.parameter("radius"), Some(&Variable::Float(1.5)));
        assert!(object.is_oxidizer_tank());
    }

    #[test]
    fn test_oxidizer_only_for_tanks() {
        let (mut tree, _vessel, _tank, engine) = sample_tree();
        tree.set_parameter(engine, "is_oxidizer", true).unwrap();
        assert!(!tree.get(engine).unwrap().is_oxidizer_tank());
    }

    #[test]
    fn test_set_position() {
        let (mut tree, vessel, _tank, _engine) = sample_tree();
        tree.set_position(vessel, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(tree.get(vessel).unwrap().position(), Vec3::new(1.0, 2.0, 3.0));
    }
}
