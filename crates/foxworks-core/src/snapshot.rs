//! Object Snapshots
//!
//! Detached, immutable copies of an object's parameters. Geometry evaluation
//! runs on snapshots so background work never reads the live tree.

use crate::object::{Object, ObjectId, ObjectTree, ObjectType, Parameters, Variable};

/// Immutable copy of one object's geometry-relevant state
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSnapshot {
    object: ObjectId,
    object_type: ObjectType,
    parameters: Parameters,
    revision: u64,
}

impl ObjectSnapshot {
    /// Copy the current state of a live object
    pub fn capture(object: &Object) -> Self {
        Self {
            object: object.id(),
            object_type: object.object_type().clone(),
            parameters: object.parameters().clone(),
            revision: object.revision(),
        }
    }

    /// Id of the object this snapshot was taken from
    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    /// Revision of the object at capture time
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn parameter(&self, name: &str) -> Option<&Variable> {
        self.parameters.get(name)
    }

    /// Numeric parameter value
    pub fn float(&self, name: &str) -> Option<f64> {
        self.parameter(name).and_then(Variable::as_float)
    }
}

/// Produces snapshots of live objects
pub trait SnapshotSource {
    /// Snapshot the object's current state, `None` if it no longer exists
    fn snapshot(&self, id: ObjectId) -> Option<ObjectSnapshot>;
}

impl SnapshotSource for ObjectTree {
    fn snapshot(&self, id: ObjectId) -> Option<ObjectSnapshot> {
        self.get(id).ok().map(ObjectSnapshot::capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_detached() {
        let mut tree = ObjectTree::new();
        let tank = tree.add_object(None, "Tank", ObjectType::FuelTank).unwrap();
        tree.set_parameter(tank, "radius", 2.0).unwrap();

        let snapshot = tree.snapshot(tank).unwrap();
        tree.set_parameter(tank, "radius", 5.0).unwrap();

        assert_eq!(snapshot.float("radius"), Some(2.0));
        assert_eq!(snapshot.revision(), 1);
        assert_eq!(tree.snapshot(tank).unwrap().float("radius"), Some(5.0));
    }

    #[test]
    fn test_snapshot_of_removed_object() {
        let mut tree = ObjectTree::new();
        let tank = tree.add_object(None, "Tank", ObjectType::FuelTank).unwrap();
        tree.remove_object(tank).unwrap();
        assert!(tree.snapshot(tank).is_none());
    }

    #[test]
    fn test_snapshot_is_send() {
        fn assert_send<T: Send + Sync + 'static>() {}
        assert_send::<ObjectSnapshot>();
    }
}
