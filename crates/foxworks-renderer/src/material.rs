//! Materials
//!
//! Flat diffuse materials chosen by object type.

use foxworks_core::{Object, ObjectType};
use glam::Vec4;

/// Diffuse material of one LOD batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Diffuse color (RGBA)
    pub diffuse: Vec4,
}

impl Material {
    /// Neutral grey used for untyped geometry and placeholders
    pub const DEFAULT: Self = Self::rgb(0.75, 0.75, 0.75);
    /// Oxidizer tanks
    pub const OXIDIZER: Self = Self::rgb(0.0, 0.0, 1.0);
    /// Fuel tanks
    pub const FUEL: Self = Self::rgb(1.0, 1.0, 0.0);

    /// Opaque material from RGB components
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            diffuse: Vec4::new(r, g, b, 1.0),
        }
    }

    /// Material for an object's geometry
    pub fn for_object(object: &Object) -> Self {
        match object.object_type() {
            ObjectType::FuelTank if object.is_oxidizer_tank() => Self::OXIDIZER,
            ObjectType::FuelTank => Self::FUEL,
            _ => Self::DEFAULT,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foxworks_core::ObjectTree;

    #[test]
    fn test_material_by_type() {
        let mut tree = ObjectTree::new();
        let vessel = tree.add_object(None, "Vessel", ObjectType::Vessel).unwrap();
        let fuel = tree.add_object(Some(vessel), "Fuel", ObjectType::FuelTank).unwrap();
        let oxidizer = tree.add_object(Some(vessel), "LOX", ObjectType::FuelTank).unwrap();
        tree.set_parameter(oxidizer, "is_oxidizer", true).unwrap();

        assert_eq!(Material::for_object(tree.get(vessel).unwrap()), Material::DEFAULT);
        assert_eq!(Material::for_object(tree.get(fuel).unwrap()), Material::FUEL);
        assert_eq!(Material::for_object(tree.get(oxidizer).unwrap()), Material::OXIDIZER);
    }
}
