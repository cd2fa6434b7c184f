//! Material baking into flat colour and texture tables

use crate::scene::material::names;
use crate::scene::{MaterialId, SurfaceMaterial};
use glam::DVec3;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// One baked colour channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorChannel {
    /// RGBA, alpha always 1
    pub color: [f32; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
}

impl ColorChannel {
    fn bake(material: &SurfaceMaterial, property: &str, factor: &str) -> Self {
        let color = material.color(property).unwrap_or(DVec3::ZERO);
        let factor = material.scalar(factor).unwrap_or(1.0);
        let color = color * factor;

        Self {
            color: [color.x as f32, color.y as f32, color.z as f32, 1.0],
            texture: material.texture(property).map(str::to_string),
        }
    }
}

/// Flat property table for one material
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BakedMaterial {
    pub name: String,
    pub emissive: ColorChannel,
    pub ambient: ColorChannel,
    pub diffuse: ColorChannel,
    pub specular: ColorChannel,
    pub shininess: f32,
}

/// Bake the four colour channels and shininess of a material
///
/// A missing colour is black, a missing factor is 1.
pub fn bake_material(material: &SurfaceMaterial) -> BakedMaterial {
    BakedMaterial {
        name: material.name.clone(),
        emissive: ColorChannel::bake(material, names::EMISSIVE, names::EMISSIVE_FACTOR),
        ambient: ColorChannel::bake(material, names::AMBIENT, names::AMBIENT_FACTOR),
        diffuse: ColorChannel::bake(material, names::DIFFUSE, names::DIFFUSE_FACTOR),
        specular: ColorChannel::bake(material, names::SPECULAR, names::SPECULAR_FACTOR),
        shininess: material.scalar(names::SHININESS).unwrap_or(0.0) as f32,
    }
}

/// Bake-once cache for one bake pass
///
/// Shared between mesh workers; the first worker to bake a material wins
/// and later requests reuse its result.
#[derive(Debug, Default)]
pub struct MaterialCache {
    baked: Mutex<BTreeMap<MaterialId, BakedMaterial>>,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached material, baking it on first request
    pub fn get_or_bake(&self, id: MaterialId, material: &SurfaceMaterial) -> BakedMaterial {
        let mut baked = self.baked.lock().unwrap_or_else(PoisonError::into_inner);
        baked
            .entry(id)
            .or_insert_with(|| {
                debug!("Baked material {id} '{}'", material.name);
                bake_material(material)
            })
            .clone()
    }

    /// Bake a material unless it is already cached
    ///
    /// Returns whether this call baked it. Nothing is cloned out of the cache.
    pub fn ensure_baked(&self, id: MaterialId, material: &SurfaceMaterial) -> bool {
        let mut baked = self.baked.lock().unwrap_or_else(PoisonError::into_inner);
        if baked.contains_key(&id) {
            return false;
        }
        debug!("Baked material {id} '{}'", material.name);
        baked.insert(id, bake_material(material));
        true
    }

    /// Whether a material has been baked in this pass
    pub fn contains(&self, id: MaterialId) -> bool {
        self.baked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.baked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand the baked table to the caller
    pub fn into_inner(self) -> BTreeMap<MaterialId, BakedMaterial> {
        self.baked
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::PropertyValue;
    use pretty_assertions::assert_eq;

    fn leather() -> SurfaceMaterial {
        SurfaceMaterial::new("Leather")
            .with_property(names::DIFFUSE, PropertyValue::Color(DVec3::new(0.5, 0.25, 1.0)))
            .with_property(names::DIFFUSE_FACTOR, PropertyValue::Scalar(0.5))
            .with_texture(names::DIFFUSE, "leather.png")
            .with_property(names::SPECULAR, PropertyValue::Color(DVec3::ONE))
            .with_property(names::SHININESS, PropertyValue::Scalar(20.0))
    }

    #[test]
    fn test_bake_material() {
        let baked = bake_material(&leather());

        assert_eq!(
            baked.diffuse,
            ColorChannel {
                color: [0.25, 0.125, 0.5, 1.0],
                texture: Some("leather.png".to_string()),
            }
        );
        // No factor means full strength
        assert_eq!(baked.specular.color, [1.0, 1.0, 1.0, 1.0]);
        // No colour means black
        assert_eq!(baked.emissive.color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(baked.ambient.texture, None);
        assert_eq!(baked.shininess, 20.0);
    }

    #[test]
    fn test_cache_bakes_once() {
        let cache = MaterialCache::new();
        assert!(cache.is_empty());

        assert_eq!(cache.get_or_bake(MaterialId(3), &leather()).name, "Leather");
        let again = cache.get_or_bake(MaterialId(3), &SurfaceMaterial::new("Other"));
        assert_eq!(again.name, "Leather");
        assert!(cache.contains(MaterialId(3)));
        assert!(!cache.contains(MaterialId(4)));
        assert_eq!(cache.len(), 1);

        let table = cache.into_inner();
        assert_eq!(table[&MaterialId(3)].name, "Leather");
    }

    #[test]
    fn test_ensure_baked_keeps_first_result() {
        let cache = MaterialCache::new();

        assert!(cache.ensure_baked(MaterialId(1), &leather()));
        assert!(!cache.ensure_baked(MaterialId(1), &SurfaceMaterial::new("Other")));
        assert!(cache.ensure_baked(MaterialId(2), &SurfaceMaterial::new("Other")));
        assert_eq!(cache.len(), 2);

        // A later lookup sees the material baked first
        assert_eq!(cache.get_or_bake(MaterialId(1), &SurfaceMaterial::new("Late")).name, "Leather");
        let table = cache.into_inner();
        assert_eq!(table[&MaterialId(2)].name, "Other");
    }
}
