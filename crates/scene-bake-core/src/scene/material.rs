//! Surface materials as a flat property table

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standard property names
pub mod names {
    pub const EMISSIVE: &str = "Emissive";
    pub const EMISSIVE_FACTOR: &str = "EmissiveFactor";
    pub const AMBIENT: &str = "Ambient";
    pub const AMBIENT_FACTOR: &str = "AmbientFactor";
    pub const DIFFUSE: &str = "Diffuse";
    pub const DIFFUSE_FACTOR: &str = "DiffuseFactor";
    pub const SPECULAR: &str = "Specular";
    pub const SPECULAR_FACTOR: &str = "SpecularFactor";
    pub const SHININESS: &str = "Shininess";
}

/// Value of a material property
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// RGB triple
    Color(DVec3),
    Scalar(f64),
}

/// A named property plus any textures connected to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperty {
    pub value: PropertyValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceMaterial {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, MaterialProperty>,
}

impl SurfaceMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property insert
    pub fn with_property(mut self, name: &str, value: PropertyValue) -> Self {
        self.properties.insert(
            name.to_string(),
            MaterialProperty {
                value,
                textures: Vec::new(),
            },
        );
        self
    }

    /// Attach a texture to an existing property
    pub fn with_texture(mut self, name: &str, texture: impl Into<String>) -> Self {
        if let Some(property) = self.properties.get_mut(name) {
            property.textures.push(texture.into());
        }
        self
    }

    pub fn property(&self, name: &str) -> Option<&MaterialProperty> {
        self.properties.get(name)
    }

    /// Property value as a colour; a scalar is broadcast to grey
    pub fn color(&self, name: &str) -> Option<DVec3> {
        self.property(name).map(|property| match property.value {
            PropertyValue::Color(color) => color,
            PropertyValue::Scalar(value) => DVec3::splat(value),
        })
    }

    /// Property value as a scalar; a colour yields its first component
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.property(name).map(|property| match property.value {
            PropertyValue::Color(color) => color.x,
            PropertyValue::Scalar(value) => value,
        })
    }

    /// First texture connected to a property
    pub fn texture(&self, name: &str) -> Option<&str> {
        self.property(name)
            .and_then(|property| property.textures.first())
            .map(String::as_str)
    }
}
