//! Keyframe curves for animated node transforms and blend-shape weights

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Trait for types that can be linearly interpolated
pub trait Lerp: Clone {
    /// Linear interpolation between self and other
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for DVec3 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        DVec3::lerp(*self, *other, t)
    }
}

/// How values between two keyframes are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Hold the earlier key's value until the next key
    Constant,
    /// Linear blend between the bracketing keys
    #[default]
    Linear,
}

/// A single keyframe, timed in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T> {
    pub time: f64,
    pub value: T,
}

/// An animation curve sampled by time in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimCurve<T> {
    #[serde(default)]
    pub interpolation: Interpolation,
    pub keys: Vec<Keyframe<T>>,
}

impl<T: Lerp> AnimCurve<T> {
    /// Create a linear curve from `(time, value)` pairs
    pub fn linear(keys: impl IntoIterator<Item = (f64, T)>) -> Self {
        Self {
            interpolation: Interpolation::Linear,
            keys: keys
                .into_iter()
                .map(|(time, value)| Keyframe { time, value })
                .collect(),
        }
    }

    /// Evaluate the curve at `time`, or `None` if it has no keys
    pub fn evaluate(&self, time: f64) -> Option<T> {
        let index = find_key_index(&self.keys, time)?;
        let first = &self.keys[index];

        if index + 1 >= self.keys.len() || time <= first.time {
            return Some(first.value.clone());
        }

        let second = &self.keys[index + 1];
        match self.interpolation {
            Interpolation::Constant => Some(first.value.clone()),
            Interpolation::Linear => {
                let span = second.time - first.time;
                let t = if span > 0.0 {
                    ((time - first.time) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                Some(first.value.lerp(&second.value, t))
            }
        }
    }
}

/// Find the index of the keyframe at or before the given time
///
/// Returns None if there are no keyframes. Times before the first key map
/// to index 0; times at or past the last key map to the last index.
pub fn find_key_index<T>(keys: &[Keyframe<T>], time: f64) -> Option<usize> {
    if keys.is_empty() {
        return None;
    }

    let last_index = keys.len() - 1;
    if time >= keys[last_index].time {
        return Some(last_index);
    }

    // Largest index where keys[index].time <= time
    let mut low = 0;
    let mut high = last_index;

    while low < high {
        let mid = (low + high).div_ceil(2);
        if keys[mid].time <= time {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    Some(low)
}

/// A vector property with an optional animation curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatedVec3 {
    pub value: DVec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<AnimCurve<DVec3>>,
}

impl AnimatedVec3 {
    /// A constant property
    pub fn constant(value: DVec3) -> Self {
        Self { value, curve: None }
    }

    /// Value at `time`; falls back to the static value when not animated
    pub fn evaluate(&self, time: f64) -> DVec3 {
        self.curve
            .as_ref()
            .and_then(|curve| curve.evaluate(time))
            .unwrap_or(self.value)
    }
}
