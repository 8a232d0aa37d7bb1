//! Client-side editing model.
//!
//! Everything here is sans-IO: the controller and panels react to events the
//! host feeds them (pointer updates, keystrokes, timer ticks, settled
//! requests) and talk to the outside world only through the narrow traits in
//! [`scene`] and [`placement`]. The markup runtime, renderer and DOM stay on
//! the host side.

use serde::Serialize;

pub use crate::document::{DocumentDescriptor, Vec3};

pub mod browser;
pub mod documents;
pub mod mode;
pub mod panel;
pub mod placement;
pub mod scene;
pub mod thumbnails;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error("Editor has been disposed")]
    Disposed,

    #[error("Scene error: {0}")]
    Scene(String),

    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Thumbnail render failed: {0}")]
    Thumbnail(String),
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;

/// Opaque key of a placed document in the host's document tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved pointer hit. Rotation is in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
}

/// What move and create callbacks receive. Rotation is in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlacementEvent {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl PlacementEvent {
    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            position: transform.position,
            rotation: transform.rotation.map(f64::to_degrees),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_event_converts_rotation_to_degrees() {
        let event = PlacementEvent::from_transform(&Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.0, FRAC_PI_2, PI),
        });
        assert_eq!(event.position, Vec3::new(1.0, 2.0, 3.0));
        assert!((event.rotation.y - 90.0).abs() < 1e-9);
        assert!((event.rotation.z - 180.0).abs() < 1e-9);
    }
}
