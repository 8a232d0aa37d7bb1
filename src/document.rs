//! Shapes shared by the editor and the world config endpoints.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z))
    }
}

/// One placed markup document as stored in a world's
/// `mmlDocumentsConfiguration.mmlDocuments`. Rotation is in degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub url: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_defaults() {
        let parsed: DocumentDescriptor =
            serde_json::from_value(json!({ "url": "https://x/a.html", "position": { "y": 2 } }))
                .unwrap();
        assert_eq!(parsed.position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(parsed.rotation, Vec3::ZERO);
    }
}
