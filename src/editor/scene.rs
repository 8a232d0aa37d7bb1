//! The scene the ghost preview is mounted into.

use std::collections::{BTreeMap, HashMap};

use super::{EditorError, EditorResult, Transform};

/// What the placement controller needs from a preview scene, and nothing more.
pub trait GhostScene {
    type Handle: Clone + PartialEq + std::fmt::Debug;

    /// Mounts a preview document bound to `url`.
    fn mount(&mut self, url: &str) -> EditorResult<Self::Handle>;
    fn unmount(&mut self, handle: &Self::Handle);
    /// Moves the root every mounted preview hangs off.
    fn set_root_transform(&mut self, transform: &Transform);
    fn dispose(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialStyle {
    pub opacity: f32,
    pub transparent: bool,
}

impl MaterialStyle {
    pub const OPAQUE: MaterialStyle = MaterialStyle {
        opacity: 1.0,
        transparent: false,
    };
    pub const GHOST: MaterialStyle = MaterialStyle {
        opacity: 0.5,
        transparent: true,
    };
}

/// Materials loaded by preview documents, keyed by asset URL.
///
/// Each `PreviewScene` owns one. The main scene has its own, so forcing ghost
/// transparency here never touches placed objects that share an asset.
#[derive(Debug, Default)]
pub struct ResourceCache {
    materials: HashMap<String, MaterialStyle>,
}

impl ResourceCache {
    fn load(&mut self, url: &str) -> &mut MaterialStyle {
        self.materials
            .entry(url.to_string())
            .or_insert(MaterialStyle::OPAQUE)
    }

    pub fn style(&self, url: &str) -> Option<MaterialStyle> {
        self.materials.get(url).copied()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    fn clear(&mut self) {
        self.materials.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct GhostHandle(u64);

/// Isolated scene for ghost previews.
#[derive(Debug, Default)]
pub struct PreviewScene {
    resources: ResourceCache,
    mounted: BTreeMap<GhostHandle, String>,
    root: Transform,
    next_handle: u64,
    disposed: bool,
}

impl PreviewScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resources(&self) -> &ResourceCache {
        &self.resources
    }

    pub fn root(&self) -> &Transform {
        &self.root
    }

    pub fn mounted(&self) -> impl Iterator<Item = &str> {
        self.mounted.values().map(String::as_str)
    }

    /// Re-applies ghost styling to everything mounted. Call once per frame,
    /// since the runtime may swap materials in as assets finish loading.
    pub fn update(&mut self) {
        for url in self.mounted.values() {
            if let Some(style) = self.resources.materials.get_mut(url) {
                *style = MaterialStyle::GHOST;
            }
        }
    }
}

impl GhostScene for PreviewScene {
    type Handle = GhostHandle;

    fn mount(&mut self, url: &str) -> EditorResult<GhostHandle> {
        if self.disposed {
            return Err(EditorError::Disposed);
        }
        if url.is_empty() {
            return Err(EditorError::Scene("Cannot mount a preview without a URL".into()));
        }
        self.next_handle += 1;
        let handle = GhostHandle(self.next_handle);
        *self.resources.load(url) = MaterialStyle::GHOST;
        self.mounted.insert(handle, url.to_string());
        Ok(handle)
    }

    fn unmount(&mut self, handle: &GhostHandle) {
        if let Some(url) = self.mounted.remove(handle) {
            if !self.mounted.values().any(|u| *u == url) {
                self.resources.materials.remove(&url);
            }
        }
    }

    fn set_root_transform(&mut self, transform: &Transform) {
        self.root = *transform;
    }

    fn dispose(&mut self) {
        self.mounted.clear();
        self.resources.clear();
        self.disposed = true;
    }
}

/// Records calls and renders nothing.
#[derive(Debug, Default)]
pub struct NullGhostScene {
    pub mounts: Vec<String>,
    pub unmounts: usize,
    pub root: Option<Transform>,
    pub disposed: bool,
}

impl GhostScene for NullGhostScene {
    type Handle = usize;

    fn mount(&mut self, url: &str) -> EditorResult<usize> {
        if self.disposed {
            return Err(EditorError::Disposed);
        }
        self.mounts.push(url.to_string());
        Ok(self.mounts.len())
    }

    fn unmount(&mut self, _handle: &usize) {
        self.unmounts += 1;
    }

    fn set_root_transform(&mut self, transform: &Transform) {
        self.root = Some(*transform);
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
