//! Scoped bump-arena discipline for per-ray/per-shading-call graph nodes.
//!
//! Every arena here is single-owner and is reset, never freed piecemeal:
//! `reset()` invalidates every value the arena ever handed out in one call,
//! without touching the atomic refcounts on the shared scene graph.

use bumpalo::Bump;

/// Scoped allocator for `Hit` records produced during one `Shape::trace`.
pub struct ShapeHitAllocator(Bump);

impl ShapeHitAllocator {
    pub fn new() -> Self {
        ShapeHitAllocator(Bump::new())
    }

    pub fn bump(&self) -> &Bump {
        &self.0
    }

    pub fn reset(&mut self) {
        self.0.reset();
    }
}

impl Default for ShapeHitAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped allocator for transient `BSDF` instances, bound to one shading
/// call. BSDFs allocated here borrow scene-graph data; they never outlive
/// the interaction that created them.
pub struct BsdfAllocator(Bump);

impl BsdfAllocator {
    pub fn new() -> Self {
        BsdfAllocator(Bump::new())
    }

    pub fn bump(&self) -> &Bump {
        &self.0
    }

    pub fn reset(&mut self) {
        self.0.reset();
    }
}

impl Default for BsdfAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped allocator for transient texture-coordinate payloads.
pub struct TextureCoordinateAllocator(Bump);

impl TextureCoordinateAllocator {
    pub fn new() -> Self {
        TextureCoordinateAllocator(Bump::new())
    }

    pub fn bump(&self) -> &Bump {
        &self.0
    }

    pub fn reset(&mut self) {
        self.0.reset();
    }
}

impl Default for TextureCoordinateAllocator {
    fn default() -> Self {
        Self::new()
    }
}
