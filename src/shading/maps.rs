//! Normal maps and texture-coordinate maps: the payload a shape emits at a hit is a
//! tagged sum type, not an opaque blob, so a BSDF that doesn't recognise a
//! coordinate kind can simply fall back to an untextured response.

use std::sync::Arc;

use crate::geometry::{orthonormal_basis, Normal};
use crate::mipmap::FloatMipmap;

/// The texture-coordinate payload carried by a `Hit`. `Reserved` stands in
/// for coordinate kinds a future shape variant might add; consumers that
/// don't recognise a kind treat it like `None`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TexCoord {
    None,
    Uv { u: f32, v: f32 },
    Reserved,
}

impl TexCoord {
    pub fn uv(self) -> Option<(f32, f32)> {
        match self {
            TexCoord::Uv { u, v } => Some((u, v)),
            _ => None,
        }
    }
}

/// Perturbs a geometric/shading normal using a texture-coordinate-indexed
/// signal. Returns the input normal unchanged for coordinate kinds it
/// doesn't recognise.
pub trait NormalMap: Send + Sync {
    fn perturb(&self, shading_normal: Normal, texcoord: TexCoord) -> Normal;
}

pub type SharedNormalMap = Arc<dyn NormalMap>;

/// Bump map: perturbs the shading normal along the gradient of a scalar
/// height field sampled via finite differences, in the tangent frame of
/// the unperturbed normal (a standard bump-mapping construction).
pub struct BumpMap {
    heights: FloatMipmap,
    scale: f32,
}

impl BumpMap {
    pub fn new(heights: FloatMipmap, scale: f32) -> Self {
        BumpMap { heights, scale }
    }

    fn height(&self, u: f32, v: f32) -> f32 {
        self.heights.lookup(u, v, 0.0, 0.0, 0.0, 0.0).unwrap_or(0.0)
    }
}

impl NormalMap for BumpMap {
    fn perturb(&self, shading_normal: Normal, texcoord: TexCoord) -> Normal {
        let Some((u, v)) = texcoord.uv() else {
            return shading_normal;
        };
        const EPS: f32 = 1.0 / 1024.0;
        let dhdu = (self.height(u + EPS, v) - self.height(u - EPS, v)) / (2.0 * EPS);
        let dhdv = (self.height(u, v + EPS) - self.height(u, v - EPS)) / (2.0 * EPS);
        let (tangent, bitangent) = orthonormal_basis(shading_normal);
        (shading_normal - self.scale * dhdu * tangent - self.scale * dhdv * bitangent).normalized()
    }
}

/// Produces the texture-coordinate payload a BSDF/normal-map consumes at a
/// hit; shapes that already compute UV (triangles, spheres) feed it here
/// unchanged, so the default implementation is identity.
pub trait TextureCoordMap: Send + Sync {
    fn map(&self, shape_emitted: TexCoord) -> TexCoord;
}

pub type SharedTextureCoordMap = Arc<dyn TextureCoordMap>;

pub struct IdentityTextureCoordMap;

impl TextureCoordMap for IdentityTextureCoordMap {
    fn map(&self, shape_emitted: TexCoord) -> TexCoord {
        shape_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mipmap::{FilterMode, WrapMode};

    #[test]
    fn identity_texture_coord_map_passes_through() {
        let map = IdentityTextureCoordMap;
        let tc = TexCoord::Uv { u: 0.3, v: 0.7 };
        assert_eq!(map.map(tc), tc);
    }

    #[test]
    fn bump_map_is_identity_on_flat_field() {
        let heights = FloatMipmap::build(vec![0.0; 4], 2, 2, WrapMode::Repeat, FilterMode::None, 16.0).unwrap();
        let bump = BumpMap::new(heights, 1.0);
        let n = Normal::new(0.0, 0.0, 1.0);
        let perturbed = bump.perturb(n, TexCoord::Uv { u: 0.5, v: 0.5 });
        assert!((perturbed - n).mag() < 1e-3);
    }

    #[test]
    fn bump_map_falls_back_without_uv() {
        let heights = FloatMipmap::build(vec![0.0, 1.0, 0.0, 1.0], 2, 2, WrapMode::Repeat, FilterMode::None, 16.0).unwrap();
        let bump = BumpMap::new(heights, 1.0);
        let n = Normal::new(0.0, 0.0, 1.0);
        assert_eq!(bump.perturb(n, TexCoord::None), n);
    }
}
