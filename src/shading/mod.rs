//! Shading graph capability set: BSDFs,
//! materials, lights, and the normal/texture-coordinate maps a shape's hit
//! payload flows through before reaching a BSDF.

pub mod bsdf;
pub mod light;
pub mod material;
pub mod maps;

use crate::geometry::{Normal, Point, Vector};
use crate::shading::maps::TexCoord;

/// The material-facing view of a hit: geometry plus whatever
/// texture-coordinate payload the shape's `TextureCoordMap` produced. The
/// "hit-context" parameter to `Material::sample`/`Light` queries.
#[derive(Clone, Copy, Debug)]
pub struct ShadingContext {
    pub point: Point,
    pub geometric_normal: Normal,
    pub shading_normal: Normal,
    pub texcoord: TexCoord,
    /// Points away from the surface, toward the ray's origin.
    pub wi: Vector,
}
