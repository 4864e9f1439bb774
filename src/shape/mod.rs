//! Shape graph: a polymorphic surface
//! capability set, traced into a singly-linked list of `Hit` records inside
//! a bump arena owned by the caller of `trace`.
//!
//! `Hit::point` is the **model**-hit-point, in the frame of `Hit::shape`
//! itself — not necessarily world space. An `Instance` is a `Shape` whose
//! model frame is its child's local frame; it resolves world-space queries
//! (`normal`, `to_world_point`) by composing its own transform with the
//! child's answer, so a caller never needs to track a transform stack by
//! hand. `sample_face` is the one query specified to hand back an
//! immediately usable point (it feeds direct-lighting sampling), so shapes
//! resolve it to world space themselves rather than deferring that to the
//! caller.

pub mod csg;
pub mod instance;
pub mod sphere;
pub mod triangle;

use crate::arena::ShapeHitAllocator;
use crate::geometry::{BoundingBox, Normal, Point, Ray, Transform};
use crate::rng::Rand;
use crate::shading::maps::{SharedNormalMap, SharedTextureCoordMap, TexCoord};
use crate::shading::material::{SharedEmissiveMaterial, SharedMaterial};

pub type Face = u8;
pub const FACE_FRONT: Face = 0;
pub const FACE_BACK: Face = 1;

/// One confirmed intersection, linked to the next-farthest hit in the same
/// `trace` call. Stored in a bump arena (`ShapeHitAllocator`) owned by the
/// tracer; the list is sorted by ascending `distance`.
pub struct Hit<'a> {
    pub shape: &'a dyn Shape,
    pub face: Face,
    pub distance: f32,
    pub point: Point,
    pub texcoord: TexCoord,
    pub next: Option<&'a Hit<'a>>,
}

pub type HitList<'a> = Option<&'a Hit<'a>>;

/// Appends `head` in front of `rest`, returning the new list head — the
/// arena-list equivalent of `Vec::push` for prepending in distance order.
pub fn cons<'a>(alloc: &'a ShapeHitAllocator, hit: Hit<'a>) -> &'a Hit<'a> {
    alloc.bump().alloc(hit)
}

/// Merges two hit lists, each already sorted by ascending distance, into
/// one sorted list (stable on ties, `a` before `b`). Used by CSG nodes and
/// by `Scene::trace` when collecting across top-level shapes.
pub fn merge_sorted<'a>(alloc: &'a ShapeHitAllocator, a: HitList<'a>, b: HitList<'a>) -> HitList<'a> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (Some(x), Some(y)) => {
            if x.distance <= y.distance {
                let rest = merge_sorted(alloc, x.next, Some(y));
                Some(cons(
                    alloc,
                    Hit {
                        shape: x.shape,
                        face: x.face,
                        distance: x.distance,
                        point: x.point,
                        texcoord: x.texcoord,
                        next: rest,
                    },
                ))
            } else {
                let rest = merge_sorted(alloc, Some(x), y.next);
                Some(cons(
                    alloc,
                    Hit {
                        shape: y.shape,
                        face: y.face,
                        distance: y.distance,
                        point: y.point,
                        texcoord: y.texcoord,
                        next: rest,
                    },
                ))
            }
        }
    }
}

pub trait Shape: Send + Sync {
    fn trace<'a>(&'a self, ray: &Ray, alloc: &'a ShapeHitAllocator) -> HitList<'a>;

    /// Bounds in the space reached by transforming through `model_to_world`
    /// (identity for a shape traced in its own frame).
    fn bounds(&self, model_to_world: &Transform) -> BoundingBox;

    /// World-space shading normal at a model-space `point`/`face`.
    fn normal(&self, point: Point, face: Face) -> Normal;

    /// Maps a model-space point (as stored in `Hit::point`) to world space.
    /// Identity for shapes with no transform of their own.
    fn to_world_point(&self, point: Point) -> Point {
        point
    }

    fn material(&self, face: Face) -> Option<SharedMaterial>;

    fn emissive(&self, face: Face) -> Option<SharedEmissiveMaterial>;

    /// Uniformly samples a world-space point on `face`, for light-source
    /// area sampling.
    fn sample_face(&self, face: Face, rng: &mut dyn Rand) -> Point;

    /// Solid-angle pdf of having sampled the direction from `ray.origin`
    /// that resulted in a hit on `face` at `distance`.
    fn pdf_solid_angle(&self, ray: &Ray, distance: f32, face: Face) -> f32;

    fn normal_map(&self, face: Face) -> Option<SharedNormalMap>;

    fn texture_coord_map(&self, face: Face) -> Option<SharedTextureCoordMap>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector;
    use crate::shape::sphere::Sphere;
    use crate::spectrum::ConstantReflector;
    use std::sync::Arc;

    fn unit_sphere_material() -> SharedMaterial {
        Arc::new(crate::shading::material::LambertianMaterial {
            reflectance: Arc::new(ConstantReflector::new(0.5).unwrap()),
        })
    }

    #[test]
    fn merge_sorted_interleaves_by_distance() {
        let sphere_a = Sphere::new(1.0, unit_sphere_material(), None, None);
        let sphere_b = Sphere::new(1.0, unit_sphere_material(), None, None);
        let alloc = ShapeHitAllocator::new();
        let h1 = cons(
            &alloc,
            Hit {
                shape: &sphere_a,
                face: FACE_FRONT,
                distance: 1.0,
                point: Point::new(0.0, 0.0, 0.0),
                texcoord: TexCoord::None,
                next: None,
            },
        );
        let h3 = cons(
            &alloc,
            Hit {
                shape: &sphere_a,
                face: FACE_FRONT,
                distance: 3.0,
                point: Point::new(0.0, 0.0, 0.0),
                texcoord: TexCoord::None,
                next: None,
            },
        );
        let h2 = cons(
            &alloc,
            Hit {
                shape: &sphere_b,
                face: FACE_FRONT,
                distance: 2.0,
                point: Point::new(0.0, 0.0, 0.0),
                texcoord: TexCoord::None,
                next: None,
            },
        );
        let a_list = Some(cons(
            &alloc,
            Hit {
                shape: &sphere_a,
                face: FACE_FRONT,
                distance: 1.0,
                point: Point::new(0.0, 0.0, 0.0),
                texcoord: TexCoord::None,
                next: Some(h3),
            },
        ));
        let _ = h1;
        let b_list = Some(h2);
        let merged = merge_sorted(&alloc, a_list, b_list);
        let distances: Vec<f32> = {
            let mut out = Vec::new();
            let mut cur = merged;
            while let Some(h) = cur {
                out.push(h.distance);
                cur = h.next;
            }
            out
        };
        assert_eq!(distances, vec![1.0, 2.0, 3.0]);
        let _ = Vector::new(0.0, 0.0, 0.0);
    }
}
