//! Per-shape instancing transform. When
//! `premultiplied` is false the ray is transformed into the child's model
//! space, traced there, and the resulting hits are re-homed to point back
//! through this `Instance` (so `hit.shape.normal(...)` resolves to world
//! space without the caller tracking a transform stack). When
//! `premultiplied` is true the transform was already folded into the
//! child's own geometry at build time and the ray passes through unchanged
//! — an aggregate shape (CSG, BVH) never carries a premultiplied instance.

use crate::arena::ShapeHitAllocator;
use crate::geometry::{BoundingBox, Normal, Point, Ray, Transform};
use crate::rng::Rand;
use crate::shading::maps::{SharedNormalMap, SharedTextureCoordMap};
use crate::shading::material::{SharedEmissiveMaterial, SharedMaterial};
use crate::shape::{cons, Face, Hit, HitList, Shape};

pub struct Instance {
    pub child: Box<dyn Shape>,
    pub model_to_world: Transform,
    pub premultiplied: bool,
}

impl Instance {
    pub fn new(child: Box<dyn Shape>, model_to_world: Transform, premultiplied: bool) -> Self {
        Instance {
            child,
            model_to_world,
            premultiplied,
        }
    }
}

impl Shape for Instance {
    fn trace<'a>(&'a self, ray: &Ray, alloc: &'a ShapeHitAllocator) -> HitList<'a> {
        if self.premultiplied {
            return self.child.trace(ray, alloc);
        }
        // `inverse_transform_vector` does not renormalise the direction, so
        // a model-space `t` stays numerically equal to the corresponding
        // world-space `t`: for an affine map, `M(o + t*d) = M(o) + t*M(d)`
        // when points and vectors transform through their respective parts.
        let model_ray = self.model_to_world.inverse_transform_ray(ray);
        let child_hits = self.child.trace(&model_ray, alloc);
        let mut hits = Vec::new();
        let mut cur = child_hits;
        while let Some(h) = cur {
            hits.push((h.face, h.distance, h.point, h.texcoord));
            cur = h.next;
        }
        let mut list: HitList<'a> = None;
        for (face, distance, point, texcoord) in hits.into_iter().rev() {
            list = Some(cons(
                alloc,
                Hit {
                    shape: self,
                    face,
                    distance,
                    point,
                    texcoord,
                    next: list,
                },
            ));
        }
        list
    }

    fn bounds(&self, model_to_world: &Transform) -> BoundingBox {
        if self.premultiplied {
            return self.child.bounds(model_to_world);
        }
        let combined = Transform::new(model_to_world.matrix * self.model_to_world.matrix);
        self.child.bounds(&combined)
    }

    fn normal(&self, point: Point, face: Face) -> Normal {
        if self.premultiplied {
            return self.child.normal(point, face);
        }
        self.model_to_world.transform_normal(self.child.normal(point, face)).normalized()
    }

    fn to_world_point(&self, point: Point) -> Point {
        if self.premultiplied {
            return self.child.to_world_point(point);
        }
        self.model_to_world.transform_point(self.child.to_world_point(point))
    }

    fn material(&self, face: Face) -> Option<SharedMaterial> {
        self.child.material(face)
    }

    fn emissive(&self, face: Face) -> Option<SharedEmissiveMaterial> {
        self.child.emissive(face)
    }

    fn sample_face(&self, face: Face, rng: &mut dyn Rand) -> Point {
        let p = self.child.sample_face(face, rng);
        if self.premultiplied {
            p
        } else {
            self.model_to_world.transform_point(p)
        }
    }

    fn pdf_solid_angle(&self, ray: &Ray, distance: f32, face: Face) -> f32 {
        if self.premultiplied {
            return self.child.pdf_solid_angle(ray, distance, face);
        }
        let model_ray = self.model_to_world.inverse_transform_ray(ray);
        self.child.pdf_solid_angle(&model_ray, distance, face)
    }

    fn normal_map(&self, face: Face) -> Option<SharedNormalMap> {
        self.child.normal_map(face)
    }

    fn texture_coord_map(&self, face: Face) -> Option<SharedTextureCoordMap> {
        self.child.texture_coord_map(face)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector;
    use crate::shape::sphere::Sphere;
    use crate::spectrum::ConstantReflector;
    use std::sync::Arc;
    use ultraviolet::Mat4;

    fn material() -> SharedMaterial {
        Arc::new(crate::shading::material::LambertianMaterial {
            reflectance: Arc::new(ConstantReflector::new(0.5).unwrap()),
        })
    }

    #[test]
    fn translated_instance_moves_hit_point() {
        let sphere = Sphere::new(1.0, material(), None, None);
        let transform = Transform::new(Mat4::from_translation(Vector::new(5.0, 0.0, 0.0)));
        let instance = Instance::new(Box::new(sphere), transform, false);
        let alloc = ShapeHitAllocator::new();
        let ray = Ray::new(Point::new(5.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        let hit = instance.trace(&ray, &alloc).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-4);
        let world_point = instance.to_world_point(hit.point);
        assert!((world_point - Point::new(5.0, 0.0, -1.0)).mag() < 1e-4);
    }

    #[test]
    fn premultiplied_instance_passes_ray_through_unchanged() {
        let sphere = Sphere::new(1.0, material(), None, None);
        let transform = Transform::new(Mat4::from_translation(Vector::new(5.0, 0.0, 0.0)));
        let instance = Instance::new(Box::new(sphere), transform, true);
        let alloc = ShapeHitAllocator::new();
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        let hit = instance.trace(&ray, &alloc).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-4);
    }
}
