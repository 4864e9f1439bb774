//! Sphere shape: quadratic-root intersection, emitting both roots as a
//! front/back hit pair (needed for CSG's inside/outside bookkeeping) and
//! centred at the origin of its own model frame (placement/scaling lives
//! in `shape::instance` instead).

use std::f32::consts::TAU;
use std::sync::Arc;

use crate::arena::ShapeHitAllocator;
use crate::geometry::{BoundingBox, Normal, Point, Ray, Transform, Vector};
use crate::rng::Rand;
use crate::shading::maps::{SharedNormalMap, SharedTextureCoordMap, TexCoord};
use crate::shading::material::{SharedEmissiveMaterial, SharedMaterial};
use crate::shape::{cons, Face, Hit, HitList, Shape, FACE_BACK, FACE_FRONT};

pub struct Sphere {
    pub radius: f32,
    pub material: SharedMaterial,
    pub emissive: Option<SharedEmissiveMaterial>,
    pub normal_map: Option<SharedNormalMap>,
}

impl Sphere {
    pub fn new(radius: f32, material: SharedMaterial, emissive: Option<SharedEmissiveMaterial>, normal_map: Option<SharedNormalMap>) -> Self {
        Sphere {
            radius,
            material,
            emissive,
            normal_map,
        }
    }

    fn uv_at(&self, point: Point) -> TexCoord {
        let n = point / self.radius;
        let theta = n.z.clamp(-1.0, 1.0).acos();
        let mut phi = n.y.atan2(n.x);
        if phi < 0.0 {
            phi += TAU;
        }
        TexCoord::Uv {
            u: phi / TAU,
            v: theta / std::f32::consts::PI,
        }
    }
}

impl Shape for Sphere {
    fn trace<'a>(&'a self, ray: &Ray, alloc: &'a ShapeHitAllocator) -> HitList<'a> {
        let oc = ray.origin;
        let a = ray.direction.mag_sq();
        let b = 2.0 * oc.dot(ray.direction);
        let c = oc.mag_sq() - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 || a <= 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let t0 = (-b - sqrt_d) / (2.0 * a);
        let t1 = (-b + sqrt_d) / (2.0 * a);

        let mut list: HitList<'a> = None;
        if t1 >= 0.0 {
            let point = ray.at(t1);
            list = Some(cons(
                alloc,
                Hit {
                    shape: self,
                    face: FACE_BACK,
                    distance: t1,
                    point,
                    texcoord: self.uv_at(point),
                    next: None,
                },
            ));
        }
        if t0 >= 0.0 {
            let point = ray.at(t0);
            list = Some(cons(
                alloc,
                Hit {
                    shape: self,
                    face: FACE_FRONT,
                    distance: t0,
                    point,
                    texcoord: self.uv_at(point),
                    next: list,
                },
            ));
        }
        list
    }

    fn bounds(&self, model_to_world: &Transform) -> BoundingBox {
        let r = self.radius;
        let corners = [
            Point::new(-r, -r, -r),
            Point::new(-r, -r, r),
            Point::new(-r, r, -r),
            Point::new(-r, r, r),
            Point::new(r, -r, -r),
            Point::new(r, -r, r),
            Point::new(r, r, -r),
            Point::new(r, r, r),
        ];
        corners
            .iter()
            .map(|c| model_to_world.transform_point(*c))
            .fold(BoundingBox::empty(), |acc, p| acc.envelop(p))
    }

    fn normal(&self, point: Point, _face: Face) -> Normal {
        (point / self.radius).normalized()
    }

    fn material(&self, _face: Face) -> Option<SharedMaterial> {
        Some(self.material.clone())
    }

    fn emissive(&self, _face: Face) -> Option<SharedEmissiveMaterial> {
        self.emissive.clone()
    }

    fn sample_face(&self, _face: Face, rng: &mut dyn Rand) -> Point {
        let z = 1.0 - 2.0 * rng.next_float(0.0, 1.0);
        let r_xy = (1.0 - z * z).max(0.0).sqrt();
        let phi = rng.next_float(0.0, 1.0) * TAU;
        let (sin_phi, cos_phi) = phi.sin_cos();
        Vector::new(r_xy * cos_phi, r_xy * sin_phi, z) * self.radius
    }

    fn pdf_solid_angle(&self, ray: &Ray, _distance: f32, _face: Face) -> f32 {
        let dist2 = ray.origin.mag_sq();
        let r2 = self.radius * self.radius;
        if dist2 <= r2 {
            return 1.0 / (4.0 * std::f32::consts::PI);
        }
        let sin2_max = (r2 / dist2).min(1.0);
        let cos_theta_max = (1.0 - sin2_max).max(0.0).sqrt();
        1.0 / (TAU * (1.0 - cos_theta_max))
    }

    fn normal_map(&self, _face: Face) -> Option<SharedNormalMap> {
        self.normal_map.clone()
    }

    fn texture_coord_map(&self, _face: Face) -> Option<SharedTextureCoordMap> {
        Some(Arc::new(crate::shading::maps::IdentityTextureCoordMap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::WorkerRng;
    use crate::spectrum::ConstantReflector;

    fn material() -> SharedMaterial {
        Arc::new(crate::shading::material::LambertianMaterial {
            reflectance: Arc::new(ConstantReflector::new(0.5).unwrap()),
        })
    }

    #[test]
    fn ray_through_center_hits_front_and_back() {
        let sphere = Sphere::new(1.0, material(), None, None);
        let alloc = ShapeHitAllocator::new();
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        let hits = sphere.trace(&ray, &alloc).unwrap();
        assert_eq!(hits.face, FACE_FRONT);
        assert!((hits.distance - 4.0).abs() < 1e-4);
        let back = hits.next.unwrap();
        assert_eq!(back.face, FACE_BACK);
        assert!((back.distance - 6.0).abs() < 1e-4);
        assert!(back.next.is_none());
    }

    #[test]
    fn miss_ray_returns_no_hits() {
        let sphere = Sphere::new(1.0, material(), None, None);
        let alloc = ShapeHitAllocator::new();
        let ray = Ray::new(Point::new(5.0, 5.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        assert!(sphere.trace(&ray, &alloc).is_none());
    }

    #[test]
    fn normal_is_outward_and_unit() {
        let sphere = Sphere::new(2.0, material(), None, None);
        let n = sphere.normal(Point::new(2.0, 0.0, 0.0), FACE_FRONT);
        assert!((n - Vector::new(1.0, 0.0, 0.0)).mag() < 1e-5);
    }

    #[test]
    fn sample_face_lands_on_surface() {
        let sphere = Sphere::new(3.0, material(), None, None);
        let mut rng = WorkerRng::from_seed(42);
        for _ in 0..8 {
            let p = sphere.sample_face(FACE_FRONT, &mut rng);
            assert!((p.mag() - 3.0).abs() < 1e-3);
        }
    }
}
