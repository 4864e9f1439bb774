//! Triangle mesh shapes: many triangle instances share one reference-counted
//! vertex/uv buffer (`MeshHeader`);
//! each instance stores only its three vertex indices and a cached face
//! normal. Intersection is the Pharr–Jakob–Humphreys watertight ray/triangle
//! test: shear the triangle into the ray's dominant-axis frame so every
//! edge function is evaluated with the same rounding regardless of which
//! side of an edge the ray grazes, which is what makes it watertight at
//! shared edges between adjacent triangles.

use std::sync::Arc;

use crate::arena::ShapeHitAllocator;
use crate::geometry::{Axis, BoundingBox, Normal, Point, Ray, Transform, Vector};
use crate::rng::Rand;
use crate::shading::maps::{SharedNormalMap, SharedTextureCoordMap, TexCoord};
use crate::shading::material::{SharedEmissiveMaterial, SharedMaterial};
use crate::shape::{cons, Face, Hit, HitList, Shape, FACE_BACK, FACE_FRONT};

/// Shared vertex/uv buffer for every triangle instance in one mesh.
/// Ownership is "longest-holder": the mesh never back-references its
/// triangles.
pub struct MeshHeader {
    pub vertices: Vec<Point>,
    pub uvs: Option<Vec<(f32, f32)>>,
}

pub type SharedMeshHeader = Arc<MeshHeader>;

pub struct Triangle {
    pub mesh: SharedMeshHeader,
    pub indices: [u32; 3],
    pub geometric_normal: Normal,
    pub material: SharedMaterial,
    pub emissive: Option<SharedEmissiveMaterial>,
    pub normal_map: Option<SharedNormalMap>,
}

impl Triangle {
    /// Returns `None` if the three vertices are degenerate (normal length
    /// below `1e-6`); the caller is
    /// expected to drop the triangle and keep a running count, as the PLY
    /// loader does.
    pub fn new(
        mesh: SharedMeshHeader,
        indices: [u32; 3],
        material: SharedMaterial,
        emissive: Option<SharedEmissiveMaterial>,
        normal_map: Option<SharedNormalMap>,
    ) -> Option<Self> {
        let [v0, v1, v2] = indices.map(|i| mesh.vertices[i as usize]);
        let cross = (v1 - v0).cross(v2 - v0);
        let len = cross.mag();
        if len < 1e-6 {
            return None;
        }
        Some(Triangle {
            mesh,
            indices,
            geometric_normal: cross / len,
            material,
            emissive,
            normal_map,
        })
    }

    fn vertices(&self) -> [Point; 3] {
        self.indices.map(|i| self.mesh.vertices[i as usize])
    }

    fn uv_at(&self, barycentric: [f32; 3]) -> TexCoord {
        let Some(uvs) = &self.mesh.uvs else {
            return TexCoord::None;
        };
        let [u0, u1, u2] = self.indices.map(|i| uvs[i as usize]);
        let u = barycentric[0] * u0.0 + barycentric[1] * u1.0 + barycentric[2] * u2.0;
        let v = barycentric[0] * u0.1 + barycentric[1] * u1.1 + barycentric[2] * u2.1;
        TexCoord::Uv { u, v }
    }

    fn area(&self) -> f32 {
        let [v0, v1, v2] = self.vertices();
        0.5 * (v1 - v0).cross(v2 - v0).mag()
    }
}

impl Shape for Triangle {
    fn trace<'a>(&'a self, ray: &Ray, alloc: &'a ShapeHitAllocator) -> HitList<'a> {
        let [p0, p1, p2] = self.vertices();

        // Translate vertices so the ray origin is at zero.
        let p0t = p0 - ray.origin;
        let p1t = p1 - ray.origin;
        let p2t = p2 - ray.origin;

        // Permute the dominant axis of the ray direction to z.
        let kz = match BoundingBox::dominant_axis(Vector::new(ray.direction.x.abs(), ray.direction.y.abs(), ray.direction.z.abs())) {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        };
        let kx = (kz + 1) % 3;
        let ky = (kx + 1) % 3;
        let d = permute(ray.direction, kx, ky, kz);
        let mut p0t = permute(p0t, kx, ky, kz);
        let mut p1t = permute(p1t, kx, ky, kz);
        let mut p2t = permute(p2t, kx, ky, kz);

        let sx = -d.x / d.z;
        let sy = -d.y / d.z;
        let sz = 1.0 / d.z;
        p0t.x += sx * p0t.z;
        p0t.y += sy * p0t.z;
        p1t.x += sx * p1t.z;
        p1t.y += sy * p1t.z;
        p2t.x += sx * p2t.z;
        p2t.y += sy * p2t.z;

        let mut e0 = p1t.x * p2t.y - p1t.y * p2t.x;
        let mut e1 = p2t.x * p0t.y - p2t.y * p0t.x;
        let mut e2 = p0t.x * p1t.y - p0t.y * p1t.x;

        // A ray grazing a shared edge lands exactly on it in f32; fall back
        // to f64 so the sign test below resolves the edge consistently with
        // the adjacent triangle instead of producing a crack.
        if e0 == 0.0 || e1 == 0.0 || e2 == 0.0 {
            let p2txp1ty = p2t.x as f64 * p1t.y as f64;
            let p2typ1tx = p2t.y as f64 * p1t.x as f64;
            e0 = (p2typ1tx - p2txp1ty) as f32;

            let p0txp2ty = p0t.x as f64 * p2t.y as f64;
            let p0typ2tx = p0t.y as f64 * p2t.x as f64;
            e1 = (p0typ2tx - p0txp2ty) as f32;

            let p1txp0ty = p1t.x as f64 * p0t.y as f64;
            let p1typ0tx = p1t.y as f64 * p0t.x as f64;
            e2 = (p1typ0tx - p1txp0ty) as f32;
        }

        if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
            return None;
        }
        let sum = e0 + e1 + e2;
        if sum == 0.0 {
            return None;
        }

        let p0tz = p0t.z * sz;
        let p1tz = p1t.z * sz;
        let p2tz = p2t.z * sz;
        let t_scaled = e0 * p0tz + e1 * p1tz + e2 * p2tz;
        if sum < 0.0 && t_scaled >= 0.0 {
            return None;
        }
        if sum > 0.0 && t_scaled <= 0.0 {
            return None;
        }

        let inv_sum = 1.0 / sum;
        let b0 = e0 * inv_sum;
        let b1 = e1 * inv_sum;
        let b2 = e2 * inv_sum;
        let t = t_scaled * inv_sum;
        if !t.is_finite() || t < 0.0 {
            return None;
        }

        let point = ray.at(t);
        let front = self.geometric_normal.dot(ray.direction) < 0.0;
        let face = if front { FACE_FRONT } else { FACE_BACK };
        Some(cons(
            alloc,
            Hit {
                shape: self,
                face,
                distance: t,
                point,
                texcoord: self.uv_at([b0, b1, b2]),
                next: None,
            },
        ))
    }

    fn bounds(&self, model_to_world: &Transform) -> BoundingBox {
        self.vertices()
            .iter()
            .map(|p| model_to_world.transform_point(*p))
            .fold(BoundingBox::empty(), |acc, p| acc.envelop(p))
    }

    fn normal(&self, _point: Point, _face: Face) -> Normal {
        self.geometric_normal
    }

    fn material(&self, _face: Face) -> Option<SharedMaterial> {
        Some(self.material.clone())
    }

    fn emissive(&self, _face: Face) -> Option<SharedEmissiveMaterial> {
        self.emissive.clone()
    }

    fn sample_face(&self, _face: Face, rng: &mut dyn Rand) -> Point {
        let [v0, v1, v2] = self.vertices();
        let su0 = rng.next_float(0.0, 1.0).sqrt();
        let b0 = 1.0 - su0;
        let b1 = rng.next_float(0.0, 1.0) * su0;
        v0 * b0 + v1 * b1 + v2 * (1.0 - b0 - b1)
    }

    fn pdf_solid_angle(&self, ray: &Ray, distance: f32, _face: Face) -> f32 {
        let wi = ray.direction.normalized();
        let cos_theta = self.geometric_normal.dot(wi).abs();
        let area = self.area();
        if cos_theta < 1e-7 || area <= 0.0 {
            return 0.0;
        }
        (distance * distance) / (area * cos_theta)
    }

    fn normal_map(&self, _face: Face) -> Option<SharedNormalMap> {
        self.normal_map.clone()
    }

    fn texture_coord_map(&self, _face: Face) -> Option<SharedTextureCoordMap> {
        Some(Arc::new(crate::shading::maps::IdentityTextureCoordMap))
    }
}

fn permute(v: Vector, x: usize, y: usize, z: usize) -> Vector {
    let a = [v.x, v.y, v.z];
    Vector::new(a[x], a[y], a[z])
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

    fn unit_triangle() -> Triangle {
        let mesh = Arc::new(MeshHeader {
            vertices: vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0)],
            uvs: None,
        });
        Triangle::new(mesh, [0, 1, 2], material(), None, None).unwrap()
    }

    #[test]
    fn degenerate_triangle_is_rejected() {
        let mesh = Arc::new(MeshHeader {
            vertices: vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), Point::new(2.0, 0.0, 0.0)],
            uvs: None,
        });
        assert!(Triangle::new(mesh, [0, 1, 2], material(), None, None).is_none());
    }

    #[test]
    fn ray_through_triangle_center_hits() {
        let tri = unit_triangle();
        let alloc = ShapeHitAllocator::new();
        let ray = Ray::new(Point::new(0.2, 0.2, -5.0), Vector::new(0.0, 0.0, 1.0));
        let hit = tri.trace(&ray, &alloc).unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-4);
        assert_eq!(hit.next.is_none(), true);
    }

    #[test]
    fn ray_outside_triangle_misses() {
        let tri = unit_triangle();
        let alloc = ShapeHitAllocator::new();
        let ray = Ray::new(Point::new(5.0, 5.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        assert!(tri.trace(&ray, &alloc).is_none());
    }

    #[test]
    fn sample_face_lies_in_plane() {
        let tri = unit_triangle();
        let mut rng = WorkerRng::from_seed(7);
        for _ in 0..8 {
            let p = tri.sample_face(FACE_FRONT, &mut rng);
            assert!(p.z.abs() < 1e-5);
            assert!(p.x >= -1e-5 && p.y >= -1e-5);
        }
    }
}
