//! Geometric primitives: Point, Vector, Ray, Normal, BoundingBox,
//! Matrix4x4.

use ultraviolet::{Mat4, Vec3};

pub type Point = Vec3;
pub type Vector = Vec3;
pub type Normal = Vec3;

/// A camera ray, optionally carrying a pair of offset rays for screen-space
/// derivatives (used by the mip-map sampler's anisotropic filtering).
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Point,
    pub direction: Vector,
}

impl Ray {
    pub fn new(origin: Point, direction: Vector) -> Self {
        Ray { origin, direction }
    }

    pub fn at(&self, t: f32) -> Point {
        self.origin + self.direction * t
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RayDifferential {
    pub ray: Ray,
    pub differentials: Option<RayDifferentials>,
}

#[derive(Clone, Copy, Debug)]
pub struct RayDifferentials {
    pub rx_origin: Point,
    pub rx_direction: Vector,
    pub ry_origin: Point,
    pub ry_direction: Vector,
}

impl RayDifferential {
    pub fn without_differentials(ray: Ray) -> Self {
        RayDifferential {
            ray,
            differentials: None,
        }
    }
}

/// Axis-aligned bounding box. `min <= max` componentwise; the only
/// permitted violation is the `empty()` value used as an initial fold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn empty() -> Self {
        BoundingBox {
            min: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn new(min: Point, max: Point) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y && min.z <= max.z);
        BoundingBox { min, max }
    }

    pub fn from_point(p: Point) -> Self {
        BoundingBox { min: p, max: p }
    }

    pub fn envelop(&self, p: Point) -> Self {
        BoundingBox {
            min: self.min.min_by_component(p),
            max: self.max.max_by_component(p),
        }
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        BoundingBox {
            min: self.min.min_by_component(other.min),
            max: self.max.max_by_component(other.max),
        }
    }

    pub fn intersection(&self, other: &BoundingBox) -> Self {
        BoundingBox {
            min: self.min.max_by_component(other.min),
            max: self.max.min_by_component(other.max),
        }
    }

    pub fn diagonal(&self) -> Vector {
        self.max - self.min
    }

    pub fn centroid(&self) -> Point {
        self.min + self.diagonal() * 0.5
    }

    pub fn surface_area(&self) -> f32 {
        let d = self.diagonal();
        if d.x < 0.0 || d.y < 0.0 || d.z < 0.0 {
            return 0.0;
        }
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    pub fn get(&self, axis: Axis) -> (f32, f32) {
        match axis {
            Axis::X => (self.min.x, self.max.x),
            Axis::Y => (self.min.y, self.max.y),
            Axis::Z => (self.min.z, self.max.z),
        }
    }

    pub fn centroid_axis(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.centroid().x,
            Axis::Y => self.centroid().y,
            Axis::Z => self.centroid().z,
        }
    }

    pub fn point_axis(p: Point, axis: Axis) -> f32 {
        match axis {
            Axis::X => p.x,
            Axis::Y => p.y,
            Axis::Z => p.z,
        }
    }

    pub fn dominant_axis(v: Vector) -> Axis {
        if v.x > v.y && v.x > v.z {
            Axis::X
        } else if v.y > v.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Ray/slab intersection; returns the entry/exit `t` range intersected
    /// with `t_range`, or `None` if the ray misses.
    pub fn intersect_ray(
        &self,
        ray: &Ray,
        inv_dir: Vector,
        t_range: (f32, f32),
    ) -> Option<(f32, f32)> {
        let mut t_min = t_range.0;
        let mut t_max = t_range.1;
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let (lo, hi) = self.get(axis);
            let o = Self::point_axis(ray.origin, axis);
            let d_inv = Self::point_axis(inv_dir, axis);
            let mut t0 = (lo - o) * d_inv;
            let mut t1 = (hi - o) * d_inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some((t_min, t_max))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// Affine transform with cached inverse, transpose and inverse-transpose.
/// Distinguishes point/vector/normal transforms: normals use the
/// inverse-transpose so non-uniform scale doesn't skew them.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub matrix: Mat4,
    pub inverse: Mat4,
    inverse_transpose: Mat4,
}

impl Transform {
    pub fn new(matrix: Mat4) -> Self {
        let inverse = matrix.inversed();
        let inverse_transpose = inverse.transposed();
        Transform {
            matrix,
            inverse,
            inverse_transpose,
        }
    }

    pub fn identity() -> Self {
        Self::new(Mat4::identity())
    }

    pub fn transform_point(&self, p: Point) -> Point {
        self.matrix.transform_point3(p)
    }

    pub fn transform_vector(&self, v: Vector) -> Vector {
        self.matrix.transform_vec3(v)
    }

    pub fn transform_normal(&self, n: Normal) -> Normal {
        self.inverse_transpose.transform_vec3(n)
    }

    pub fn inverse_transform_point(&self, p: Point) -> Point {
        self.inverse.transform_point3(p)
    }

    pub fn inverse_transform_vector(&self, v: Vector) -> Vector {
        self.inverse.transform_vec3(v)
    }

    pub fn transform_ray(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.transform_point(ray.origin),
            self.transform_vector(ray.direction),
        )
    }

    pub fn inverse_transform_ray(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.inverse_transform_point(ray.origin),
            self.inverse_transform_vector(ray.direction),
        )
    }
}

/// Branchless tangent/bitangent construction from a unit normal (Duff et
/// al., "Building an Orthonormal Basis, Revisited"), shared by BSDF
/// sampling, light sampling and bump mapping.
pub fn orthonormal_basis(n: Normal) -> (Vector, Vector) {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (tangent, bitangent)
}

/// Mirror-reflects `incident` (pointing away from the surface) about `normal`.
pub fn reflect(incident: Vector, normal: Normal) -> Vector {
    2.0 * incident.dot(normal) * normal - incident
}

/// Refracts `incident` (pointing away from the surface) through `normal`
/// with relative index of refraction `eta = eta_incident / eta_transmitted`.
/// Returns `None` on total internal reflection.
pub fn refract(incident: Vector, normal: Normal, eta: f32) -> Option<Vector> {
    let cos_i = incident.dot(normal);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i).max(0.0);
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some(-eta * incident + (eta * cos_i - cos_t) * normal)
}

/// Cosine-weighted hemisphere sample around `+Z` in local shading space,
/// `constriction` narrows the lobe toward the pole (used to blend a rough
/// specular lobe toward a mirror lobe as roughness shrinks).
pub fn cosine_sample_hemisphere(u: f32, v: f32, constriction: f32) -> Vector {
    let r = u.sqrt() * constriction;
    let theta = v * std::f32::consts::TAU;
    let (sin_t, cos_t) = theta.sin_cos();
    let x = r * cos_t;
    let y = r * sin_t;
    let z = (1.0 - (x * x + y * y)).max(0.0).sqrt();
    Vec3::new(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_union_contains_both() {
        let a = BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let b = BoundingBox::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::new(0.5, 3.0, 2.0));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(u.max, Vec3::new(1.0, 3.0, 2.0));
    }

    #[test]
    fn ray_slab_intersect_hits_unit_cube() {
        let b = BoundingBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        let inv_dir = Vec3::new(1.0 / ray.direction.x, 1.0 / ray.direction.y, 1.0 / ray.direction.z);
        let hit = b.intersect_ray(&ray, inv_dir, (0.0, f32::INFINITY));
        assert!(hit.is_some());
        let (t0, t1) = hit.unwrap();
        assert!((t0 - 4.0).abs() < 1e-5);
        assert!((t1 - 6.0).abs() < 1e-5);
    }

    #[test]
    fn transform_normal_uses_inverse_transpose() {
        let m = Mat4::from_nonuniform_scale(ultraviolet::Vec3::new(2.0, 1.0, 1.0));
        let t = Transform::new(m);
        let n = t.transform_normal(Vec3::new(1.0, 0.0, 0.0));
        assert!((n.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn orthonormal_basis_is_perpendicular_and_unit() {
        for n in [Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.0, 1.0, 1.0).normalized()] {
            let (t, b) = orthonormal_basis(n);
            assert!((t.mag() - 1.0).abs() < 1e-4);
            assert!((b.mag() - 1.0).abs() < 1e-4);
            assert!(t.dot(n).abs() < 1e-4);
            assert!(b.dot(n).abs() < 1e-4);
            assert!(t.dot(b).abs() < 1e-4);
        }
    }

    #[test]
    fn reflect_about_normal_preserves_angle() {
        let n = Vec3::new(0.0, 1.0, 0.0);
        let i = Vec3::new(1.0, 1.0, 0.0).normalized();
        let r = reflect(i, n);
        assert!((r.dot(n) - i.dot(n)).abs() < 1e-5);
    }

    #[test]
    fn refract_total_internal_reflection_returns_none() {
        let n = Vec3::new(0.0, 0.0, 1.0);
        let i = Vec3::new(0.99, 0.0, 0.01).normalized();
        assert!(refract(i, n, 2.0).is_none());
    }

    #[test]
    fn cosine_sample_hemisphere_is_unit_length() {
        let v = cosine_sample_hemisphere(0.3, 0.7, 1.0);
        assert!((v.mag() - 1.0).abs() < 1e-4);
        assert!(v.z >= 0.0);
    }
}
