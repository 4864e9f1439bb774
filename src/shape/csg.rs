//! Constructive solid geometry: union, intersection
//! and difference are each a two-pointer merge of two already-sorted child
//! hit lists, toggling an inside-A/inside-B flag at every hit and consulting
//! a per-op emission table to decide whether the current hit survives.

use crate::arena::ShapeHitAllocator;
use crate::geometry::{BoundingBox, Normal, Point, Ray, Transform};
use crate::rng::Rand;
use crate::shading::maps::{SharedNormalMap, SharedTextureCoordMap, TexCoord};
use crate::shading::material::{SharedEmissiveMaterial, SharedMaterial};
use crate::shape::{cons, Face, Hit, HitList, Shape};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsgOp {
    Union,
    Intersection,
    Difference,
}

pub struct Csg {
    pub op: CsgOp,
    pub a: Box<dyn Shape>,
    pub b: Box<dyn Shape>,
}

impl Csg {
    pub fn new(op: CsgOp, a: Box<dyn Shape>, b: Box<dyn Shape>) -> Self {
        Csg { op, a, b }
    }

    fn emit_a(&self, inside_b: bool) -> bool {
        match self.op {
            CsgOp::Union => !inside_b,
            CsgOp::Intersection => inside_b,
            CsgOp::Difference => !inside_b,
        }
    }

    fn emit_b(&self, inside_a: bool) -> bool {
        match self.op {
            CsgOp::Union => !inside_a,
            CsgOp::Intersection => inside_a,
            CsgOp::Difference => inside_a,
        }
    }
}

struct Picked<'a> {
    shape: &'a dyn Shape,
    face: Face,
    distance: f32,
    point: Point,
    texcoord: TexCoord,
}

impl Shape for Csg {
    fn trace<'a>(&'a self, ray: &Ray, alloc: &'a ShapeHitAllocator) -> HitList<'a> {
        let mut a = self.a.trace(ray, alloc);
        let mut b = self.b.trace(ray, alloc);
        let mut inside_a = false;
        let mut inside_b = false;
        let mut emitted: Vec<Picked<'a>> = Vec::new();

        loop {
            match (a, b) {
                (None, None) => break,
                (Some(ha), None) => {
                    inside_a = !inside_a;
                    if self.emit_a(inside_b) {
                        emitted.push(Picked {
                            shape: ha.shape,
                            face: ha.face,
                            distance: ha.distance,
                            point: ha.point,
                            texcoord: ha.texcoord,
                        });
                    }
                    a = ha.next;
                }
                (None, Some(hb)) => {
                    inside_b = !inside_b;
                    if self.emit_b(inside_a) {
                        emitted.push(Picked {
                            shape: hb.shape,
                            face: hb.face,
                            distance: hb.distance,
                            point: hb.point,
                            texcoord: hb.texcoord,
                        });
                    }
                    b = hb.next;
                }
                (Some(ha), Some(hb)) => {
                    if ha.distance < hb.distance {
                        inside_a = !inside_a;
                        if self.emit_a(inside_b) {
                            emitted.push(Picked {
                                shape: ha.shape,
                                face: ha.face,
                                distance: ha.distance,
                                point: ha.point,
                                texcoord: ha.texcoord,
                            });
                        }
                        a = ha.next;
                    } else if hb.distance < ha.distance {
                        inside_b = !inside_b;
                        if self.emit_b(inside_a) {
                            emitted.push(Picked {
                                shape: hb.shape,
                                face: hb.face,
                                distance: hb.distance,
                                point: hb.point,
                                texcoord: hb.texcoord,
                            });
                        }
                        b = hb.next;
                    } else {
                        // Tie: both lists advance; coincident boundaries
                        // cancel rather than double-emit (the `difference(A, A) = empty` case
                        // is the degenerate scenario this resolves).
                        inside_a = !inside_a;
                        inside_b = !inside_b;
                        a = ha.next;
                        b = hb.next;
                    }
                }
            }
        }

        let mut list: HitList<'a> = None;
        for picked in emitted.into_iter().rev() {
            list = Some(cons(
                alloc,
                Hit {
                    shape: picked.shape,
                    face: picked.face,
                    distance: picked.distance,
                    point: picked.point,
                    texcoord: picked.texcoord,
                    next: list,
                },
            ));
        }
        list
    }

    fn bounds(&self, model_to_world: &Transform) -> BoundingBox {
        let a = self.a.bounds(model_to_world);
        let b = self.b.bounds(model_to_world);
        match self.op {
            CsgOp::Union => a.union(&b),
            CsgOp::Intersection => a.intersection(&b),
            CsgOp::Difference => a,
        }
    }

    fn normal(&self, point: Point, face: Face) -> Normal {
        // `Hit::shape` is set to the contributing child in `trace`, so
        // callers normally invoke `normal` through that child directly;
        // this only matters if something addresses the `Csg` node itself.
        self.a.normal(point, face)
    }

    fn material(&self, face: Face) -> Option<SharedMaterial> {
        self.a.material(face).or_else(|| self.b.material(face))
    }

    fn emissive(&self, face: Face) -> Option<SharedEmissiveMaterial> {
        self.a.emissive(face).or_else(|| self.b.emissive(face))
    }

    fn sample_face(&self, face: Face, rng: &mut dyn Rand) -> Point {
        self.a.sample_face(face, rng)
    }

    fn pdf_solid_angle(&self, ray: &Ray, distance: f32, face: Face) -> f32 {
        self.a.pdf_solid_angle(ray, distance, face)
    }

    fn normal_map(&self, face: Face) -> Option<SharedNormalMap> {
        self.a.normal_map(face).or_else(|| self.b.normal_map(face))
    }

    fn texture_coord_map(&self, face: Face) -> Option<SharedTextureCoordMap> {
        self.a.texture_coord_map(face).or_else(|| self.b.texture_coord_map(face))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector;
    use crate::shape::sphere::Sphere;
    use crate::spectrum::ConstantReflector;
    use std::sync::Arc;

    fn material() -> SharedMaterial {
        Arc::new(crate::shading::material::LambertianMaterial {
            reflectance: Arc::new(ConstantReflector::new(0.5).unwrap()),
        })
    }

    #[test]
    fn difference_of_identical_spheres_is_empty() {
        let a = Sphere::new(1.0, material(), None, None);
        let b = Sphere::new(1.0, material(), None, None);
        let csg = Csg::new(CsgOp::Difference, Box::new(a), Box::new(b));
        let alloc = ShapeHitAllocator::new();
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        assert!(csg.trace(&ray, &alloc).is_none());
    }

    #[test]
    fn union_of_overlapping_spheres_starts_at_nearer_surface() {
        let a = Sphere::new(1.0, material(), None, None);
        let b = Sphere::new(1.5, material(), None, None);
        let csg = Csg::new(CsgOp::Union, Box::new(a), Box::new(b));
        let alloc = ShapeHitAllocator::new();
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        let hits = csg.trace(&ray, &alloc).unwrap();
        assert!((hits.distance - 3.5).abs() < 1e-3);
    }

    #[test]
    fn intersection_of_overlapping_spheres_starts_at_farther_surface() {
        let a = Sphere::new(1.0, material(), None, None);
        let b = Sphere::new(1.5, material(), None, None);
        let csg = Csg::new(CsgOp::Intersection, Box::new(a), Box::new(b));
        let alloc = ShapeHitAllocator::new();
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        let hits = csg.trace(&ray, &alloc).unwrap();
        assert!((hits.distance - 4.0).abs() < 1e-3);
    }
}
