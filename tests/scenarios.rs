//! Concrete seeded scenarios exercised end-to-end through the public crate
//! API, complementing the per-module unit tests with full
//! scene/camera/path-tracer integration coverage.

use std::sync::Arc;

use spectral_tracer::arena::{BsdfAllocator, ShapeHitAllocator};
use spectral_tracer::compositor::{ReflectorCompositor, SpectrumCompositor};
use spectral_tracer::geometry::{Point, Ray, RayDifferential, Vector};
use spectral_tracer::integrator::{PathTracer, PathTracerConfig, Scene};
use spectral_tracer::rng::WorkerRng;
use spectral_tracer::shading::light::LightList;
use spectral_tracer::shading::material::{DiffuseEmissiveMaterial, LambertianMaterial, MirrorMaterial};
use spectral_tracer::shape::csg::{Csg, CsgOp};
use spectral_tracer::shape::sphere::Sphere;
use spectral_tracer::spectrum::{ConstantReflector, RgbReflector, RgbSpectrum};

/// Minimal pinhole camera basis, duplicated from `demos/single_sphere.rs`
/// rather than shared: a test binary and a demo binary are separate crate
/// targets with no common dependency edge to hang a shared helper off.
struct Basis {
    eye: Point,
    right: Vector,
    up: Vector,
    forward: Vector,
}

fn look_at(eye: Point, target: Point, fov_deg: f32) -> (Basis, f32) {
    let forward = (target - eye).normalized();
    let world_up = Vector::new(0.0, 1.0, 0.0);
    let right = forward.cross(world_up).normalized();
    let up = right.cross(forward).normalized();
    (Basis { eye, right, up, forward }, (fov_deg.to_radians() * 0.5).tan())
}

fn pixel_ray(basis: &Basis, half_height: f32, u: f32, v: f32) -> Ray {
    let dir = (basis.forward + basis.right * half_height * u + basis.up * half_height * v).normalized();
    Ray::new(basis.eye, dir)
}

#[test]
fn scenario_1_red_sphere_hits_are_red_misses_are_background() {
    let reflectance = Arc::new(RgbReflector::new(1.0, 0.0, 0.0).unwrap());
    let material = Arc::new(LambertianMaterial { reflectance });
    let emissive = Arc::new(DiffuseEmissiveMaterial {
        radiance: Arc::new(RgbSpectrum::new(2.0, 0.0, 0.0).unwrap()),
    });
    let sphere = Sphere::new(1.0, material, Some(emissive), None);
    let scene = Scene::new(vec![Box::new(sphere)], None);
    let lights = LightList::new(vec![]);
    let config = PathTracerConfig::new(0, 2, 0.05, 0.1).unwrap();
    let tracer = PathTracer::new(config);

    let (basis, half_height) = look_at(Point::new(0.0, 0.0, 4.0), Point::new(0.0, 0.0, 0.0), 40.0);

    let n = 24;
    let mut saw_hit = false;
    let mut saw_miss = false;
    for iy in 0..n {
        for ix in 0..n {
            let u = (ix as f32 / (n - 1) as f32) * 2.0 - 1.0;
            let v = 1.0 - (iy as f32 / (n - 1) as f32) * 2.0;
            let ray = RayDifferential::without_differentials(pixel_ray(&basis, half_height, u, v));

            let hit_alloc = ShapeHitAllocator::new();
            let bsdf_alloc = BsdfAllocator::new();
            let spectrum_c = SpectrumCompositor::new();
            let reflector_c = ReflectorCompositor::new();
            let mut rng = WorkerRng::from_seed(42);

            let radiance = tracer.trace_path(&scene, &lights, ray, &mut rng, &hit_alloc, &bsdf_alloc, &spectrum_c, &reflector_c);
            match radiance {
                Some(s) => {
                    saw_hit = true;
                    assert!(s.sample(620.0) > 0.0, "hit pixel must carry red-band radiance");
                    assert_eq!(s.sample(535.0), 0.0, "hit pixel must carry no green-band radiance");
                    assert_eq!(s.sample(450.0), 0.0, "hit pixel must carry no blue-band radiance");
                }
                None => saw_miss = true,
            }
        }
    }
    assert!(saw_hit, "expected at least one ray to hit the sphere");
    assert!(saw_miss, "expected at least one ray to miss the sphere");
}

#[test]
fn scenario_2_mirror_reflects_red_neighbour_elsewhere_is_black() {
    let mirror_center = Point::new(1.0, 0.0, -1.0);
    let mirror_radius = 0.4;
    let red_center = Point::new(-1.0, 0.0, -1.0);

    let mirror = Arc::new(MirrorMaterial {
        reflectance: Arc::new(ConstantReflector::new(0.95).unwrap()),
    });
    let mirror_sphere = Sphere::new(mirror_radius, mirror, None, None);
    let mirror_sphere = spectral_tracer::shape::instance::Instance::new(
        Box::new(mirror_sphere),
        spectral_tracer::geometry::Transform::new(ultraviolet::Mat4::from_translation(mirror_center - Point::new(0.0, 0.0, 0.0))),
        false,
    );

    let red_reflectance = Arc::new(RgbReflector::new(1.0, 0.0, 0.0).unwrap());
    let red_material = Arc::new(LambertianMaterial { reflectance: red_reflectance });
    let red_emissive = Arc::new(DiffuseEmissiveMaterial {
        radiance: Arc::new(RgbSpectrum::new(3.0, 0.0, 0.0).unwrap()),
    });
    let red_sphere = Sphere::new(0.4, red_material, Some(red_emissive), None);
    let red_sphere = spectral_tracer::shape::instance::Instance::new(
        Box::new(red_sphere),
        spectral_tracer::geometry::Transform::new(ultraviolet::Mat4::from_translation(red_center - Point::new(0.0, 0.0, 0.0))),
        false,
    );

    let scene = Scene::new(vec![Box::new(mirror_sphere), Box::new(red_sphere)], None);
    let lights = LightList::new(vec![]);
    let config = PathTracerConfig::new(0, 1, 0.05, 0.1).unwrap();
    let tracer = PathTracer::new(config);

    // Construct a camera ray that is guaranteed, by inverting the mirror
    // reflection geometry rather than hoping a sampled grid finds it, to
    // hit the mirror sphere and bounce straight at the red sphere's
    // centre. `geometry::reflect` is its own inverse (it reflects a
    // vector about a plane), so the incoming direction that reflects
    // into `to_red` is `reflect(to_red, surface_normal)`.
    let surface_normal = Vector::new(-0.5, 0.3, 0.81).normalized();
    let mirror_point = mirror_center + surface_normal * mirror_radius;
    let to_red = (red_center - mirror_point).normalized();
    let incoming = spectral_tracer::geometry::reflect(to_red, surface_normal);
    let eye = mirror_point + incoming * 6.0;
    let camera_ray = Ray::new(eye, -incoming);

    let classify_alloc = ShapeHitAllocator::new();
    let first_hit = scene.trace(&camera_ray, &classify_alloc).expect("constructed ray hits the mirror sphere");
    let hit_world_point = first_hit.shape.to_world_point(first_hit.point);
    assert!((hit_world_point - mirror_point).mag() < 1e-2, "constructed ray should land on the mirror sphere near the chosen point");

    let hit_alloc = ShapeHitAllocator::new();
    let bsdf_alloc = BsdfAllocator::new();
    let spectrum_c = SpectrumCompositor::new();
    let reflector_c = ReflectorCompositor::new();
    let mut rng = WorkerRng::from_seed(7);
    let radiance = tracer.trace_path(
        &scene,
        &lights,
        RayDifferential::without_differentials(camera_ray),
        &mut rng,
        &hit_alloc,
        &bsdf_alloc,
        &spectrum_c,
        &reflector_c,
    );
    let red = radiance.expect("mirror reflection should pick up the emissive red sphere").sample(620.0);
    assert!(red > 0.0, "expected reflected path to carry red radiance, got {}", red);

    // A ray aimed well away from both spheres sees nothing and no light.
    let miss_ray = Ray::new(Point::new(0.0, 10.0, 5.0), Vector::new(0.0, 1.0, 0.0));
    let miss_radiance = tracer.trace_path(
        &scene,
        &lights,
        RayDifferential::without_differentials(miss_ray),
        &mut rng,
        &hit_alloc,
        &bsdf_alloc,
        &spectrum_c,
        &reflector_c,
    );
    assert!(miss_radiance.is_none(), "expected a ray that misses both spheres to carry no radiance");
}

#[test]
fn scenario_5_csg_difference_of_equal_spheres_never_intersects() {
    let reflectance = Arc::new(ConstantReflector::new(0.5).unwrap());
    let material = || {
        Arc::new(LambertianMaterial {
            reflectance: reflectance.clone(),
        })
    };
    let a = Sphere::new(1.0, material(), None, None);
    let b = Sphere::new(1.0, material(), None, None);
    let csg = Csg::new(CsgOp::Difference, Box::new(a), Box::new(b));
    let scene = Scene::new(vec![Box::new(csg)], None);

    let alloc = ShapeHitAllocator::new();
    let directions = [
        Vector::new(0.0, 0.0, 1.0),
        Vector::new(0.3, 0.0, 1.0),
        Vector::new(0.0, 0.7, 1.0),
        Vector::new(-0.4, 0.2, 1.0),
    ];
    for dir in directions {
        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), dir.normalized());
        assert!(scene.trace(&ray, &alloc).is_none(), "difference of identical spheres must never be hit");
    }
}
