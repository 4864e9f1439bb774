//! A unit sphere at the origin, constant red Lambertian, no lights, a
//! pinhole camera at `(0, 0, 4)` looking at the origin, rendered into a
//! 500x500 PNG.
//!
//! `Camera`, `ColorIntegrator` and `Framebuffer` are external-collaborator
//! contracts the core only declares as traits (src/render.rs); this binary
//! supplies the concrete pieces a caller is expected to bring.

use std::sync::Arc;

use spectral_tracer::color::{Color3, ColorSpace};
use spectral_tracer::geometry::{Point, Ray, RayDifferential, Vector};
use spectral_tracer::integrator::{PathTracer, PathTracerConfig, Scene};
use spectral_tracer::render::{render_to_framebuffer, Camera, ColorIntegrator, Framebuffer};
use spectral_tracer::shading::light::LightList;
use spectral_tracer::shading::material::LambertianMaterial;
use spectral_tracer::shape::sphere::Sphere;
use spectral_tracer::spectrum::{RgbReflector, SpectrumLike};

const WIDTH: u32 = 500;
const HEIGHT: u32 = 500;

/// Looks from a fixed eye point at the origin with a fixed vertical field
/// of view; screen-space `(px, py)` run `0..width` / `0..height` with
/// `(0, 0)` at the top-left, matching `Camera::generate_ray`'s contract.
struct PinholeCamera {
    eye: Point,
    forward: Vector,
    right: Vector,
    up: Vector,
    half_height: f32,
}

impl PinholeCamera {
    fn looking_at(eye: Point, target: Point, vertical_fov_deg: f32, aspect: f32) -> Self {
        let forward = (target - eye).normalized();
        let world_up = Vector::new(0.0, 1.0, 0.0);
        let right = forward.cross(world_up).normalized();
        let up = right.cross(forward).normalized();
        let half_height = (vertical_fov_deg.to_radians() * 0.5).tan();
        PinholeCamera {
            eye,
            forward,
            right: right * half_height * aspect,
            up: up * half_height,
            half_height,
        }
    }
}

impl Camera for PinholeCamera {
    fn generate_ray(&self, px: f32, py: f32, width: u32, height: u32) -> RayDifferential {
        let _ = self.half_height;
        let u = (px / width as f32) * 2.0 - 1.0;
        let v = 1.0 - (py / height as f32) * 2.0;
        let direction = (self.forward + self.right * u + self.up * v).normalized();
        RayDifferential::without_differentials(Ray::new(self.eye, direction))
    }
}

/// Reduces a spectrum to `Color3` by sampling it at the three representative
/// wavelengths the crate's own RGB/XYZ discrete-band spectra use as channel
/// boundaries (`src/spectrum/leaf.rs`'s `BAND_LOW_HIGH_NM`/`BAND_MID_HIGH_NM`),
/// so a band-discrete spectrum round-trips exactly through this reduction.
struct ThreeBandColorIntegrator {
    background: [f32; 3],
}

const BLUE_NM: f32 = 450.0;
const GREEN_NM: f32 = 535.0;
const RED_NM: f32 = 620.0;

impl ColorIntegrator for ThreeBandColorIntegrator {
    fn reduce(&self, spectrum: Option<&dyn SpectrumLike>) -> Color3 {
        match spectrum {
            None => Color3::new(self.background, ColorSpace::LinearSrgb).unwrap_or_else(|_| Color3::black(ColorSpace::LinearSrgb)),
            Some(s) => {
                let r = s.sample(RED_NM);
                let g = s.sample(GREEN_NM);
                let b = s.sample(BLUE_NM);
                Color3::new([r, g, b], ColorSpace::LinearSrgb).unwrap_or_else(|_| Color3::black(ColorSpace::LinearSrgb))
            }
        }
    }
}

struct ImageFramebuffer {
    image: image::RgbImage,
}

impl Framebuffer for ImageFramebuffer {
    fn set_pixel(&mut self, x: u32, y: u32, color: Color3) {
        let srgb = color.convert(ColorSpace::Srgb).clamp(1.0);
        let to_u8 = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
        self.image.put_pixel(x, y, image::Rgb([to_u8(srgb.values[0]), to_u8(srgb.values[1]), to_u8(srgb.values[2])]));
    }

    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }
}

fn main() {
    env_logger::init();

    let reflectance = Arc::new(RgbReflector::new(1.0, 0.0, 0.0).expect("red reflectance is in range"));
    let material = Arc::new(LambertianMaterial { reflectance });
    let sphere = Sphere::new(1.0, material, None, None);
    let scene = Scene::new(vec![Box::new(sphere)], None);
    let lights = LightList::new(vec![]);

    let config = PathTracerConfig::new(0, 2, 0.05, 0.1).expect("static path-tracer config is valid");
    let tracer = PathTracer::new(config);

    let camera = PinholeCamera::looking_at(Point::new(0.0, 0.0, 4.0), Point::new(0.0, 0.0, 0.0), 40.0, 1.0);
    let color_integrator = ThreeBandColorIntegrator { background: [0.0, 0.0, 0.0] };

    let mut framebuffer = ImageFramebuffer {
        image: image::RgbImage::new(WIDTH, HEIGHT),
    };

    render_to_framebuffer(&scene, &tracer, &lights, &camera, &color_integrator, 8, 1, &mut framebuffer);

    let out_path = "single_sphere.png";
    framebuffer.image.save(out_path).expect("png encode succeeds");
    log::info!("wrote {out_path}");
}
