//! Per-worker render state and the parallel-by-pixel render loop.
//! `Camera`, `ColorIntegrator` and `Framebuffer` are external collaborator
//! contracts this crate names but leaves unspecified beyond their
//! interface; concrete implementations (pinhole camera, CIE-XYZ reduction,
//! an in-memory/PPM sink) live in `demos/`.
//!
//! Workers do not communicate: each owns one RNG, one
//! `SpectrumCompositor`, one `ReflectorCompositor`, one `BsdfAllocator`,
//! one `ShapeHitAllocator`, and one `PathTracer`. The framebuffer is
//! written at disjoint `(x, y)` addresses, so no synchronization beyond
//! the final join is required (`rayon`'s scoped parallel iterator for
//! per-tile/per-pixel work).

use rayon::prelude::*;

use crate::arena::{BsdfAllocator, ShapeHitAllocator};
use crate::color::Color3;
use crate::compositor::{ReflectorCompositor, SpectrumCompositor};
use crate::geometry::RayDifferential;
use crate::integrator::{PathTracer, Scene};
use crate::rng::{Rand, WorkerRng};
use crate::shading::light::LightList;
use crate::spectrum::SpectrumLike;

/// Generates a (possibly differential) camera ray for a continuous pixel
/// coordinate; `(0, 0)` is the top-left of the image, `width`/`height` are
/// in pixels.
pub trait Camera: Send + Sync {
    fn generate_ray(&self, px: f32, py: f32, width: u32, height: u32) -> RayDifferential;
}

/// Reduces a spectral radiance sample to a displayable `Color3` —
/// colour-space plumbing for XYZ/sRGB, an external collaborator.
pub trait ColorIntegrator: Send + Sync {
    fn reduce(&self, spectrum: Option<&dyn SpectrumLike>) -> Color3;
}

/// Sink for finished pixels: `set_pixel`
/// writes to disjoint addresses, so concurrent workers never contend.
pub trait Framebuffer: Send {
    fn set_pixel(&mut self, x: u32, y: u32, color: Color3);
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Preallocated state for one render worker: rebuilt once per worker,
/// reset once per pixel rather than reallocated.
pub struct WorkerState {
    rng: WorkerRng,
    hit_alloc: ShapeHitAllocator,
    bsdf_alloc: BsdfAllocator,
    spectrum_compositor: SpectrumCompositor,
    reflector_compositor: ReflectorCompositor,
}

impl WorkerState {
    pub fn new(seed: u64) -> Self {
        WorkerState {
            rng: WorkerRng::from_seed(seed),
            hit_alloc: ShapeHitAllocator::new(),
            bsdf_alloc: BsdfAllocator::new(),
            spectrum_compositor: SpectrumCompositor::new(),
            reflector_compositor: ReflectorCompositor::new(),
        }
    }

    /// Invalidates every value produced since the last reset: called once
    /// per camera ray.
    fn reset(&mut self) {
        self.hit_alloc.reset();
        self.bsdf_alloc.reset();
        self.spectrum_compositor.reset();
        self.reflector_compositor.reset();
    }
}

/// Renders `scene` into `framebuffer`, one `WorkerState` per image row
/// (the coarsest split that still keeps `rayon`'s per-task overhead far
/// below one pixel's path-tracing cost), `samples_per_pixel` paths
/// averaged per pixel.
#[allow(clippy::too_many_arguments)]
pub fn render(
    scene: &Scene,
    integrator: &PathTracer,
    lights: &LightList,
    camera: &dyn Camera,
    color_integrator: &dyn ColorIntegrator,
    width: u32,
    height: u32,
    samples_per_pixel: u32,
    seed: u64,
    rows: &mut [Vec<Color3>],
) {
    log::info!("rendering {width}x{height}, {samples_per_pixel} spp, {} scene shapes", scene.shape_count());
    let black_space = color_integrator.reduce(None).space;
    rows.par_iter_mut().enumerate().for_each(|(y, row)| {
        let mut worker = WorkerState::new(seed ^ (y as u64).wrapping_mul(0x9E3779B97F4A7C15));
        for x in 0..width as usize {
            let mut accum = [0.0f32; 3];
            for _ in 0..samples_per_pixel {
                worker.reset();
                let jitter_x = worker.rng.next_float(0.0, 1.0);
                let jitter_y = worker.rng.next_float(0.0, 1.0);
                let ray = camera.generate_ray(x as f32 + jitter_x, y as f32 + jitter_y, width, height);
                let radiance = integrator.trace_path(
                    scene,
                    lights,
                    ray,
                    &mut worker.rng,
                    &worker.hit_alloc,
                    &worker.bsdf_alloc,
                    &worker.spectrum_compositor,
                    &worker.reflector_compositor,
                );
                let color = color_integrator.reduce(radiance);
                for c in 0..3 {
                    accum[c] += color.values[c];
                }
            }
            let spp = samples_per_pixel.max(1) as f32;
            let averaged = Color3::new([accum[0] / spp, accum[1] / spp, accum[2] / spp], black_space).unwrap_or_else(|_| Color3::black(black_space));
            row[x] = averaged;
        }
    });
}

/// Renders into row-major scratch storage (see `render`), then copies the
/// finished rows into a `Framebuffer` sequentially. The parallel phase
/// never touches `framebuffer` directly: `&mut dyn Framebuffer` is one
/// mutable reference and Rust gives no way to hand disjoint rows of it to
/// concurrent workers without unsafe aliasing, so the "no synchronization
/// beyond a teardown fence" guarantee is realized as "workers write
/// disjoint scratch rows, then one sequential copy" instead.
#[allow(clippy::too_many_arguments)]
pub fn render_to_framebuffer(
    scene: &Scene,
    integrator: &PathTracer,
    lights: &LightList,
    camera: &dyn Camera,
    color_integrator: &dyn ColorIntegrator,
    samples_per_pixel: u32,
    seed: u64,
    framebuffer: &mut dyn Framebuffer,
) {
    let (width, height) = (framebuffer.width(), framebuffer.height());
    let mut rows: Vec<Vec<Color3>> = (0..height).map(|_| vec![Color3::black(crate::color::ColorSpace::LinearSrgb); width as usize]).collect();
    render(scene, integrator, lights, camera, color_integrator, width, height, samples_per_pixel, seed, &mut rows);
    for (y, row) in rows.into_iter().enumerate() {
        for (x, color) in row.into_iter().enumerate() {
            framebuffer.set_pixel(x as u32, y as u32, color);
        }
    }
}
