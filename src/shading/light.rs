//! Light capability set: `sample(hit-point, visibility-tester, rng,
//! spectrum-compositor) -> (Spectrum, wto_light, pdf)`,
//! `compute-emissive-with-pdf(ray, visibility-tester, compositor) ->
//! (Spectrum, pdf)`. Delta lights return `pdf = +INFINITY`.
//!
//! `SphereLight` samples a cone toward the sphere rather than the full
//! solid angle, keeping every sample inside the light's silhouette.
//! `InfiniteEnvironmentLight` importance-samples a marginal/conditional pdf
//! table over solid angle, clamping the CDF-inversion index to `width - 1`
//! (and `height - 1`) at the upper boundary rather than letting
//! `floor(u * width)` read one entry past the table's end.

use std::sync::{Arc, Mutex};

use crate::color::Color3;
use crate::compositor::SpectrumCompositor;
use crate::error::{RenderError, Result};
use crate::extrapolator::ColorExtrapolator;
use crate::geometry::{orthonormal_basis, Point, Ray, Vector};
use crate::mipmap::{FilterMode, SpectrumMipmap, WrapMode};
use crate::rng::Rand;
use crate::spectrum::{SharedSpectrum, SpectrumLike};

/// Tests occlusion between two points against the scene; implemented by
/// whatever holds the BVH (kept as a trait here so this module has no
/// dependency on the shape/bvh layer).
pub trait VisibilityTester {
    fn unoccluded(&self, from: Point, to: Point) -> bool;
}

pub struct NoOcclusion;

impl VisibilityTester for NoOcclusion {
    fn unoccluded(&self, _from: Point, _to: Point) -> bool {
        true
    }
}

pub trait Light: Send + Sync {
    fn sample<'s>(
        &'s self,
        hit_point: Point,
        visibility: &dyn VisibilityTester,
        rng: &mut dyn Rand,
        compositor: &'s SpectrumCompositor,
    ) -> Option<(&'s dyn SpectrumLike, Vector, f32)>;

    fn compute_emissive_with_pdf<'s>(&'s self, ray: &Ray, compositor: &'s SpectrumCompositor) -> Option<(&'s dyn SpectrumLike, f32)>;
}

/// Delta point light: no area, `pdf = +INFINITY`.
pub struct PointLight {
    pub position: Point,
    pub intensity: SharedSpectrum,
}

impl Light for PointLight {
    fn sample<'s>(
        &'s self,
        hit_point: Point,
        visibility: &dyn VisibilityTester,
        _rng: &mut dyn Rand,
        compositor: &'s SpectrumCompositor,
    ) -> Option<(&'s dyn SpectrumLike, Vector, f32)> {
        if !visibility.unoccluded(hit_point, self.position) {
            return None;
        }
        let delta = self.position - hit_point;
        let dist2 = delta.mag_sq().max(1e-12);
        let wo = delta / dist2.sqrt();
        let spectrum = compositor.attenuate(Some(compositor.adopt(self.intensity.clone())), 1.0 / dist2)?;
        Some((spectrum, wo, f32::INFINITY))
    }

    fn compute_emissive_with_pdf<'s>(&'s self, _ray: &Ray, _compositor: &'s SpectrumCompositor) -> Option<(&'s dyn SpectrumLike, f32)> {
        None
    }
}

/// Area light over a sphere, sampled by a uniform cone toward the visible
/// cap.
pub struct SphereLight {
    pub center: Point,
    pub radius: f32,
    pub emission: SharedSpectrum,
}

fn uniform_cone_pdf(cos_theta_max: f32) -> f32 {
    1.0 / (std::f32::consts::TAU * (1.0 - cos_theta_max))
}

impl Light for SphereLight {
    fn sample<'s>(
        &'s self,
        hit_point: Point,
        visibility: &dyn VisibilityTester,
        rng: &mut dyn Rand,
        compositor: &'s SpectrumCompositor,
    ) -> Option<(&'s dyn SpectrumLike, Vector, f32)> {
        let dir = self.center - hit_point;
        let dist2 = dir.mag_sq();
        let dist = dist2.sqrt();
        if dist < 1e-6 {
            return None;
        }
        let dir = dir / dist;
        let (tangent, bitangent) = orthonormal_basis(dir);

        let r2 = self.radius * self.radius;
        let sin_theta_max_2 = (r2 / dist2).min(1.0);
        let cos_theta_max = (1.0 - sin_theta_max_2).max(0.0).sqrt();

        let u0 = rng.next_float(0.0, 1.0);
        let u1 = rng.next_float(0.0, 1.0);
        let cos_theta = (1.0 - u0) + u0 * cos_theta_max;
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = u1 * std::f32::consts::TAU;
        let (sin_phi, cos_phi) = phi.sin_cos();

        let ds = dist * cos_theta - (r2 - dist2 * sin_theta * sin_theta).max(0.0).sqrt();
        let cos_alpha = ((dist2 + r2 - ds * ds) / (2.0 * dist * self.radius)).clamp(-1.0, 1.0);
        let sin_alpha = (1.0 - cos_alpha * cos_alpha).max(0.0).sqrt();

        let offset = tangent * (sin_alpha * cos_phi) + bitangent * (sin_alpha * sin_phi) + dir * cos_alpha;
        let point = self.center + offset * self.radius;

        if !visibility.unoccluded(hit_point, point) {
            return None;
        }

        let pdf = uniform_cone_pdf(cos_theta_max);
        let to_light = (point - hit_point).normalized();
        Some((compositor.adopt(self.emission.clone()), to_light, pdf))
    }

    fn compute_emissive_with_pdf<'s>(&'s self, ray: &Ray, compositor: &'s SpectrumCompositor) -> Option<(&'s dyn SpectrumLike, f32)> {
        let dir = self.center - ray.origin;
        let dist2 = dir.mag_sq();
        let r2 = self.radius * self.radius;
        if dist2 <= r2 {
            return None;
        }
        let cos_theta_max = (1.0 - (r2 / dist2).min(1.0)).max(0.0).sqrt();
        Some((compositor.adopt(self.emission.clone()), uniform_cone_pdf(cos_theta_max)))
    }
}

fn direction_to_uv(direction: Vector) -> (f32, f32) {
    let d = direction.normalized();
    let clamped_z = d.z.clamp(-1.0, 1.0);
    let theta = clamped_z.acos();
    let mut phi = d.y.atan2(d.x);
    if phi < 0.0 {
        phi += std::f32::consts::TAU;
    }
    (phi * std::f32::consts::FRAC_1_PI * 0.5, theta * std::f32::consts::FRAC_1_PI)
}

fn uv_to_direction(u: f32, v: f32) -> Vector {
    let phi = u * std::f32::consts::TAU;
    let theta = (v - 0.5) * std::f32::consts::PI;
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vector::new(cos_phi * sin_theta, sin_phi * sin_theta, cos_theta)
}

/// Environment light backed by a `SpectrumMipmap`, importance-sampled by a
/// per-texel luminance-weighted CDF built at construction.
pub struct InfiniteEnvironmentLight {
    mipmap: SpectrumMipmap,
    cdf: Vec<f32>,
    pdf: Vec<f32>,
    width: usize,
    height: usize,
    extrapolator: Mutex<ColorExtrapolator>,
}

impl InfiniteEnvironmentLight {
    /// `texels` is the base-level `Color3` image in row-major order,
    /// `width * height` entries; both dimensions must be powers of two
    /// (the `SpectrumMipmap` contract). `extrapolator` is kept for the
    /// light's lifetime and reused by every `sample`/`compute_emissive_with_pdf`
    /// call, so its Smits cache fills in once rather than per sample.
    pub fn build(texels: Vec<Color3>, width: usize, height: usize, mut extrapolator: ColorExtrapolator) -> Result<Self> {
        if texels.len() != width * height {
            return Err(RenderError::invalid("infinite light texel count must equal width * height"));
        }

        let mut luma = vec![0.0f32; width * height];
        let mut running_total = 0.0f32;
        for y in 0..height {
            let theta = ((y as f32 + 0.5) / height as f32) * std::f32::consts::PI;
            let sin_theta = theta.sin();
            for x in 0..width {
                let l = texels[y * width + x].luma() * sin_theta;
                luma[y * width + x] = l;
                running_total += l;
            }
        }
        if running_total <= 0.0 {
            running_total = 1.0;
        }

        let mut cdf = vec![0.0f32; width * height];
        let mut pdf = vec![0.0f32; width * height];
        let mut acc = 0.0f32;
        for i in 0..width * height {
            cdf[i] = acc / running_total;
            pdf[i] = luma[i] / running_total;
            acc += luma[i];
        }

        let mipmap = SpectrumMipmap::build(texels, width, height, WrapMode::Repeat, FilterMode::Trilinear, 16.0)?;
        extrapolator.prepare(width * height);

        Ok(InfiniteEnvironmentLight {
            mipmap,
            cdf,
            pdf,
            width,
            height,
            extrapolator: Mutex::new(extrapolator),
        })
    }

    fn sample_texel(&self, u: f32) -> usize {
        // Binary search for the last cdf entry <= u, clamped so the upper
        // boundary never reads one entry past the table.
        let idx = self.cdf.partition_point(|&c| c <= u);
        idx.saturating_sub(1).min(self.cdf.len() - 1)
    }

    fn pdf_at_uv(&self, u: f32, v: f32) -> f32 {
        let x = ((u * self.width as f32) as usize).min(self.width - 1);
        let y = ((v * self.height as f32) as usize).min(self.height - 1);
        self.pdf[y * self.width + x]
    }
}

impl Light for InfiniteEnvironmentLight {
    fn sample<'s>(
        &'s self,
        _hit_point: Point,
        _visibility: &dyn VisibilityTester,
        rng: &mut dyn Rand,
        compositor: &'s SpectrumCompositor,
    ) -> Option<(&'s dyn SpectrumLike, Vector, f32)> {
        let u = rng.next_float(0.0, 1.0);
        let index = self.sample_texel(u);
        let texel_u = (index % self.width) as f32 / self.width as f32;
        let texel_v = (index / self.width) as f32 / self.height as f32;

        let du = rng.next_float(0.0, 1.0) / self.width as f32;
        let dv = rng.next_float(0.0, 1.0) / self.height as f32;
        let u = texel_u + du;
        let v = texel_v + dv;

        let mut extrapolator = self.extrapolator.lock().unwrap();
        let spectrum = self.mipmap.lookup(u, v, 0.0, 0.0, 0.0, 0.0, &mut extrapolator, compositor).ok()??;
        let direction = uv_to_direction(u, v);
        Some((spectrum, direction, self.pdf[index]))
    }

    fn compute_emissive_with_pdf<'s>(&'s self, ray: &Ray, compositor: &'s SpectrumCompositor) -> Option<(&'s dyn SpectrumLike, f32)> {
        let (u, v) = direction_to_uv(ray.direction);
        let mut extrapolator = self.extrapolator.lock().unwrap();
        let spectrum = self.mipmap.lookup(u, v, 0.0, 0.0, 0.0, 0.0, &mut extrapolator, compositor).ok()??;
        Some((spectrum, self.pdf_at_uv(u, v)))
    }
}

/// Aggregates every light in a scene; selects uniformly among them for the
/// direct-lighting estimator's light-sampling strategy.
pub struct LightList {
    lights: Vec<Arc<dyn Light>>,
}

impl LightList {
    pub fn new(lights: Vec<Arc<dyn Light>>) -> Self {
        LightList { lights }
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Picks one light uniformly, returning it alongside the probability
    /// `1 / n` with which it was chosen (used to scale the MIS estimator).
    pub fn choose(&self, rng: &mut dyn Rand) -> Option<(&dyn Light, f32)> {
        if self.lights.is_empty() {
            return None;
        }
        let idx = rng.next_index(self.lights.len());
        Some((self.lights[idx].as_ref(), 1.0 / self.lights.len() as f32))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Light>> {
        self.lights.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorSpace;
    use crate::rng::WorkerRng;
    use crate::spectrum::ConstantSpectrum;

    #[test]
    fn point_light_pdf_is_infinite_and_spectrum_falls_off() {
        let light = PointLight {
            position: Point::new(0.0, 0.0, 2.0),
            intensity: Arc::new(ConstantSpectrum::new(4.0).unwrap()),
        };
        let compositor = SpectrumCompositor::new();
        let mut rng = WorkerRng::from_seed(1);
        let (spectrum, wo, pdf) = light.sample(Point::new(0.0, 0.0, 0.0), &NoOcclusion, &mut rng, &compositor).unwrap();
        assert!(pdf.is_infinite());
        assert!((wo.mag() - 1.0).abs() < 1e-5);
        assert!((spectrum.sample(550.0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn sphere_light_sample_hits_finite_pdf() {
        let light = SphereLight {
            center: Point::new(0.0, 0.0, 5.0),
            radius: 1.0,
            emission: Arc::new(ConstantSpectrum::new(10.0).unwrap()),
        };
        let compositor = SpectrumCompositor::new();
        let mut rng = WorkerRng::from_seed(2);
        let sample = light.sample(Point::new(0.0, 0.0, 0.0), &NoOcclusion, &mut rng, &compositor);
        assert!(sample.is_some());
        let (_, _, pdf) = sample.unwrap();
        assert!(pdf.is_finite() && pdf > 0.0);
    }

    #[test]
    fn sphere_light_emissive_none_when_inside() {
        let light = SphereLight {
            center: Point::new(0.0, 0.0, 0.0),
            radius: 2.0,
            emission: Arc::new(ConstantSpectrum::new(10.0).unwrap()),
        };
        let compositor = SpectrumCompositor::new();
        let ray = Ray::new(Point::new(0.0, 0.0, 0.0), Vector::new(0.0, 0.0, 1.0));
        assert!(light.compute_emissive_with_pdf(&ray, &compositor).is_none());
    }

    #[test]
    fn infinite_light_pdf_table_sums_to_one() {
        let texels = vec![Color3::new([1.0, 1.0, 1.0], ColorSpace::LinearSrgb).unwrap(); 4];
        let light = InfiniteEnvironmentLight::build(texels, 2, 2, ColorExtrapolator::new()).unwrap();
        let total: f32 = light.pdf.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn infinite_light_texel_index_never_overflows_at_boundary() {
        // u = 1.0, v = 1.0 would index exactly at `width`/`height` without
        // the boundary clamp.
        let texels = vec![Color3::new([1.0, 0.5, 0.2], ColorSpace::LinearSrgb).unwrap(); 4];
        let light = InfiniteEnvironmentLight::build(texels, 2, 2, ColorExtrapolator::new()).unwrap();
        let _ = light.pdf_at_uv(1.0, 1.0);
    }

    #[test]
    fn light_list_choose_is_uniform_probability() {
        let a: Arc<dyn Light> = Arc::new(PointLight {
            position: Point::new(1.0, 0.0, 0.0),
            intensity: Arc::new(ConstantSpectrum::new(1.0).unwrap()),
        });
        let b: Arc<dyn Light> = Arc::new(PointLight {
            position: Point::new(0.0, 1.0, 0.0),
            intensity: Arc::new(ConstantSpectrum::new(1.0).unwrap()),
        });
        let list = LightList::new(vec![a, b]);
        let mut rng = WorkerRng::from_seed(3);
        let (_, prob) = list.choose(&mut rng).unwrap();
        assert!((prob - 0.5).abs() < 1e-6);
    }
}
