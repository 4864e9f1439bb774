//! Transport kernel and the multiple-importance-sampling direct-lighting
//! estimator it calls once per bounce, plus the `Scene` top-level object
//! the kernel traces against.
//!
//! Per-bounce state lives in two fixed-capacity `Vec`s reserved once per
//! path call from `config.max_bounces` rather than grown bounce-by-bounce;
//! a truly per-worker reservation (surviving across camera rays) would
//! need the scratch buffers to borrow from a compositor owned by the same
//! struct, which isn't expressible without a self-referential type — see
//! DESIGN.md.

use std::sync::Arc;

use crate::arena::{BsdfAllocator, ShapeHitAllocator};
use crate::compositor::{ReflectorCompositor, SpectrumCompositor};
use crate::error::{RenderError, Result};
use crate::geometry::{Point, Ray, RayDifferential};
use crate::rng::Rand;
use crate::shading::bsdf::Bsdf;
use crate::shading::light::{Light, LightList, VisibilityTester};
use crate::shading::ShadingContext;
use crate::shape::{Hit, Shape};
use crate::spectrum::SpectrumLike;

/// Top-level object traced by the kernel: the scene's shapes
/// accelerated by a BVH, plus an optional environmental light queried
/// when a ray escapes every shape's bounds.
pub struct Scene {
    bvh: crate::bvh::Bvh,
    environment: Option<Arc<dyn Light>>,
}

impl Scene {
    pub fn new(shapes: Vec<Box<dyn Shape>>, environment: Option<Arc<dyn Light>>) -> Self {
        Scene {
            bvh: crate::bvh::Bvh::build(shapes),
            environment,
        }
    }

    pub fn trace<'a>(&'a self, ray: &Ray, alloc: &'a ShapeHitAllocator) -> Option<&'a Hit<'a>> {
        self.bvh.trace(ray, alloc)
    }

    pub fn environment(&self) -> Option<&Arc<dyn Light>> {
        self.environment.as_ref()
    }

    pub fn shape_count(&self) -> usize {
        self.bvh.shape_count()
    }
}

/// Occlusion test backed by a scene's BVH, the `VisibilityTester`
/// parameter threaded through `Light::sample`.
/// Offsets both endpoints along the ray direction by a small epsilon so
/// the shadow ray doesn't immediately re-hit the surface it was spawned
/// from.
pub struct SceneVisibilityTester<'a> {
    pub scene: &'a Scene,
    pub alloc: &'a ShapeHitAllocator,
}

const SHADOW_EPSILON: f32 = 1e-4;

impl<'a> VisibilityTester for SceneVisibilityTester<'a> {
    fn unoccluded(&self, from: Point, to: Point) -> bool {
        let delta = to - from;
        let dist = delta.mag();
        if dist < SHADOW_EPSILON {
            return true;
        }
        let dir = delta / dist;
        let ray = Ray::new(from + dir * SHADOW_EPSILON, dir);
        let max_dist = dist - 2.0 * SHADOW_EPSILON;
        match self.scene.trace(&ray, self.alloc) {
            Some(hit) => hit.distance >= max_dist,
            None => true,
        }
    }
}

/// Validated configuration for a `PathTracer`.
#[derive(Clone, Copy, Debug)]
pub struct PathTracerConfig {
    pub min_bounces: u8,
    pub max_bounces: u8,
    pub min_termination_probability: f32,
    pub roulette_threshold: f32,
}

impl PathTracerConfig {
    pub fn new(min_bounces: u8, max_bounces: u8, min_termination_probability: f32, roulette_threshold: f32) -> Result<Self> {
        if min_bounces > max_bounces {
            return Err(RenderError::invalid("min_bounces must not exceed max_bounces"));
        }
        if !min_termination_probability.is_finite() || !(0.0..=1.0).contains(&min_termination_probability) {
            return Err(RenderError::invalid("min_termination_probability must be finite and within [0, 1]"));
        }
        if !roulette_threshold.is_finite() || roulette_threshold < 0.0 {
            return Err(RenderError::invalid("roulette_threshold must be finite and non-negative"));
        }
        Ok(PathTracerConfig {
            min_bounces,
            max_bounces,
            min_termination_probability,
            roulette_threshold,
        })
    }
}

/// Power heuristic: `pdf_a^2 / (pdf_a^2 + pdf_b^2)`, with
/// `weight(+INF, x) = 1` and `weight(x, +INF) = 0` so a delta-distribution
/// pdf always wins without producing `inf/inf`.
pub fn power_heuristic(pdf_a: f32, pdf_b: f32) -> f32 {
    if pdf_a.is_infinite() {
        return 1.0;
    }
    if pdf_b.is_infinite() {
        return 0.0;
    }
    let a2 = pdf_a * pdf_a;
    let b2 = pdf_b * pdf_b;
    let denom = a2 + b2;
    if denom <= 0.0 {
        0.0
    } else {
        a2 / denom
    }
}

pub struct PathTracer {
    config: PathTracerConfig,
}

impl PathTracer {
    pub fn new(config: PathTracerConfig) -> Self {
        PathTracer { config }
    }

    pub fn config(&self) -> &PathTracerConfig {
        &self.config
    }

    /// MIS direct-lighting estimator for one `(light, bsdf, hit)` triple.
    #[allow(clippy::too_many_arguments)]
    fn direct_lighting_mis<'s>(
        &self,
        ctx: &ShadingContext,
        bsdf: &'s dyn Bsdf,
        light: &'s dyn Light,
        visibility: &dyn VisibilityTester,
        rng: &mut dyn Rand,
        spectrum_c: &'s SpectrumCompositor,
        reflector_c: &'s ReflectorCompositor,
    ) -> Option<&'s dyn SpectrumLike> {
        let n = ctx.shading_normal;
        let (l_light, w_light, p_light) = light.sample(ctx.point, visibility, rng, spectrum_c)?;

        if p_light.is_infinite() {
            // Delta light: no continuous pdf to weight against, so the
            // BSDF-sampled estimator contributes nothing for this light.
            let r_at_light = bsdf.compute_diffuse(ctx.wi, w_light, n, reflector_c)?;
            let cos = n.dot(w_light).abs();
            return spectrum_c.attenuate_reflection(Some(l_light), r_at_light, cos);
        }

        let mut emission: Option<&'s dyn SpectrumLike> = None;

        let (r_at_light, p_bsdf_at_light) = bsdf.compute_diffuse_with_pdf(ctx.wi, w_light, n, reflector_c);
        if let Some(r_at_light) = r_at_light {
            if p_bsdf_at_light > 0.0 {
                let weight = power_heuristic(p_light, p_bsdf_at_light);
                let cos = n.dot(w_light).abs();
                let contribution = spectrum_c.attenuate_reflection(Some(l_light), r_at_light, cos * weight / p_light);
                emission = spectrum_c.add(emission, contribution);
            }
        }

        let bsdf_sample = bsdf.sample(ctx.wi, n, rng, reflector_c);
        if let Some(r_bsdf) = bsdf_sample.reflector {
            if bsdf_sample.pdf > 0.0 {
                let probe = Ray::new(ctx.point, bsdf_sample.wo);
                if let Some((l_at_bsdf, p_light_at_bsdf)) = light.compute_emissive_with_pdf(&probe, spectrum_c) {
                    if p_light_at_bsdf > 0.0 {
                        let weight = power_heuristic(bsdf_sample.pdf, p_light_at_bsdf);
                        let cos = n.dot(bsdf_sample.wo).abs();
                        let contribution = spectrum_c.attenuate_reflection(Some(l_at_bsdf), r_bsdf, cos * weight / bsdf_sample.pdf);
                        emission = spectrum_c.add(emission, contribution);
                    }
                }
            }
        }

        emission
    }

    /// Traces one camera-ray path to completion and
    /// combines its per-bounce spectra back-to-front through the
    /// spectrum compositor, returning the accumulated radiance.
    #[allow(clippy::too_many_arguments)]
    pub fn trace_path<'s>(
        &self,
        scene: &'s Scene,
        lights: &'s LightList,
        camera_ray: RayDifferential,
        rng: &mut dyn Rand,
        hit_alloc: &'s ShapeHitAllocator,
        bsdf_alloc: &'s BsdfAllocator,
        spectrum_c: &'s SpectrumCompositor,
        reflector_c: &'s ReflectorCompositor,
    ) -> Option<&'s dyn SpectrumLike> {
        let max_bounces = self.config.max_bounces as usize;
        let mut spectra: Vec<Option<&'s dyn SpectrumLike>> = vec![None; max_bounces + 1];
        let mut reflectors: Vec<Option<&'s dyn crate::spectrum::ReflectorLike>> = vec![None; max_bounces + 1];
        let mut attenuations: Vec<f32> = vec![1.0; max_bounces + 1];

        let mut throughput = 1.0f32;
        let mut add_emissions = true;
        let mut ray = camera_ray.ray;
        let mut bounce = 0usize;

        loop {
            let hit = match scene.trace(&ray, hit_alloc) {
                Some(h) => h,
                None => {
                    if add_emissions {
                        if let Some(env) = scene.environment() {
                            if let Some((l, _p)) = env.compute_emissive_with_pdf(&ray, spectrum_c) {
                                spectra[bounce] = spectrum_c.add(spectra[bounce], Some(l));
                            }
                        }
                    }
                    break;
                }
            };

            let world_point = hit.shape.to_world_point(hit.point);
            let geometric_normal = hit.shape.normal(hit.point, hit.face);
            let texcoord = hit
                .shape
                .texture_coord_map(hit.face)
                .map(|m| m.map(hit.texcoord))
                .unwrap_or(hit.texcoord);
            let shading_normal = hit
                .shape
                .normal_map(hit.face)
                .map(|m| m.perturb(geometric_normal, texcoord))
                .unwrap_or(geometric_normal);
            let wi = (-ray.direction).normalized();
            let ctx = ShadingContext {
                point: world_point,
                geometric_normal,
                shading_normal,
                texcoord,
                wi,
            };

            if add_emissions {
                if let Some(emissive) = hit.shape.emissive(hit.face) {
                    let emissive: &'s crate::shading::material::SharedEmissiveMaterial = bsdf_alloc.bump().alloc(emissive);
                    let emitted = emissive.emit(&ctx, spectrum_c);
                    spectra[bounce] = spectrum_c.add(spectra[bounce], emitted);
                }
            }
            add_emissions = false;

            let Some(material) = hit.shape.material(hit.face) else {
                break;
            };
            // Parked in the BSDF arena (rather than kept as a bare local) so
            // the borrow `Material::sample` ties to `self` outlives this
            // bounce: its BSDF's derived reflectors are read back in the
            // back-to-front combine below, long after this iteration ends.
            let material: &'s crate::shading::material::SharedMaterial = bsdf_alloc.bump().alloc(material);
            let bsdf = material.sample(&ctx, bsdf_alloc);

            if let Some((light, prob)) = lights.choose(rng) {
                if prob > 0.0 {
                    let visibility = SceneVisibilityTester { scene, alloc: hit_alloc };
                    let mis = self.direct_lighting_mis(&ctx, bsdf, light, &visibility, rng, spectrum_c, reflector_c);
                    let contribution = spectrum_c.attenuate(mis, 1.0 / prob);
                    spectra[bounce] = spectrum_c.add(spectra[bounce], contribution);
                }
            }

            if bounce == max_bounces {
                break;
            }

            let sample = bsdf.sample(ctx.wi, ctx.shading_normal, rng, reflector_c);
            let Some(reflector) = sample.reflector else {
                break;
            };
            if sample.pdf <= 0.0 {
                break;
            }

            throughput *= reflector.albedo();

            let mut attenuation = if sample.pdf.is_finite() {
                ctx.shading_normal.dot(sample.wo).abs() / sample.pdf
            } else {
                1.0
            };
            throughput *= attenuation;

            if bounce > self.config.min_bounces as usize && throughput < self.config.roulette_threshold {
                let u = rng.next_float(0.0, 1.0);
                let cutoff = (1.0 - throughput).max(self.config.min_termination_probability);
                if u < cutoff {
                    break;
                }
                let survive = 1.0 - cutoff;
                attenuation /= survive;
                throughput /= survive;
            }

            if sample.kind.is_specular() {
                add_emissions = true;
            }

            reflectors[bounce] = Some(reflector);
            attenuations[bounce] = attenuation;

            let offset = ctx.geometric_normal * SHADOW_EPSILON * ctx.geometric_normal.dot(sample.wo).signum();
            ray = Ray::new(world_point + offset, sample.wo);
            bounce += 1;
        }

        for b in (1..=bounce).rev() {
            let Some(reflector) = reflectors[b - 1] else { continue };
            let contribution = spectrum_c.attenuate_reflection(spectra[b], reflector, attenuations[b - 1]);
            spectra[b - 1] = spectrum_c.add(spectra[b - 1], contribution);
        }

        spectra[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::WorkerRng;
    use crate::shading::light::PointLight;
    use crate::shading::material::{DiffuseEmissiveMaterial, LambertianMaterial};
    use crate::shape::sphere::Sphere;
    use crate::spectrum::{ConstantReflector, ConstantSpectrum};

    #[test]
    fn power_heuristic_normalizes() {
        for (a, b) in [(1.0f32, 2.0f32), (0.5, 0.5), (3.0, 0.001)] {
            let w = power_heuristic(a, b) + power_heuristic(b, a);
            assert!((w - 1.0).abs() < 1e-5);
        }
        assert_eq!(power_heuristic(f32::INFINITY, 2.0), 1.0);
        assert_eq!(power_heuristic(2.0, f32::INFINITY), 0.0);
    }

    #[test]
    fn config_rejects_inverted_bounces() {
        assert!(PathTracerConfig::new(5, 2, 0.05, 0.1).is_err());
    }

    #[test]
    fn config_rejects_out_of_range_probability() {
        assert!(PathTracerConfig::new(0, 4, 1.5, 0.1).is_err());
    }

    #[test]
    fn single_sphere_red_lambertian_no_lights_is_red_where_hit() {
        let reflectance: crate::spectrum::SharedReflector = Arc::new(ConstantReflector::new(0.0).unwrap());
        let material = Arc::new(LambertianMaterial { reflectance });
        let emissive = Arc::new(DiffuseEmissiveMaterial {
            radiance: Arc::new(ConstantSpectrum::new(1.0).unwrap()),
        });
        let sphere = Sphere::new(1.0, material, Some(emissive), None);
        let scene = Scene::new(vec![Box::new(sphere)], None);
        let lights = LightList::new(vec![]);
        let config = PathTracerConfig::new(0, 2, 0.05, 0.1).unwrap();
        let tracer = PathTracer::new(config);

        let hit_alloc = ShapeHitAllocator::new();
        let bsdf_alloc = BsdfAllocator::new();
        let spectrum_c = SpectrumCompositor::new();
        let reflector_c = ReflectorCompositor::new();
        let mut rng = WorkerRng::from_seed(1);

        let ray = RayDifferential::without_differentials(Ray::new(Point::new(0.0, 0.0, -4.0), crate::geometry::Vector::new(0.0, 0.0, 1.0)));
        let result = tracer.trace_path(&scene, &lights, ray, &mut rng, &hit_alloc, &bsdf_alloc, &spectrum_c, &reflector_c);
        assert!(result.is_some());
        assert!(result.unwrap().sample(550.0) > 0.0);

        let miss_ray = RayDifferential::without_differentials(Ray::new(Point::new(5.0, 5.0, -4.0), crate::geometry::Vector::new(0.0, 0.0, 1.0)));
        let miss = tracer.trace_path(&scene, &lights, miss_ray, &mut rng, &hit_alloc, &bsdf_alloc, &spectrum_c, &reflector_c);
        assert!(miss.is_none());
    }

    #[test]
    fn path_with_point_light_produces_positive_direct_lighting() {
        let reflectance: crate::spectrum::SharedReflector = Arc::new(ConstantReflector::new(0.8).unwrap());
        let material = Arc::new(LambertianMaterial { reflectance });
        let sphere = Sphere::new(1.0, material, None, None);
        let scene = Scene::new(vec![Box::new(sphere)], None);
        let light: Arc<dyn Light> = Arc::new(PointLight {
            position: Point::new(0.0, 3.0, -4.0),
            intensity: Arc::new(ConstantSpectrum::new(20.0).unwrap()),
        });
        let lights = LightList::new(vec![light]);
        let config = PathTracerConfig::new(0, 1, 0.05, 0.1).unwrap();
        let tracer = PathTracer::new(config);

        let hit_alloc = ShapeHitAllocator::new();
        let bsdf_alloc = BsdfAllocator::new();
        let spectrum_c = SpectrumCompositor::new();
        let reflector_c = ReflectorCompositor::new();
        let mut rng = WorkerRng::from_seed(9);

        let ray = RayDifferential::without_differentials(Ray::new(Point::new(0.0, 0.0, -4.0), crate::geometry::Vector::new(0.0, 0.0, 1.0)));
        let result = tracer.trace_path(&scene, &lights, ray, &mut rng, &hit_alloc, &bsdf_alloc, &spectrum_c, &reflector_c);
        assert!(result.is_some());
        assert!(result.unwrap().sample(550.0) > 0.0);
    }
}
