//! Material capability set: `sample(hit-context) -> BSDF`, with the BSDF
//! allocated from a scoped `BsdfAllocator`. A material is a cheap factory
//! that stamps out a transient BSDF instance per shading call, borrowing
//! its reflectance data from the material's own (scene-lifetime) fields.

use std::sync::Arc;

use crate::arena::BsdfAllocator;
use crate::compositor::SpectrumCompositor;
use crate::shading::bsdf::{Aggregate, AlphaBlend, Bsdf, Lambertian, Mirror, OrenNayar, SpecularDielectric, TrowbridgeReitz};
use crate::shading::ShadingContext;
use crate::spectrum::{SharedReflector, SharedSpectrum, SpectrumLike};

pub trait Material: Send + Sync {
    fn sample<'b>(&'b self, ctx: &ShadingContext, bsdf_alloc: &'b BsdfAllocator) -> &'b dyn Bsdf;
}

pub type SharedMaterial = Arc<dyn Material>;

/// A material that also emits radiance; kept distinct from `Material` since most surfaces
/// have no emission and an `Option<&dyn EmissiveMaterial>` lets shapes
/// return `None` cheaply.
pub trait EmissiveMaterial: Send + Sync {
    fn emit<'s>(&'s self, ctx: &ShadingContext, compositor: &'s SpectrumCompositor) -> Option<&'s dyn SpectrumLike>;
}

pub type SharedEmissiveMaterial = Arc<dyn EmissiveMaterial>;

pub struct LambertianMaterial {
    pub reflectance: SharedReflector,
}

impl Material for LambertianMaterial {
    fn sample<'b>(&'b self, _ctx: &ShadingContext, bsdf_alloc: &'b BsdfAllocator) -> &'b dyn Bsdf {
        bsdf_alloc.bump().alloc_with(|| Lambertian {
            reflectance: self.reflectance.as_ref(),
        })
    }
}

pub struct OrenNayarMaterial {
    pub reflectance: SharedReflector,
    pub sigma: f32,
}

impl Material for OrenNayarMaterial {
    fn sample<'b>(&'b self, _ctx: &ShadingContext, bsdf_alloc: &'b BsdfAllocator) -> &'b dyn Bsdf {
        bsdf_alloc.bump().alloc_with(|| OrenNayar {
            reflectance: self.reflectance.as_ref(),
            sigma: self.sigma,
        })
    }
}

pub struct MirrorMaterial {
    pub reflectance: SharedReflector,
}

impl Material for MirrorMaterial {
    fn sample<'b>(&'b self, _ctx: &ShadingContext, bsdf_alloc: &'b BsdfAllocator) -> &'b dyn Bsdf {
        bsdf_alloc.bump().alloc_with(|| Mirror {
            reflectance: self.reflectance.as_ref(),
        })
    }
}

pub struct SpecularDielectricMaterial {
    pub reflectance: SharedReflector,
    pub eta_i: f32,
    pub eta_t: f32,
}

impl Material for SpecularDielectricMaterial {
    fn sample<'b>(&'b self, _ctx: &ShadingContext, bsdf_alloc: &'b BsdfAllocator) -> &'b dyn Bsdf {
        bsdf_alloc.bump().alloc_with(|| SpecularDielectric {
            reflectance: self.reflectance.as_ref(),
            eta_i: self.eta_i,
            eta_t: self.eta_t,
        })
    }
}

pub struct TrowbridgeReitzMaterial {
    pub reflectance: SharedReflector,
    pub alpha_x: f32,
    pub alpha_y: f32,
    pub eta_i: f32,
    pub eta_t: f32,
}

impl Material for TrowbridgeReitzMaterial {
    fn sample<'b>(&'b self, _ctx: &ShadingContext, bsdf_alloc: &'b BsdfAllocator) -> &'b dyn Bsdf {
        bsdf_alloc.bump().alloc_with(|| TrowbridgeReitz {
            reflectance: self.reflectance.as_ref(),
            alpha_x: self.alpha_x,
            alpha_y: self.alpha_y,
            eta_i: self.eta_i,
            eta_t: self.eta_t,
        })
    }
}

/// Probabilistic pass-through over a base material, e.g. for leaf/foliage
/// cutout textures.
pub struct AlphaBlendMaterial {
    pub alpha: f32,
    pub base: SharedMaterial,
}

impl Material for AlphaBlendMaterial {
    fn sample<'b>(&'b self, ctx: &ShadingContext, bsdf_alloc: &'b BsdfAllocator) -> &'b dyn Bsdf {
        let base = self.base.sample(ctx, bsdf_alloc);
        bsdf_alloc.bump().alloc_with(|| AlphaBlend { alpha: self.alpha, base })
    }
}

/// Combines several child materials into one aggregate BSDF. Each child's
/// BSDF is built into the same bump allocator,
/// so the aggregate's slice of `&dyn Bsdf` borrows live exactly as long as
/// the shading call.
pub struct AggregateMaterial {
    pub children: Vec<SharedMaterial>,
}

impl Material for AggregateMaterial {
    fn sample<'b>(&'b self, ctx: &ShadingContext, bsdf_alloc: &'b BsdfAllocator) -> &'b dyn Bsdf {
        let built: Vec<&'b dyn Bsdf> = self.children.iter().map(|child| child.sample(ctx, bsdf_alloc)).collect();
        let slice: &'b [&'b dyn Bsdf] = bsdf_alloc.bump().alloc_slice_copy(&built);
        bsdf_alloc.bump().alloc_with(|| Aggregate { children: slice })
    }
}

/// Constant-radiance emitter, independent of outgoing direction and
/// texture coordinate (the common "area light" case).
pub struct DiffuseEmissiveMaterial {
    pub radiance: SharedSpectrum,
}

impl EmissiveMaterial for DiffuseEmissiveMaterial {
    fn emit<'s>(&'s self, _ctx: &ShadingContext, compositor: &'s SpectrumCompositor) -> Option<&'s dyn SpectrumLike> {
        Some(compositor.adopt(self.radiance.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Normal, Point, Vector};
    use crate::rng::WorkerRng;
    use crate::shading::maps::TexCoord;
    use crate::spectrum::{ConstantReflector, ConstantSpectrum};

    fn ctx() -> ShadingContext {
        ShadingContext {
            point: Point::new(0.0, 0.0, 0.0),
            geometric_normal: Normal::new(0.0, 0.0, 1.0),
            shading_normal: Normal::new(0.0, 0.0, 1.0),
            texcoord: TexCoord::None,
            wi: Vector::new(0.0, 0.0, 1.0),
        }
    }

    #[test]
    fn lambertian_material_produces_usable_bsdf() {
        let reflectance: SharedReflector = Arc::new(ConstantReflector::new(0.5).unwrap());
        let material = LambertianMaterial { reflectance };
        let mut alloc = BsdfAllocator::new();
        let compositor = crate::compositor::ReflectorCompositor::new();
        let mut rng = WorkerRng::from_seed(11);
        let bsdf = material.sample(&ctx(), &alloc);
        let sample = bsdf.sample(Vector::new(0.0, 0.0, 1.0), Normal::new(0.0, 0.0, 1.0), &mut rng, &compositor);
        assert!(sample.reflector.is_some());
        alloc.reset();
    }

    #[test]
    fn aggregate_material_builds_all_children() {
        let a: SharedMaterial = Arc::new(LambertianMaterial {
            reflectance: Arc::new(ConstantReflector::new(0.2).unwrap()),
        });
        let b: SharedMaterial = Arc::new(MirrorMaterial {
            reflectance: Arc::new(ConstantReflector::new(1.0).unwrap()),
        });
        let aggregate = AggregateMaterial { children: vec![a, b] };
        let alloc = BsdfAllocator::new();
        let bsdf = aggregate.sample(&ctx(), &alloc);
        let compositor = crate::compositor::ReflectorCompositor::new();
        let (f, pdf) = bsdf.compute_diffuse_with_pdf(
            Vector::new(0.0, 0.0, 1.0),
            Vector::new(0.1, 0.0, 1.0),
            Normal::new(0.0, 0.0, 1.0),
            &compositor,
        );
        assert!(f.is_some());
        assert!(pdf >= 0.0);
    }

    #[test]
    fn diffuse_emissive_material_emits_constant_spectrum() {
        let material = DiffuseEmissiveMaterial {
            radiance: Arc::new(ConstantSpectrum::new(3.0).unwrap()),
        };
        let compositor = SpectrumCompositor::new();
        let emitted = material.emit(&ctx(), &compositor).unwrap();
        assert_eq!(SpectrumLike::sample(emitted, 550.0), 3.0);
    }
}
