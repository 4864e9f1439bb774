//! BSDF capability set: `sample`, `compute_diffuse`,
//! `compute_diffuse_with_pdf`. A pdf of `+INFINITY` marks a Dirac-delta
//! (specular) lobe; the caller applies the `|N·ω|` falloff itself for
//! those samples instead of dividing by pdf.
//!
//! BSDFs are allocated from a `BsdfAllocator` bound to one shading call
//! and hold only borrowed references to spectral graph nodes, never owned
//! ones.

use crate::compositor::ReflectorCompositor;
use crate::geometry::{cosine_sample_hemisphere, orthonormal_basis, reflect, refract, Normal, Vector};
use crate::rng::Rand;
use crate::spectrum::ReflectorLike;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Reflection,
    Transmission,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lobe {
    Diffuse,
    Specular,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleKind {
    pub transport: Transport,
    pub lobe: Lobe,
}

impl SampleKind {
    pub fn is_specular(self) -> bool {
        self.lobe == Lobe::Specular
    }
}

/// Result of `Bsdf::sample`: a sampled reflectance (`None` = absorbed),
/// the sample's transport/lobe classification, the outgoing direction and
/// its pdf (`f32::INFINITY` for a delta lobe).
pub struct BsdfSample<'s> {
    pub reflector: Option<&'s dyn ReflectorLike>,
    pub kind: SampleKind,
    pub wo: Vector,
    pub pdf: f32,
}

/// `wi`/`wo` both point away from the surface (incoming toward the eye,
/// outgoing toward the next vertex), following the convention of treating
/// transport symmetrically at either end of a path segment.
pub trait Bsdf: Send + Sync {
    fn sample<'s>(
        &'s self,
        wi: Vector,
        n_shading: Normal,
        rng: &mut dyn Rand,
        compositor: &'s ReflectorCompositor,
    ) -> BsdfSample<'s>;

    fn compute_diffuse<'s>(&'s self, wi: Vector, wo: Vector, n_shading: Normal, compositor: &'s ReflectorCompositor) -> Option<&'s dyn ReflectorLike>;

    fn compute_diffuse_with_pdf<'s>(
        &'s self,
        wi: Vector,
        wo: Vector,
        n_shading: Normal,
        compositor: &'s ReflectorCompositor,
    ) -> (Option<&'s dyn ReflectorLike>, f32);
}

fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta.max(0.0) / std::f32::consts::PI
}

/// Transforms a local-frame (tangent, bitangent, normal) sample into world
/// space.
fn to_world(n: Normal, local: Vector) -> Vector {
    let (t, b) = orthonormal_basis(n);
    (t * local.x + b * local.y + n * local.z).normalized()
}

/// Cosine-hemisphere diffuse reflectance (Lambertian).
pub struct Lambertian<'a> {
    pub reflectance: &'a dyn ReflectorLike,
}

impl Bsdf for Lambertian<'_> {
    fn sample<'s>(&'s self, _wi: Vector, n_shading: Normal, rng: &mut dyn Rand, _compositor: &'s ReflectorCompositor) -> BsdfSample<'s> {
        let local = cosine_sample_hemisphere(rng.next_float(0.0, 1.0), rng.next_float(0.0, 1.0), 1.0);
        let wo = to_world(n_shading, local);
        BsdfSample {
            reflector: Some(self.reflectance),
            kind: SampleKind {
                transport: Transport::Reflection,
                lobe: Lobe::Diffuse,
            },
            wo,
            pdf: cosine_hemisphere_pdf(local.z),
        }
    }

    fn compute_diffuse<'s>(&'s self, _wi: Vector, _wo: Vector, _n_shading: Normal, compositor: &'s ReflectorCompositor) -> Option<&'s dyn ReflectorLike> {
        compositor.attenuate(Some(self.reflectance), std::f32::consts::FRAC_1_PI)
    }

    fn compute_diffuse_with_pdf<'s>(
        &'s self,
        _wi: Vector,
        wo: Vector,
        n_shading: Normal,
        compositor: &'s ReflectorCompositor,
    ) -> (Option<&'s dyn ReflectorLike>, f32) {
        let f = compositor.attenuate(Some(self.reflectance), std::f32::consts::FRAC_1_PI);
        (f, cosine_hemisphere_pdf(wo.dot(n_shading)))
    }
}

/// Oren-Nayar rough-diffuse reflectance, sampled like Lambertian, with the
/// classic qualitative roughness modulation (σ in radians).
pub struct OrenNayar<'a> {
    pub reflectance: &'a dyn ReflectorLike,
    pub sigma: f32,
}

impl OrenNayar<'_> {
    fn ab(&self) -> (f32, f32) {
        let s2 = self.sigma * self.sigma;
        let a = 1.0 - s2 / (2.0 * (s2 + 0.33));
        let b = 0.45 * s2 / (s2 + 0.09);
        (a, b)
    }

    fn modulation(&self, wi: Vector, wo: Vector, n: Normal) -> f32 {
        let (t, bitangent) = orthonormal_basis(n);
        let cos_i = wi.dot(n).clamp(-1.0, 1.0);
        let cos_o = wo.dot(n).clamp(-1.0, 1.0);
        let sin_i = (1.0 - cos_i * cos_i).max(0.0).sqrt();
        let sin_o = (1.0 - cos_o * cos_o).max(0.0).sqrt();

        let cos_phi_diff = if sin_i > 1e-6 && sin_o > 1e-6 {
            let wi_proj = (wi.dot(t) * t + wi.dot(bitangent) * bitangent).normalized();
            let wo_proj = (wo.dot(t) * t + wo.dot(bitangent) * bitangent).normalized();
            wi_proj.dot(wo_proj).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let (sin_alpha, tan_beta) = if cos_i.abs() > cos_o.abs() {
            (sin_o, sin_i / cos_i.abs().max(1e-4))
        } else {
            (sin_i, sin_o / cos_o.abs().max(1e-4))
        };

        let (a, b) = self.ab();
        a + b * cos_phi_diff.max(0.0) * sin_alpha * tan_beta
    }
}

impl Bsdf for OrenNayar<'_> {
    fn sample<'s>(&'s self, wi: Vector, n_shading: Normal, rng: &mut dyn Rand, compositor: &'s ReflectorCompositor) -> BsdfSample<'s> {
        let local = cosine_sample_hemisphere(rng.next_float(0.0, 1.0), rng.next_float(0.0, 1.0), 1.0);
        let wo = to_world(n_shading, local);
        let f = self.compute_diffuse(wi, wo, n_shading, compositor);
        // Cancels the cosine-hemisphere pdf (pi/cos) analytically, same
        // trick used for Lambertian.
        let reflector = compositor.attenuate(f, std::f32::consts::PI);
        BsdfSample {
            reflector,
            kind: SampleKind {
                transport: Transport::Reflection,
                lobe: Lobe::Diffuse,
            },
            wo,
            pdf: cosine_hemisphere_pdf(local.z),
        }
    }

    fn compute_diffuse<'s>(&'s self, wi: Vector, wo: Vector, n_shading: Normal, compositor: &'s ReflectorCompositor) -> Option<&'s dyn ReflectorLike> {
        let modulation = self.modulation(wi, wo, n_shading) * std::f32::consts::FRAC_1_PI;
        compositor.attenuate(Some(self.reflectance), modulation)
    }

    fn compute_diffuse_with_pdf<'s>(
        &'s self,
        wi: Vector,
        wo: Vector,
        n_shading: Normal,
        compositor: &'s ReflectorCompositor,
    ) -> (Option<&'s dyn ReflectorLike>, f32) {
        let f = self.compute_diffuse(wi, wo, n_shading, compositor);
        (f, cosine_hemisphere_pdf(wo.dot(n_shading)))
    }
}

/// Perfect mirror: one reflection direction, `pdf = +INFINITY`.
pub struct Mirror<'a> {
    pub reflectance: &'a dyn ReflectorLike,
}

impl Bsdf for Mirror<'_> {
    fn sample<'s>(&'s self, wi: Vector, n_shading: Normal, _rng: &mut dyn Rand, _compositor: &'s ReflectorCompositor) -> BsdfSample<'s> {
        BsdfSample {
            reflector: Some(self.reflectance),
            kind: SampleKind {
                transport: Transport::Reflection,
                lobe: Lobe::Specular,
            },
            wo: reflect(wi, n_shading),
            pdf: f32::INFINITY,
        }
    }

    fn compute_diffuse<'s>(&'s self, _wi: Vector, _wo: Vector, _n_shading: Normal, _compositor: &'s ReflectorCompositor) -> Option<&'s dyn ReflectorLike> {
        None
    }

    fn compute_diffuse_with_pdf<'s>(&'s self, _wi: Vector, _wo: Vector, _n_shading: Normal, _compositor: &'s ReflectorCompositor) -> (Option<&'s dyn ReflectorLike>, f32) {
        (None, 0.0)
    }
}

/// Fresnel-weighted specular dielectric (smooth glass). Chooses between
/// reflection and refraction in proportion to the Fresnel term; total
/// internal reflection forces the reflection branch.
pub struct SpecularDielectric<'a> {
    pub reflectance: &'a dyn ReflectorLike,
    pub eta_i: f32,
    pub eta_t: f32,
}

/// Fresnel reflectance for unpolarised light at a dielectric interface
/// (ported from `FresnelDielectric`, `microfacet_bsdf.c`).
pub fn fresnel_dielectric(cos_theta_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    let cos_theta_i = cos_theta_i.min(1.0);
    let sin_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0).sqrt();
    let sin_theta_t = eta_i / eta_t * sin_theta_i;
    if sin_theta_t >= 1.0 {
        return 1.0;
    }
    let cos_theta_t = (1.0 - sin_theta_t * sin_theta_t).max(0.0).sqrt();
    let r_parallel = (eta_t * cos_theta_i - eta_i * cos_theta_t) / (eta_t * cos_theta_i + eta_i * cos_theta_t);
    let r_perp = (eta_i * cos_theta_i - eta_t * cos_theta_t) / (eta_i * cos_theta_i + eta_t * cos_theta_t);
    0.5 * (r_parallel * r_parallel + r_perp * r_perp)
}

impl Bsdf for SpecularDielectric<'_> {
    fn sample<'s>(&'s self, wi: Vector, n_shading: Normal, rng: &mut dyn Rand, _compositor: &'s ReflectorCompositor) -> BsdfSample<'s> {
        let entering = wi.dot(n_shading) > 0.0;
        let (n, eta_i, eta_t) = if entering {
            (n_shading, self.eta_i, self.eta_t)
        } else {
            (-n_shading, self.eta_t, self.eta_i)
        };
        let cos_theta_i = wi.dot(n).max(0.0);
        let fresnel = fresnel_dielectric(cos_theta_i, eta_i, eta_t);

        let refracted = refract(wi, n, eta_i / eta_t);
        let (wo, transport) = match refracted {
            Some(wt) if rng.next_float(0.0, 1.0) >= fresnel => (wt, Transport::Transmission),
            _ => (reflect(wi, n), Transport::Reflection),
        };

        BsdfSample {
            reflector: Some(self.reflectance),
            kind: SampleKind {
                transport,
                lobe: Lobe::Specular,
            },
            wo,
            pdf: f32::INFINITY,
        }
    }

    fn compute_diffuse<'s>(&'s self, _wi: Vector, _wo: Vector, _n_shading: Normal, _compositor: &'s ReflectorCompositor) -> Option<&'s dyn ReflectorLike> {
        None
    }

    fn compute_diffuse_with_pdf<'s>(&'s self, _wi: Vector, _wo: Vector, _n_shading: Normal, _compositor: &'s ReflectorCompositor) -> (Option<&'s dyn ReflectorLike>, f32) {
        (None, 0.0)
    }
}

/// Trowbridge-Reitz (GGX) microfacet BSDF with anisotropic roughness,
/// sampled via visible-normal (slope-space) sampling (ported from
/// `TrowbridgeReitzSample11`/`TrowbridgeReitzD`/`Lambda`/`G`/`Pdf` in
/// `microfacet_bsdf.c`).
pub struct TrowbridgeReitz<'a> {
    pub reflectance: &'a dyn ReflectorLike,
    pub alpha_x: f32,
    pub alpha_y: f32,
    pub eta_i: f32,
    pub eta_t: f32,
}

fn tr_lambda(alpha_x: f32, alpha_y: f32, v: Vector, n: Normal, orthogonal: Vector) -> f32 {
    let cos_theta = v.dot(n);
    if cos_theta == 0.0 {
        return 0.0;
    }
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let tan_theta = sin_theta / cos_theta;

    let cos_phi = v.dot(orthogonal) / sin_theta.max(1e-8);
    let cos2_phi = cos_phi * cos_phi;
    let sin2_phi = (1.0 - cos2_phi).max(0.0);

    let alpha = (cos2_phi * alpha_x * alpha_x + sin2_phi * alpha_y * alpha_y).sqrt();
    let alpha_tan_theta = alpha * tan_theta;
    0.5 * (-1.0 + (1.0 + alpha_tan_theta * alpha_tan_theta).sqrt())
}

fn tr_d(alpha_x: f32, alpha_y: f32, half_angle: Vector, n: Normal, orthogonal: Vector) -> f32 {
    let cos_theta = half_angle.dot(n);
    let cos2_theta = cos_theta * cos_theta;
    let sin2_theta = (1.0 - cos2_theta).max(0.0);
    if cos2_theta <= 1e-12 {
        return 0.0;
    }
    let tan2_theta = sin2_theta / cos2_theta;
    let cos4_theta = cos2_theta * cos2_theta;

    let sin_theta = sin2_theta.sqrt();
    let cos_phi = half_angle.dot(orthogonal) / sin_theta.max(1e-8);
    let cos2_phi = cos_phi * cos_phi;
    let sin2_phi = (1.0 - cos2_phi).max(0.0);

    let exponent = tan2_theta * (cos2_phi / (alpha_x * alpha_x) + sin2_phi / (alpha_y * alpha_y));
    let one_plus_e = 1.0 + exponent;
    let denom = std::f32::consts::PI * alpha_x * alpha_y * cos4_theta * one_plus_e * one_plus_e;
    1.0 / denom
}

fn tr_g1(lambda: f32) -> f32 {
    1.0 / (1.0 + lambda)
}

/// Slope-space visible-normal sample (ported from `TrowbridgeReitzSample11`).
fn tr_sample11(cos_theta: f32, u: f32, v: f32) -> (f32, f32) {
    if cos_theta > 0.9999 {
        let r = (u / (1.0 - u)).sqrt();
        let phi = std::f32::consts::TAU * v;
        return (r * phi.cos(), r * phi.sin());
    }

    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let tan_theta = sin_theta / cos_theta;
    let a = 1.0 / tan_theta;
    let g1 = 2.0 / (1.0 + (1.0 + 1.0 / (a * a)).sqrt());

    let big_a = 2.0 * u / g1 - 1.0;
    let tmp = (1.0 / (big_a * big_a - 1.0)).min(1e10);

    let b = tan_theta;
    let d = (b * b * tmp * tmp - (big_a * big_a - b * b) * tmp).max(0.0).sqrt();
    let slope_x_1 = b * tmp - d;
    let slope_x_2 = b * tmp + d;
    let slope_x = if big_a < 0.0 || slope_x_2 > 1.0 / tan_theta {
        slope_x_1
    } else {
        slope_x_2
    };

    let (s, v) = if v > 0.5 { (1.0, 2.0 * (v - 0.5)) } else { (-1.0, 2.0 * (0.5 - v)) };
    let z = (v * (v * (v * 0.27385 - 0.73369) + 0.46341)) / (v * (v * (v * 0.093073 + 0.309420) - 1.0) + 0.597999);
    let slope_y = s * z * (1.0 + slope_x * slope_x).sqrt();
    (slope_x, slope_y)
}

impl TrowbridgeReitz<'_> {
    /// Samples a visible half-vector given the view direction `wi`.
    fn sample_half_vector(&self, wi: Vector, n: Normal, rng: &mut dyn Rand) -> Vector {
        let orthogonal = {
            let (t, _) = orthonormal_basis(n);
            t
        };
        let cross = n.cross(orthogonal);

        let cos_theta_i = wi.dot(n);
        let stretched = Vector::new(wi.dot(orthogonal) * self.alpha_x, wi.dot(cross) * self.alpha_y, cos_theta_i).normalized();
        let stretched_cos_theta = stretched.z.max(0.0);

        let u = rng.next_float(0.0, 1.0);
        let v = rng.next_float(0.0, 1.0);
        let (mut slope_x, mut slope_y) = tr_sample11(stretched_cos_theta, u, v);

        let cos_phi = if stretched_cos_theta < 0.9999 {
            let sin_theta = (1.0 - stretched_cos_theta * stretched_cos_theta).max(0.0).sqrt().max(1e-8);
            stretched.x / sin_theta
        } else {
            1.0
        };
        let sin_phi = if stretched_cos_theta < 0.9999 {
            let sin_theta = (1.0 - stretched_cos_theta * stretched_cos_theta).max(0.0).sqrt().max(1e-8);
            stretched.y / sin_theta
        } else {
            0.0
        };

        let tmp = cos_phi * slope_x - sin_phi * slope_y;
        slope_y = sin_phi * slope_x + cos_phi * slope_y;
        slope_x = tmp;

        slope_x *= self.alpha_x;
        slope_y *= self.alpha_y;

        (orthogonal * (-slope_x) + cross * (-slope_y) + n).normalized()
    }
}

impl Bsdf for TrowbridgeReitz<'_> {
    fn sample<'s>(&'s self, wi: Vector, n_shading: Normal, rng: &mut dyn Rand, compositor: &'s ReflectorCompositor) -> BsdfSample<'s> {
        let cos_theta_i = wi.dot(n_shading);
        if cos_theta_i <= 0.0 {
            return BsdfSample {
                reflector: None,
                kind: SampleKind {
                    transport: Transport::Reflection,
                    lobe: Lobe::Diffuse,
                },
                wo: n_shading,
                pdf: 0.0,
            };
        }

        let half_angle = self.sample_half_vector(wi, n_shading, rng);
        let wo = reflect(wi, half_angle);
        let cos_theta_o = wo.dot(n_shading);
        if cos_theta_o <= 0.0 {
            return BsdfSample {
                reflector: None,
                kind: SampleKind {
                    transport: Transport::Reflection,
                    lobe: Lobe::Diffuse,
                },
                wo,
                pdf: 0.0,
            };
        }

        let (_, pdf) = self.compute_diffuse_with_pdf(wi, wo, n_shading, compositor);
        let f = self.compute_diffuse(wi, wo, n_shading, compositor);
        BsdfSample {
            reflector: f,
            kind: SampleKind {
                transport: Transport::Reflection,
                lobe: Lobe::Diffuse,
            },
            wo,
            pdf,
        }
    }

    fn compute_diffuse<'s>(&'s self, wi: Vector, wo: Vector, n_shading: Normal, compositor: &'s ReflectorCompositor) -> Option<&'s dyn ReflectorLike> {
        let cos_theta_i = wi.dot(n_shading);
        let cos_theta_o = wo.dot(n_shading);
        if cos_theta_i <= 0.0 || cos_theta_o <= 0.0 {
            return None;
        }
        let half_angle = (wi + wo).normalized();
        let (orthogonal, _) = orthonormal_basis(n_shading);

        let d = tr_d(self.alpha_x, self.alpha_y, half_angle, n_shading, orthogonal);
        let lambda_i = tr_lambda(self.alpha_x, self.alpha_y, wi, n_shading, orthogonal);
        let lambda_o = tr_lambda(self.alpha_x, self.alpha_y, wo, n_shading, orthogonal);
        let g = 1.0 / (1.0 + lambda_i + lambda_o);
        let fresnel = fresnel_dielectric(wi.dot(half_angle).max(0.0), self.eta_i, self.eta_t);

        let value = d * g * fresnel / (4.0 * cos_theta_i * cos_theta_o);
        compositor.attenuate(Some(self.reflectance), value)
    }

    fn compute_diffuse_with_pdf<'s>(
        &'s self,
        wi: Vector,
        wo: Vector,
        n_shading: Normal,
        compositor: &'s ReflectorCompositor,
    ) -> (Option<&'s dyn ReflectorLike>, f32) {
        let cos_theta_o = wo.dot(n_shading);
        if cos_theta_o <= 0.0 {
            return (None, 0.0);
        }
        let half_angle = (wi + wo).normalized();
        let (orthogonal, _) = orthonormal_basis(n_shading);
        let d = tr_d(self.alpha_x, self.alpha_y, half_angle, n_shading, orthogonal);
        let lambda_o = tr_lambda(self.alpha_x, self.alpha_y, wo, n_shading, orthogonal);
        let g1 = tr_g1(lambda_o);
        let half_angle_cos_theta_o = half_angle.dot(wo).max(0.0);
        let pdf = d * g1 * half_angle_cos_theta_o / cos_theta_o;
        (self.compute_diffuse(wi, wo, n_shading, compositor), pdf)
    }
}

/// Probabilistically passes through (pure specular transmission) with
/// probability `1 - alpha`, else delegates to `base`. Scales the base's
/// diffuse response by `alpha` so direct-lighting evaluation stays
/// consistent with the stochastic choice made during sampling.
pub struct AlphaBlend<'a> {
    pub alpha: f32,
    pub base: &'a dyn Bsdf,
}

impl Bsdf for AlphaBlend<'_> {
    fn sample<'s>(&'s self, wi: Vector, n_shading: Normal, rng: &mut dyn Rand, compositor: &'s ReflectorCompositor) -> BsdfSample<'s> {
        if rng.next_float(0.0, 1.0) >= self.alpha {
            return BsdfSample {
                reflector: compositor.attenuate(None, 1.0).or(Some(unit_transmission(compositor))),
                kind: SampleKind {
                    transport: Transport::Transmission,
                    lobe: Lobe::Specular,
                },
                wo: -wi,
                pdf: f32::INFINITY,
            };
        }
        self.base.sample(wi, n_shading, rng, compositor)
    }

    fn compute_diffuse<'s>(&'s self, wi: Vector, wo: Vector, n_shading: Normal, compositor: &'s ReflectorCompositor) -> Option<&'s dyn ReflectorLike> {
        let base = self.base.compute_diffuse(wi, wo, n_shading, compositor)?;
        compositor.attenuate(Some(base), self.alpha)
    }

    fn compute_diffuse_with_pdf<'s>(
        &'s self,
        wi: Vector,
        wo: Vector,
        n_shading: Normal,
        compositor: &'s ReflectorCompositor,
    ) -> (Option<&'s dyn ReflectorLike>, f32) {
        let (base, pdf) = self.base.compute_diffuse_with_pdf(wi, wo, n_shading, compositor);
        (base.and_then(|b| compositor.attenuate(Some(b), self.alpha)), self.alpha * pdf)
    }
}

/// A reflector sampling exactly `1.0` at every wavelength: used for the
/// alpha blender's pure-transmission (pass-through) branch, where no
/// material tint is applied.
fn unit_transmission<'s>(compositor: &'s ReflectorCompositor) -> &'s dyn ReflectorLike {
    struct Unit;
    impl ReflectorLike for Unit {
        fn sample(&self, _wavelength_nm: f32) -> f32 {
            1.0
        }
        fn albedo(&self) -> f32 {
            1.0
        }
    }
    thread_local! {
        static UNIT: Unit = Unit;
    }
    compositor.attenuate(Some(UNIT.with(|u| unsafe { std::mem::transmute::<&Unit, &'static Unit>(u) })), 1.0).unwrap()
}

/// Holds `n` child lobes; sampling picks one uniformly, then evaluates the
/// others' pdf/reflectance and averages.
pub struct Aggregate<'a> {
    pub children: &'a [&'a dyn Bsdf],
}

impl Bsdf for Aggregate<'_> {
    fn sample<'s>(&'s self, wi: Vector, n_shading: Normal, rng: &mut dyn Rand, compositor: &'s ReflectorCompositor) -> BsdfSample<'s> {
        if self.children.is_empty() {
            return BsdfSample {
                reflector: None,
                kind: SampleKind {
                    transport: Transport::Reflection,
                    lobe: Lobe::Diffuse,
                },
                wo: n_shading,
                pdf: 0.0,
            };
        }
        let chosen_idx = rng.next_index(self.children.len());
        let chosen = self.children[chosen_idx];
        let sample = chosen.sample(wi, n_shading, rng, compositor);
        if sample.reflector.is_none() || sample.pdf <= 0.0 {
            return sample;
        }

        let n = self.children.len() as f32;
        if sample.kind.is_specular() {
            let mut other_pdf_sum = 0.0;
            let mut has_non_specular_other = false;
            for (idx, child) in self.children.iter().enumerate() {
                if idx == chosen_idx {
                    continue;
                }
                let (_, pdf) = child.compute_diffuse_with_pdf(wi, sample.wo, n_shading, compositor);
                if pdf.is_finite() {
                    other_pdf_sum += pdf;
                    has_non_specular_other = true;
                }
            }
            if has_non_specular_other {
                let cos_o = sample.wo.dot(n_shading).abs().max(1e-6);
                let scaled = compositor.attenuate(sample.reflector, 1.0 / cos_o);
                return BsdfSample {
                    reflector: scaled,
                    kind: sample.kind,
                    wo: sample.wo,
                    pdf: 1.0 + other_pdf_sum,
                };
            }
            return sample;
        }

        let mut reflector = compositor.attenuate(sample.reflector, 1.0);
        let mut pdf_sum = sample.pdf;
        for (idx, child) in self.children.iter().enumerate() {
            if idx == chosen_idx {
                continue;
            }
            let (f, pdf) = child.compute_diffuse_with_pdf(wi, sample.wo, n_shading, compositor);
            pdf_sum += if pdf.is_finite() { pdf } else { 0.0 };
            reflector = compositor.add(reflector, f);
        }
        BsdfSample {
            reflector: compositor.attenuate(reflector, 1.0 / n),
            kind: sample.kind,
            wo: sample.wo,
            pdf: pdf_sum / n,
        }
    }

    fn compute_diffuse<'s>(&'s self, wi: Vector, wo: Vector, n_shading: Normal, compositor: &'s ReflectorCompositor) -> Option<&'s dyn ReflectorLike> {
        let mut acc = None;
        for child in self.children {
            acc = compositor.add(acc, child.compute_diffuse(wi, wo, n_shading, compositor));
        }
        let n = self.children.len().max(1) as f32;
        compositor.attenuate(acc, 1.0 / n)
    }

    fn compute_diffuse_with_pdf<'s>(
        &'s self,
        wi: Vector,
        wo: Vector,
        n_shading: Normal,
        compositor: &'s ReflectorCompositor,
    ) -> (Option<&'s dyn ReflectorLike>, f32) {
        let mut acc = None;
        let mut pdf_sum = 0.0;
        for child in self.children {
            let (f, pdf) = child.compute_diffuse_with_pdf(wi, wo, n_shading, compositor);
            acc = compositor.add(acc, f);
            if pdf.is_finite() {
                pdf_sum += pdf;
            }
        }
        let n = self.children.len().max(1) as f32;
        (compositor.attenuate(acc, 1.0 / n), pdf_sum / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::WorkerRng;
    use crate::spectrum::ConstantReflector;

    #[test]
    fn lambertian_sample_pdf_matches_cosine_law() {
        let refl = ConstantReflector::new(0.5).unwrap();
        let bsdf = Lambertian { reflectance: &refl };
        let compositor = ReflectorCompositor::new();
        let mut rng = WorkerRng::from_seed(1);
        let n = Normal::new(0.0, 0.0, 1.0);
        let sample = bsdf.sample(Vector::new(0.0, 0.0, 1.0), n, &mut rng, &compositor);
        assert!(sample.wo.z > 0.0);
        assert!(sample.pdf > 0.0 && sample.pdf.is_finite());
        assert!(!sample.kind.is_specular());
    }

    #[test]
    fn mirror_sample_is_specular_with_infinite_pdf() {
        let refl = ConstantReflector::new(1.0).unwrap();
        let bsdf = Mirror { reflectance: &refl };
        let compositor = ReflectorCompositor::new();
        let mut rng = WorkerRng::from_seed(2);
        let n = Normal::new(0.0, 0.0, 1.0);
        let wi = Vector::new(0.6, 0.0, 0.8).normalized();
        let sample = bsdf.sample(wi, n, &mut rng, &compositor);
        assert!(sample.pdf.is_infinite());
        assert!(sample.kind.is_specular());
        assert!((sample.wo.dot(n) - wi.dot(n)).abs() < 1e-5);
    }

    #[test]
    fn fresnel_dielectric_is_one_past_critical_angle() {
        let f = fresnel_dielectric(0.1, 1.5, 1.0);
        assert!((f - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fresnel_dielectric_at_normal_incidence_matches_schlick_r0() {
        let f = fresnel_dielectric(1.0, 1.0, 1.5);
        let r0 = ((1.5f32 - 1.0) / (1.5 + 1.0)).powi(2);
        assert!((f - r0).abs() < 1e-5);
    }

    #[test]
    fn ggx_sample_produces_finite_reflector_above_horizon() {
        let refl = ConstantReflector::new(0.8).unwrap();
        let bsdf = TrowbridgeReitz {
            reflectance: &refl,
            alpha_x: 0.3,
            alpha_y: 0.3,
            eta_i: 1.0,
            eta_t: 1.5,
        };
        let compositor = ReflectorCompositor::new();
        let mut rng = WorkerRng::from_seed(3);
        let n = Normal::new(0.0, 0.0, 1.0);
        let wi = Vector::new(0.0, 0.0, 1.0);
        for _ in 0..20 {
            let sample = bsdf.sample(wi, n, &mut rng, &compositor);
            if let Some(r) = sample.reflector {
                let v = r.sample(550.0);
                assert!(v.is_finite() && v >= 0.0);
                assert!(sample.pdf >= 0.0);
            }
        }
    }

    #[test]
    fn aggregate_averages_two_lambertian_children() {
        let refl_a = ConstantReflector::new(0.2).unwrap();
        let refl_b = ConstantReflector::new(0.8).unwrap();
        let a = Lambertian { reflectance: &refl_a };
        let b = Lambertian { reflectance: &refl_b };
        let children: [&dyn Bsdf; 2] = [&a, &b];
        let agg = Aggregate { children: &children };
        let compositor = ReflectorCompositor::new();
        let n = Normal::new(0.0, 0.0, 1.0);
        let wo = Vector::new(0.1, 0.0, 1.0).normalized();
        let (f, pdf) = agg.compute_diffuse_with_pdf(Vector::new(0.0, 0.0, 1.0), wo, n, &compositor);
        let f = f.unwrap().sample(550.0);
        let expected = 0.5 * (0.2 + 0.8) * std::f32::consts::FRAC_1_PI;
        assert!((f - expected).abs() < 1e-5);
        assert!(pdf > 0.0);
    }
}
