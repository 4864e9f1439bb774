//! Spectral primitives: `Spectrum`/`Reflector` are
//! polymorphic values that answer a pure sample(wavelength) query.
//!
//! Dispatch is dynamic at the graph edge (matching the design notes'
//! guidance to keep vtable-style polymorphism at edges, not hot inner
//! loops): every concrete variant implements one of the two small traits
//! below and is stored behind `Arc` (scene-graph, long-lived, atomically
//! refcounted) or behind a `&'a dyn Trait` borrowed from a compositor's
//! bump arena (per-ray, released in bulk on `reset()`).

mod leaf;

pub use leaf::{
    BlackbodySpectrum, ConstantReflector, ConstantSpectrum, InterpolatedReflector,
    InterpolatedSpectrum, RgbReflector, RgbSpectrum, XyzReflector, XyzSpectrum,
};

use std::sync::Arc;

/// Wavelength-dependent radiometric quantity. `sample` must be non-negative
/// and finite for any finite positive wavelength, and must not mutate
/// hidden state: safe to call concurrently once construction is complete.
pub trait SpectrumLike: Send + Sync {
    fn sample(&self, wavelength_nm: f32) -> f32;
}

/// Wavelength-dependent reflectance in `[0, 1]`, plus a scalar upper bound
/// on its integral used as a Russian-roulette early-out.
pub trait ReflectorLike: Send + Sync {
    fn sample(&self, wavelength_nm: f32) -> f32;
    fn albedo(&self) -> f32;
}

/// Type-erased spectrum value. A "null spectrum" is modeled as `None` at
/// call sites, not as a variant, mirroring the contract that sampling a
/// null spectrum yields `0`.
pub type Spectrum = dyn SpectrumLike;
pub type Reflector = dyn ReflectorLike;

/// Scene-graph spectra/reflectors are reference-counted: shared, long-lived,
/// created during scene construction, released when the scene dies.
pub type SharedSpectrum = Arc<dyn SpectrumLike>;
pub type SharedReflector = Arc<dyn ReflectorLike>;

/// Samples an optional spectrum, treating `None` as the null spectrum.
pub fn sample_opt(s: Option<&Spectrum>, wavelength_nm: f32) -> f32 {
    s.map_or(0.0, |s| s.sample(wavelength_nm))
}

pub fn sample_reflector_opt(r: Option<&Reflector>, wavelength_nm: f32) -> f32 {
    r.map_or(0.0, |r| r.sample(wavelength_nm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_spectrum_samples_zero() {
        assert_eq!(sample_opt(None, 550.0), 0.0);
    }

    #[test]
    fn constant_spectrum_is_nonnegative_finite() {
        let s = ConstantSpectrum::new(0.42).unwrap();
        for lambda in [1.0f32, 380.0, 550.0, 720.0, 2000.0] {
            let v = SpectrumLike::sample(&s, lambda);
            assert!(v.is_finite() && v >= 0.0);
        }
    }
}
