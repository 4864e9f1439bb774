//! Colour extrapolator: caches `Color3 -> Spectrum`
//! and `Color3 -> Reflector`, synthesising misses via a pluggable policy.
//! The built-in policy is Smits (1999) RGB-to-SPD: express the colour as
//! a convex combination of seven basis curves and resample them onto the
//! working wavelength grid (`src/smits_tables.rs`).
//!
//! `std::collections::HashMap` (hashbrown's SwissTable, itself an
//! open-addressed scheme) stands in for the hand-rolled robin-hood table
//! the design notes sketch; see DESIGN.md for the rationale.

use std::collections::HashMap;
use std::sync::Arc;

use crate::color::{Color3, ColorSpace};
use crate::error::Result;
use crate::smits_tables as smits;
use crate::spectrum::{InterpolatedReflector, InterpolatedSpectrum, SharedReflector, SharedSpectrum};

const INITIAL_CAPACITY: usize = 16;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct ColorKey([u32; 3], u8);

impl From<Color3> for ColorKey {
    fn from(c: Color3) -> Self {
        ColorKey(c.values.map(f32::to_bits), c.space as u8)
    }
}

/// Synthesises a spectrum/reflector for a colour-extrapolator cache miss.
pub trait ExtrapolationPolicy: Send + Sync {
    fn compute_spectrum(&self, color: Color3) -> Result<SharedSpectrum>;
    fn compute_reflector(&self, color: Color3) -> Result<SharedReflector>;
}

fn scale(input: &[f32; 32], scalar: f32) -> [f32; 32] {
    let mut out = [0.0f32; 32];
    for i in 0..32 {
        out[i] = input[i] * scalar;
    }
    out
}

fn scaled_add(addend: &[f32; 32], scaled: &[f32; 32], scalar: f32) -> [f32; 32] {
    let mut out = [0.0f32; 32];
    for i in 0..32 {
        out[i] = addend[i] + scalar * scaled[i];
    }
    out
}

/// Smits (1999) basis-curve assembly, shared by the spectrum and
/// reflector policies (they differ only in basis tables and scalar).
#[allow(clippy::too_many_arguments)]
fn create_spd(
    r: f32,
    g: f32,
    b: f32,
    white: &[f32; 32],
    cyan: &[f32; 32],
    magenta: &[f32; 32],
    yellow: &[f32; 32],
    red: &[f32; 32],
    green: &[f32; 32],
    blue: &[f32; 32],
    scalar: f32,
) -> [f32; 32] {
    let mut temp = if r <= g && r <= b {
        let base = scale(white, r);
        if g <= b {
            let base = scaled_add(&base, cyan, g - r);
            scaled_add(&base, blue, b - g)
        } else {
            let base = scaled_add(&base, cyan, b - r);
            scaled_add(&base, green, g - b)
        }
    } else if g <= r && g <= b {
        let base = scale(white, g);
        if r <= b {
            let base = scaled_add(&base, magenta, r - g);
            scaled_add(&base, blue, b - r)
        } else {
            let base = scaled_add(&base, magenta, b - g);
            scaled_add(&base, red, r - b)
        }
    } else {
        let base = scale(white, b);
        if r <= g {
            let base = scaled_add(&base, yellow, r - b);
            scaled_add(&base, green, g - r)
        } else {
            let base = scaled_add(&base, yellow, g - b);
            scaled_add(&base, red, r - g)
        }
    };

    for v in temp.iter_mut() {
        *v = (*v * scalar).max(0.0);
    }
    temp
}

pub struct SmitsPolicy;

impl ExtrapolationPolicy for SmitsPolicy {
    fn compute_spectrum(&self, color: Color3) -> Result<SharedSpectrum> {
        let c = color.convert(ColorSpace::LinearSrgb);
        let spd = create_spd(
            c.values[0],
            c.values[1],
            c.values[2],
            &smits::SPECTRUM_WHITE,
            &smits::SPECTRUM_CYAN,
            &smits::SPECTRUM_MAGENTA,
            &smits::SPECTRUM_YELLOW,
            &smits::SPECTRUM_RED,
            &smits::SPECTRUM_GREEN,
            &smits::SPECTRUM_BLUE,
            0.86445,
        );
        let spectrum = InterpolatedSpectrum::new(smits::SAMPLE_WAVELENGTHS.to_vec(), spd.to_vec())?;
        Ok(Arc::new(spectrum))
    }

    fn compute_reflector(&self, color: Color3) -> Result<SharedReflector> {
        let c = color.convert(ColorSpace::LinearSrgb).clamp(1.0);
        let spd = create_spd(
            c.values[0],
            c.values[1],
            c.values[2],
            &smits::REFLECTOR_WHITE,
            &smits::REFLECTOR_CYAN,
            &smits::REFLECTOR_MAGENTA,
            &smits::REFLECTOR_YELLOW,
            &smits::REFLECTOR_RED,
            &smits::REFLECTOR_GREEN,
            &smits::REFLECTOR_BLUE,
            0.94,
        );
        let reflector = InterpolatedReflector::new(smits::SAMPLE_WAVELENGTHS.to_vec(), spd.to_vec())?;
        Ok(Arc::new(reflector))
    }
}

/// Caches `Color3 -> Spectrum`/`Color3 -> Reflector`, synthesising misses
/// through an `ExtrapolationPolicy`. A perfectly black colour always
/// resolves to the null spectrum/reflector (`None`) with no cache entry.
pub struct ColorExtrapolator {
    policy: Box<dyn ExtrapolationPolicy>,
    spectra: HashMap<ColorKey, SharedSpectrum>,
    reflectors: HashMap<ColorKey, SharedReflector>,
}

impl ColorExtrapolator {
    pub fn new() -> Self {
        Self::with_policy(Box::new(SmitsPolicy))
    }

    pub fn with_policy(policy: Box<dyn ExtrapolationPolicy>) -> Self {
        ColorExtrapolator {
            policy,
            spectra: HashMap::with_capacity(INITIAL_CAPACITY),
            reflectors: HashMap::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Grows both tables to accommodate `n` additional entries without
    /// reallocating mid-insert, for bulk callers like the MIP-map builder.
    pub fn prepare(&mut self, n: usize) {
        self.spectra.reserve(n);
        self.reflectors.reserve(n);
    }

    pub fn spectrum(&mut self, color: Color3) -> Result<Option<SharedSpectrum>> {
        if color.is_black() {
            return Ok(None);
        }
        let key = ColorKey::from(color);
        if let Some(existing) = self.spectra.get(&key) {
            return Ok(Some(existing.clone()));
        }
        let synthesized = self.policy.compute_spectrum(color)?;
        self.spectra.insert(key, synthesized.clone());
        Ok(Some(synthesized))
    }

    pub fn reflector(&mut self, color: Color3) -> Result<Option<SharedReflector>> {
        if color.is_black() {
            return Ok(None);
        }
        let key = ColorKey::from(color);
        if let Some(existing) = self.reflectors.get(&key) {
            return Ok(Some(existing.clone()));
        }
        let synthesized = self.policy.compute_reflector(color)?;
        self.reflectors.insert(key, synthesized.clone());
        Ok(Some(synthesized))
    }
}

impl Default for ColorExtrapolator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::{ReflectorLike, SpectrumLike};

    #[test]
    fn black_color_is_null_and_uncached() {
        let mut ex = ColorExtrapolator::new();
        let black = Color3::black(ColorSpace::LinearSrgb);
        assert!(ex.spectrum(black).unwrap().is_none());
        assert_eq!(ex.spectra.len(), 0);
    }

    #[test]
    fn repeated_lookup_returns_same_arc() {
        let mut ex = ColorExtrapolator::new();
        let red = Color3::new([1.0, 0.0, 0.0], ColorSpace::LinearSrgb).unwrap();
        let a = ex.spectrum(red).unwrap().unwrap();
        let b = ex.spectrum(red).unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn spectrum_is_nonnegative_over_visible_range() {
        let mut ex = ColorExtrapolator::new();
        let teal = Color3::new([0.1, 0.6, 0.5], ColorSpace::LinearSrgb).unwrap();
        let s = ex.spectrum(teal).unwrap().unwrap();
        for lambda in [380.0f32, 450.0, 550.0, 650.0, 720.0] {
            assert!(SpectrumLike::sample(s.as_ref(), lambda) >= 0.0);
        }
    }

    #[test]
    fn reflector_is_bounded_unit_interval() {
        let mut ex = ColorExtrapolator::new();
        let white = Color3::new([1.0, 1.0, 1.0], ColorSpace::LinearSrgb).unwrap();
        let r = ex.reflector(white).unwrap().unwrap();
        for lambda in [380.0f32, 500.0, 650.0, 720.0] {
            let v = ReflectorLike::sample(r.as_ref(), lambda);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn prepare_grows_capacity_without_panicking() {
        let mut ex = ColorExtrapolator::new();
        ex.prepare(1000);
        assert!(ex.spectra.capacity() >= 1000);
    }
}
