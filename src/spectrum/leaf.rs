use crate::error::{RenderError, Result};

use super::{ReflectorLike, SpectrumLike};

/// Binary-search resample of a piecewise-linear function sampled at
/// `wavelengths[i] -> values[i]` (wavelengths strictly increasing),
/// clamping to the endpoint value outside the table's range.
pub(crate) fn resample(wavelengths: &[f32], values: &[f32], target: f32) -> f32 {
    debug_assert_eq!(wavelengths.len(), values.len());
    let idx = wavelengths.partition_point(|&w| w < target);

    if idx == wavelengths.len() {
        return values[values.len() - 1];
    }
    if idx == 0 {
        return values[0];
    }
    let hi_w = wavelengths[idx];
    if hi_w == target {
        return values[idx];
    }

    let lo_w = wavelengths[idx - 1];
    let t = (target - lo_w) / (hi_w - lo_w);
    values[idx - 1] + t * (values[idx] - values[idx - 1])
}

/// Piecewise-linearly-interpolated spectrum over an explicit sample table.
pub struct InterpolatedSpectrum {
    wavelengths: Vec<f32>,
    values: Vec<f32>,
}

impl InterpolatedSpectrum {
    pub fn new(wavelengths: Vec<f32>, values: Vec<f32>) -> Result<Self> {
        validate_table(&wavelengths, &values)?;
        Ok(InterpolatedSpectrum { wavelengths, values })
    }
}

impl SpectrumLike for InterpolatedSpectrum {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        resample(&self.wavelengths, &self.values, wavelength_nm).max(0.0)
    }
}

fn validate_table(wavelengths: &[f32], values: &[f32]) -> Result<()> {
    if wavelengths.is_empty() || wavelengths.len() != values.len() {
        return Err(RenderError::invalid(
            "spectrum table requires matching, non-empty wavelength/value arrays",
        ));
    }
    if !wavelengths[0].is_finite() || wavelengths[0] <= 0.0 {
        return Err(RenderError::invalid("spectrum wavelengths must be positive"));
    }
    for w in wavelengths.windows(2) {
        if !w[1].is_finite() || w[1] <= w[0] {
            return Err(RenderError::invalid(
                "spectrum wavelengths must be finite and strictly increasing",
            ));
        }
    }
    Ok(())
}

/// Piecewise-linearly-interpolated reflector; samples are clamped to
/// `[0, 1]` and the albedo bound is the table's maximum value.
pub struct InterpolatedReflector {
    wavelengths: Vec<f32>,
    values: Vec<f32>,
    albedo: f32,
}

impl InterpolatedReflector {
    pub fn new(wavelengths: Vec<f32>, values: Vec<f32>) -> Result<Self> {
        validate_table(&wavelengths, &values)?;
        let albedo = values.iter().cloned().fold(0.0f32, f32::max).min(1.0);
        Ok(InterpolatedReflector {
            wavelengths,
            values,
            albedo,
        })
    }
}

impl ReflectorLike for InterpolatedReflector {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        resample(&self.wavelengths, &self.values, wavelength_nm).clamp(0.0, 1.0)
    }

    fn albedo(&self) -> f32 {
        self.albedo
    }
}

/// A wavelength-independent intensity.
pub struct ConstantSpectrum(f32);

impl ConstantSpectrum {
    pub fn new(intensity: f32) -> Result<Self> {
        if !intensity.is_finite() || intensity < 0.0 {
            return Err(RenderError::invalid(
                "constant spectrum intensity must be finite and non-negative",
            ));
        }
        Ok(ConstantSpectrum(intensity))
    }
}

impl SpectrumLike for ConstantSpectrum {
    fn sample(&self, _wavelength_nm: f32) -> f32 {
        self.0
    }
}

/// A wavelength-independent reflectance.
pub struct ConstantReflector(f32);

impl ConstantReflector {
    pub fn new(reflectance: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&reflectance) {
            return Err(RenderError::invalid("constant reflectance must be in [0, 1]"));
        }
        Ok(ConstantReflector(reflectance))
    }
}

impl ReflectorLike for ConstantReflector {
    fn sample(&self, _wavelength_nm: f32) -> f32 {
        self.0
    }

    fn albedo(&self) -> f32 {
        self.0
    }
}

/// Planck's law blackbody emitter, parameterised by temperature in Kelvin
/// and a scalar radiometric normalisation ("metric" blackbody).
pub struct BlackbodySpectrum {
    temperature_kelvin: f32,
    normalization: f32,
}

const PLANCK_H: f64 = 6.626_070_15e-34;
const SPEED_OF_LIGHT: f64 = 2.997_924_58e8;
const BOLTZMANN_K: f64 = 1.380_649e-23;

impl BlackbodySpectrum {
    pub fn new(temperature_kelvin: f32, normalization: f32) -> Result<Self> {
        if !temperature_kelvin.is_finite() || temperature_kelvin <= 0.0 {
            return Err(RenderError::invalid("blackbody temperature must be > 0"));
        }
        if !normalization.is_finite() || normalization < 0.0 {
            return Err(RenderError::invalid(
                "blackbody normalization must be finite and non-negative",
            ));
        }
        Ok(BlackbodySpectrum {
            temperature_kelvin,
            normalization,
        })
    }
}

impl SpectrumLike for BlackbodySpectrum {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        if wavelength_nm <= 0.0 || !wavelength_nm.is_finite() {
            return 0.0;
        }
        let lambda_m = (wavelength_nm as f64) * 1e-9;
        let t = self.temperature_kelvin as f64;

        let numerator = 2.0 * PLANCK_H * SPEED_OF_LIGHT * SPEED_OF_LIGHT;
        let exponent = (PLANCK_H * SPEED_OF_LIGHT) / (lambda_m * BOLTZMANN_K * t);
        let denominator = lambda_m.powi(5) * (exponent.exp() - 1.0);

        let radiance = numerator / denominator;
        ((radiance * self.normalization as f64).max(0.0)) as f32
    }
}

/// RGB-backed spectrum: three discrete wavelength bands.
pub struct RgbSpectrum {
    r: f32,
    g: f32,
    b: f32,
}

impl RgbSpectrum {
    pub fn new(r: f32, g: f32, b: f32) -> Result<Self> {
        if [r, g, b].iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(RenderError::invalid(
                "RGB spectrum channels must be finite and non-negative",
            ));
        }
        Ok(RgbSpectrum { r, g, b })
    }
}

// Canonical band edges splitting the visible range into thirds, used
// consistently by the RGB/XYZ discrete-sample variants.
const BAND_LOW_HIGH_NM: f32 = 490.0;
const BAND_MID_HIGH_NM: f32 = 580.0;

impl SpectrumLike for RgbSpectrum {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        if wavelength_nm < BAND_LOW_HIGH_NM {
            self.b
        } else if wavelength_nm < BAND_MID_HIGH_NM {
            self.g
        } else {
            self.r
        }
    }
}

/// RGB-backed reflector: clamped to `[0, 1]` per channel.
pub struct RgbReflector {
    r: f32,
    g: f32,
    b: f32,
    albedo: f32,
}

impl RgbReflector {
    pub fn new(r: f32, g: f32, b: f32) -> Result<Self> {
        if [r, g, b].iter().any(|v| !v.is_finite()) {
            return Err(RenderError::invalid("RGB reflector channels must be finite"));
        }
        let (r, g, b) = (r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0));
        let albedo = r.max(g).max(b);
        Ok(RgbReflector { r, g, b, albedo })
    }
}

impl ReflectorLike for RgbReflector {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        if wavelength_nm < BAND_LOW_HIGH_NM {
            self.b
        } else if wavelength_nm < BAND_MID_HIGH_NM {
            self.g
        } else {
            self.r
        }
    }

    fn albedo(&self) -> f32 {
        self.albedo
    }
}

/// XYZ-backed spectrum: tristimulus values mapped onto three wavelength
/// bands. Not CIE-accurate; a deliberately simple discrete encoding in the
/// same spirit as `RgbSpectrum`, without mandating a reconstruction filter.
pub struct XyzSpectrum {
    x: f32,
    y: f32,
    z: f32,
}

impl XyzSpectrum {
    pub fn new(x: f32, y: f32, z: f32) -> Result<Self> {
        if [x, y, z].iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(RenderError::invalid(
                "XYZ spectrum channels must be finite and non-negative",
            ));
        }
        Ok(XyzSpectrum { x, y, z })
    }
}

impl SpectrumLike for XyzSpectrum {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        if wavelength_nm < BAND_LOW_HIGH_NM {
            self.z
        } else if wavelength_nm < BAND_MID_HIGH_NM {
            self.y
        } else {
            self.x
        }
    }
}

pub struct XyzReflector {
    x: f32,
    y: f32,
    z: f32,
    albedo: f32,
}

impl XyzReflector {
    pub fn new(x: f32, y: f32, z: f32) -> Result<Self> {
        if [x, y, z].iter().any(|v| !v.is_finite()) {
            return Err(RenderError::invalid("XYZ reflector channels must be finite"));
        }
        let (x, y, z) = (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0), z.clamp(0.0, 1.0));
        let albedo = x.max(y).max(z);
        Ok(XyzReflector { x, y, z, albedo })
    }
}

impl ReflectorLike for XyzReflector {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        if wavelength_nm < BAND_LOW_HIGH_NM {
            self.z
        } else if wavelength_nm < BAND_MID_HIGH_NM {
            self.y
        } else {
            self.x
        }
    }

    fn albedo(&self) -> f32 {
        self.albedo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_clamps_outside_table() {
        let w = [400.0, 500.0, 600.0];
        let v = [1.0, 2.0, 3.0];
        assert_eq!(resample(&w, &v, 100.0), 1.0);
        assert_eq!(resample(&w, &v, 900.0), 3.0);
    }

    #[test]
    fn resample_interpolates_midpoint() {
        let w = [400.0, 600.0];
        let v = [0.0, 2.0];
        assert!((resample(&w, &v, 500.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn interpolated_reflector_bounds() {
        let r = InterpolatedReflector::new(vec![400.0, 500.0], vec![0.3, 0.9]).unwrap();
        assert!(r.albedo() <= 1.0);
        for lambda in [350.0, 450.0, 550.0] {
            let s = ReflectorLike::sample(&r, lambda);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn blackbody_is_nonnegative_finite() {
        let bb = BlackbodySpectrum::new(5778.0, 1.0).unwrap();
        for lambda in [1.0f32, 100.0, 550.0, 5000.0] {
            let v = SpectrumLike::sample(&bb, lambda);
            assert!(v.is_finite() && v >= 0.0);
        }
    }

    #[test]
    fn rgb_reflector_clamped_to_unit_interval() {
        let r = RgbReflector::new(1.5, -0.2, 0.5).unwrap();
        assert!(r.albedo() <= 1.0);
        assert!(ReflectorLike::sample(&r, 650.0) <= 1.0);
        assert!(ReflectorLike::sample(&r, 400.0) >= 0.0);
    }
}
