//! Colour algebra (`Color3`, colour spaces, sRGB<->linear conversions).

use crate::error::{RenderError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    Xyz,
    LinearSrgb,
    Srgb,
}

/// An ordered triple tagged with its colour space. Components must stay
/// finite and non-negative.
#[derive(Clone, Copy, Debug)]
pub struct Color3 {
    pub values: [f32; 3],
    pub space: ColorSpace,
}

impl Color3 {
    pub fn new(values: [f32; 3], space: ColorSpace) -> Result<Self> {
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(RenderError::invalid(
                "Color3 components must be finite and non-negative",
            ));
        }
        Ok(Color3 { values, space })
    }

    pub fn black(space: ColorSpace) -> Self {
        Color3 {
            values: [0.0, 0.0, 0.0],
            space,
        }
    }

    pub fn is_black(&self) -> bool {
        self.values.iter().all(|v| *v <= 0.0)
    }

    /// Converts to the target space, a pure function of the space tag.
    pub fn convert(&self, target: ColorSpace) -> Color3 {
        if self.space == target {
            return *self;
        }
        let xyz = self.to_xyz();
        let values = match target {
            ColorSpace::Xyz => xyz,
            ColorSpace::LinearSrgb => xyz_to_linear_srgb(xyz),
            ColorSpace::Srgb => {
                let lin = xyz_to_linear_srgb(xyz);
                lin.map(linear_to_srgb)
            }
        };
        Color3 {
            values,
            space: target,
        }
    }

    pub fn clamp(&self, max: f32) -> Color3 {
        Color3 {
            values: self.values.map(|v| v.clamp(0.0, max)),
            space: self.space,
        }
    }

    fn to_xyz(&self) -> [f32; 3] {
        match self.space {
            ColorSpace::Xyz => self.values,
            ColorSpace::LinearSrgb => linear_srgb_to_xyz(self.values),
            ColorSpace::Srgb => linear_srgb_to_xyz(self.values.map(srgb_to_linear)),
        }
    }

    /// Relative luminance (the Y channel of CIE XYZ).
    pub fn luma(&self) -> f32 {
        self.to_xyz()[1]
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn linear_srgb_to_xyz(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    [
        0.4124564 * r + 0.3575761 * g + 0.1804375 * b,
        0.2126729 * r + 0.7151522 * g + 0.0721750 * b,
        0.0193339 * r + 0.1191920 * g + 0.9503041 * b,
    ]
}

fn xyz_to_linear_srgb(xyz: [f32; 3]) -> [f32; 3] {
    let [x, y, z] = xyz;
    [
        3.2404542 * x - 1.5371385 * y - 0.4985314 * z,
        -0.9692660 * x + 1.8760108 * y + 0.0415560 * z,
        0.0556434 * x - 0.2040259 * y + 1.0572252 * z,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_component() {
        assert!(Color3::new([-0.1, 0.0, 0.0], ColorSpace::Xyz).is_err());
    }

    #[test]
    fn rejects_non_finite() {
        assert!(Color3::new([f32::NAN, 0.0, 0.0], ColorSpace::Xyz).is_err());
    }

    #[test]
    fn roundtrip_srgb_linear_identity_near_gray() {
        let c = Color3::new([0.5, 0.5, 0.5], ColorSpace::Srgb).unwrap();
        let lin = c.convert(ColorSpace::LinearSrgb);
        let back = lin.convert(ColorSpace::Srgb);
        for i in 0..3 {
            assert!((c.values[i] - back.values[i]).abs() < 1e-4);
        }
    }

    #[test]
    fn white_xyz_has_luma_one_ish() {
        let white = Color3::new([1.0, 1.0, 1.0], ColorSpace::LinearSrgb).unwrap();
        let luma = white.luma();
        assert!((luma - 1.0).abs() < 1e-3);
    }
}
