//! MIP-map sampler: `SpectrumMipmap`, `ReflectorMipmap`
//! and `FloatMipmap` share pyramid-build and level-selection algorithms;
//! colour maps build their pyramid in `Color3` space and spectralise each
//! fetched texel on demand, so mip colours stay faithful and the colour
//! extrapolator's dedup cache still amortises repeated texels.
//!
//! The level-selection and EWA math below is ported from the reference
//! mipmap implementation's trilinear/EWA lookup routines, generalised
//! over the three element types instead of duplicated per type.

use crate::color::Color3;
use crate::compositor::{ReflectorCompositor, SpectrumCompositor};
use crate::error::{RenderError, Result};
use crate::ewa_table::EWA_LUT;
use crate::extrapolator::ColorExtrapolator;
use crate::spectrum::{ReflectorLike, SpectrumLike};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    Clamp,
    Black,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    None,
    Trilinear,
    Ewa,
}

struct Level<T> {
    texels: Vec<T>,
    width: usize,
    height: usize,
    width_fp: f32,
    height_fp: f32,
    texel_width: f32,
    texel_height: f32,
}

impl<T: Copy> Level<T> {
    fn new(texels: Vec<T>, width: usize, height: usize) -> Self {
        Level {
            texels,
            width,
            height,
            width_fp: width as f32,
            height_fp: height as f32,
            texel_width: 1.0 / width as f32,
            texel_height: 1.0 / height as f32,
        }
    }

    fn texel(&self, x: usize, y: usize) -> T {
        self.texels[y * self.width + x]
    }
}

fn is_pow2(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

fn downsample<T: Copy>(texels: &[T], w: usize, h: usize, avg4: impl Fn(T, T, T, T) -> T) -> (Vec<T>, usize, usize) {
    let nw = (w / 2).max(1);
    let nh = (h / 2).max(1);
    let get = |texels: &[T], yy: usize, xx: usize| texels[yy.min(h - 1) * w + xx.min(w - 1)];
    let mut out = Vec::with_capacity(nw * nh);
    for j in 0..nh {
        for i in 0..nw {
            let (x0, x1) = (i * 2, (i * 2 + 1).min(w - 1));
            let (y0, y1) = (j * 2, (j * 2 + 1).min(h - 1));
            out.push(avg4(
                get(texels, y0, x0),
                get(texels, y0, x1),
                get(texels, y1, x0),
                get(texels, y1, x1),
            ));
        }
    }
    (out, nw, nh)
}

fn build_levels<T: Copy>(base: Vec<T>, width: usize, height: usize, avg4: impl Fn(T, T, T, T) -> T) -> Result<Vec<Level<T>>> {
    if !is_pow2(width) || !is_pow2(height) {
        return Err(RenderError::invalid("mipmap base dimensions must be powers of two"));
    }
    let num_levels = (width.min(height) as f32).log2().round() as usize + 1;
    let mut levels = Vec::with_capacity(num_levels);
    let (mut w, mut h, mut texels) = (width, height, base);
    levels.push(Level::new(texels.clone(), w, h));
    for _ in 1..num_levels {
        let (next, nw, nh) = downsample(&texels, w, h, &avg4);
        levels.push(Level::new(next.clone(), nw, nh));
        texels = next;
        w = nw;
        h = nh;
    }
    Ok(levels)
}

fn wrap_coords(wrap: WrapMode, s: f32, t: f32) -> Option<(f32, f32)> {
    match wrap {
        WrapMode::Repeat => {
            let mut s = s.fract();
            let mut t = t.fract();
            if s < 0.0 {
                s += 1.0;
            }
            if t < 0.0 {
                t += 1.0;
            }
            Some((s, t))
        }
        WrapMode::Clamp => Some((s.clamp(0.0, 1.0), t.clamp(0.0, 1.0))),
        WrapMode::Black => {
            if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&t) {
                None
            } else {
                Some((s, t))
            }
        }
    }
}

fn texel_index(level_fp: f32, level_n: usize, frac: f32) -> usize {
    let mut x = (level_fp * frac).floor() as isize;
    if x == level_n as isize {
        x -= 1;
    }
    x.clamp(0, level_n as isize - 1) as usize
}

fn float_log2(value: f32) -> f32 {
    value.max(1e-8).log2()
}

fn last_level_index_fp(num_levels: usize) -> f32 {
    (num_levels - 1) as f32
}

/// Continuous LOD estimate shared by trilinear selection across element
/// types: `last_level + log2(max footprint derivative)`.
fn trilinear_lod(num_levels: usize, dsdx: f32, dsdy: f32, dtdx: f32, dtdy: f32) -> f32 {
    let m = dsdx.abs().max(dsdy.abs()).max(dtdx.abs()).max(dtdy.abs());
    last_level_index_fp(num_levels) + float_log2(m)
}

/// Anisotropy-capped EWA axis setup: returns (minor axis length, clamped
/// derivative pairs) or `None` if the footprint degenerates to a point.
fn ewa_axes(
    mut dsdx: f32,
    dtdx: f32,
    mut dsdy: f32,
    dtdy: f32,
    max_anisotropy: f32,
) -> Option<(f32, [f32; 2], [f32; 2])> {
    let mut dst0 = [dsdx, dtdx];
    let mut dst1 = [dsdy, dtdy];
    let mut len0_sq = dst0[0] * dst0[0] + dst0[1] * dst0[1];
    let mut len1_sq = dst1[0] * dst1[0] + dst1[1] * dst1[1];
    if len0_sq < len1_sq {
        std::mem::swap(&mut dst0, &mut dst1);
        std::mem::swap(&mut len0_sq, &mut len1_sq);
    }
    let major_length = len0_sq.sqrt();
    let mut minor_length = len1_sq.sqrt();

    let scaled_minor = minor_length * max_anisotropy;
    if scaled_minor < major_length && minor_length > 0.0 {
        let scale = major_length / scaled_minor;
        dsdx *= scale;
        dsdy *= scale;
        dst0[0] = dsdx;
        dst1[0] = dsdy;
        minor_length *= scale;
    }

    if minor_length == 0.0 {
        return None;
    }
    Some((minor_length, dst0, dst1))
}

/// Elliptically-weighted texel footprint at one level: returns the list of
/// `(texel_s, texel_t, weight)` samples inside the unit ellipse, ported
/// directly from the reference implementation's quadratic-form setup.
fn ewa_footprint(level: &Level<()>, s: f32, t: f32, dst0: [f32; 2], dst1: [f32; 2]) -> Vec<(usize, usize, f32)> {
    let s = s * level.width_fp - 0.5;
    let t = t * level.height_fp - 0.5;
    let dst0 = [dst0[0] * level.width_fp, dst0[1] * level.height_fp];
    let dst1 = [dst1[0] * level.width_fp, dst1[1] * level.height_fp];

    let mut a = dst0[1] * dst0[1] + dst1[1] * dst1[1] + 1.0;
    let mut b = -2.0 * (dst0[0] * dst0[1] + dst1[0] * dst1[1]);
    let mut c = dst0[0] * dst0[0] + dst1[0] * dst1[0] + 1.0;
    let inv_f = 1.0 / (a * c - b * b * 0.25);
    a *= inv_f;
    b *= inv_f;
    c *= inv_f;

    let det = -b * b + 4.0 * a * c;
    let inv_det = 1.0 / det;
    let u_sqrt = (det * c).sqrt();
    let v_sqrt = (a * det).sqrt();

    let s0 = (s - 2.0 * inv_det * u_sqrt).ceil() as isize;
    let s1 = (s + 2.0 * inv_det * u_sqrt).floor() as isize;
    let t0 = (t - 2.0 * inv_det * v_sqrt).ceil() as isize;
    let t1 = (t + 2.0 * inv_det * v_sqrt).floor() as isize;

    let mut samples = Vec::new();
    for it in t0..=t1 {
        let tt = it as f32 - t;
        for is in s0..=s1 {
            let ss = is as f32 - s;
            let r2 = a * ss * ss + b * ss * tt + c * tt * tt;
            if r2 < 1.0 {
                let index = ((r2 * EWA_LUT.len() as f32) as usize).min(EWA_LUT.len() - 1);
                let weight = EWA_LUT[index];
                let wrapped_s = is.rem_euclid(level.width as isize) as usize;
                let wrapped_t = it.rem_euclid(level.height as isize) as usize;
                samples.push((wrapped_s, wrapped_t, weight));
            }
        }
    }
    samples
}

macro_rules! color_pyramid_core {
    () => {
        fn nearest(&self, level: usize, s: f32, t: f32) -> Option<Color3> {
            let (s, t) = wrap_coords(self.wrap, s, t)?;
            let level = &self.levels[level.min(self.levels.len() - 1)];
            let x = texel_index(level.width_fp, level.width, s);
            let y = texel_index(level.height_fp, level.height, t);
            Some(level.texel(x, y))
        }

        fn triangle_filter(&self, level_idx: usize, s: f32, t: f32) -> Vec<(Color3, f32)> {
            let level_idx = level_idx.min(self.levels.len() - 1);
            let level = &self.levels[level_idx];
            let scaled_s = s * level.width_fp;
            let scaled_t = t * level.height_fp;
            let scaled_s0 = (scaled_s - 0.5).floor() + 0.5;
            let scaled_t0 = (scaled_t - 0.5).floor() + 0.5;
            let s0 = scaled_s0 * level.texel_width;
            let t0 = scaled_t0 * level.texel_height;
            let ds = (scaled_s - scaled_s0).clamp(0.0, 1.0);
            let dt = (scaled_t - scaled_t0).clamp(0.0, 1.0);
            let s1 = s0 + level.texel_width;
            let t1 = t0 + level.texel_height;

            let corners = [
                (s0, t0, (1.0 - ds) * (1.0 - dt)),
                (s0, t1, (1.0 - ds) * dt),
                (s1, t0, ds * (1.0 - dt)),
                (s1, t1, ds * dt),
            ];
            corners
                .iter()
                .copied()
                .filter_map(|(s, t, w)| self.nearest(level_idx, s, t).map(|c| (c, w)))
                .collect()
        }

        fn trilinear(&self, s: f32, t: f32, dsdx: f32, dsdy: f32, dtdx: f32, dtdy: f32) -> Vec<(Color3, f32)> {
            let lod = trilinear_lod(self.levels.len(), dsdx, dsdy, dtdx, dtdy);
            if lod < 0.0 {
                return self.triangle_filter(0, s, t);
            }
            let last = last_level_index_fp(self.levels.len());
            if lod >= last {
                return self.triangle_filter(self.levels.len() - 1, s, t);
            }
            let level0 = lod.floor();
            let delta = lod - level0;
            let mut lo = self.triangle_filter(level0 as usize, s, t);
            let hi = self.triangle_filter(level0 as usize + 1, s, t);
            for (_, w) in lo.iter_mut() {
                *w *= 1.0 - delta;
            }
            let mut out = lo;
            out.extend(hi.into_iter().map(|(c, w)| (c, w * delta)));
            out
        }

        fn ewa_at_level(&self, level_idx: usize, s: f32, t: f32, dst0: [f32; 2], dst1: [f32; 2]) -> Vec<(Color3, f32)> {
            if level_idx >= self.levels.len() {
                return self
                    .nearest(self.levels.len() - 1, s, t)
                    .into_iter()
                    .map(|c| (c, 1.0))
                    .collect();
            }
            let level = &self.levels[level_idx];
            let shape = Level::<()> {
                texels: Vec::new(),
                width: level.width,
                height: level.height,
                width_fp: level.width_fp,
                height_fp: level.height_fp,
                texel_width: level.texel_width,
                texel_height: level.texel_height,
            };
            ewa_footprint(&shape, s, t, dst0, dst1)
                .into_iter()
                .map(|(x, y, w)| (level.texel(x, y), w))
                .collect()
        }

        fn ewa(&self, s: f32, t: f32, dsdx: f32, dsdy: f32, dtdx: f32, dtdy: f32, max_anisotropy: f32) -> Vec<(Color3, f32)> {
            let Some((minor_length, dst0, dst1)) = ewa_axes(dsdx, dtdx, dsdy, dtdy, max_anisotropy) else {
                return self.nearest(0, s, t).into_iter().map(|c| (c, 1.0)).collect();
            };
            let lod = (last_level_index_fp(self.levels.len()) + float_log2(minor_length)).max(0.0);
            let lod_floor = lod.floor();
            let level = lod_floor as usize;
            let delta = lod - lod_floor;

            let mut lo = self.ewa_at_level(level, s, t, dst0, dst1);
            let total: f32 = lo.iter().map(|(_, w)| *w).sum();
            if total > 0.0 {
                for (_, w) in lo.iter_mut() {
                    *w = *w / total * (1.0 - delta);
                }
            }
            let mut hi = self.ewa_at_level(level + 1, s, t, dst0, dst1);
            let total_hi: f32 = hi.iter().map(|(_, w)| *w).sum();
            if total_hi > 0.0 {
                for (_, w) in hi.iter_mut() {
                    *w = *w / total_hi * delta;
                }
            }
            lo.extend(hi);
            lo
        }
    };
}

fn weighted_average(samples: &[(Color3, f32)]) -> Option<Color3> {
    let first = samples.first()?.0;
    let total: f32 = samples.iter().map(|(_, w)| *w).sum();
    if total <= 0.0 {
        return Some(first);
    }
    let mut acc = [0.0f32; 3];
    for (c, w) in samples {
        for i in 0..3 {
            acc[i] += c.values[i] * w;
        }
    }
    Some(Color3 {
        values: acc.map(|v| (v / total).max(0.0)),
        space: first.space,
    })
}

/// Shared colour-space pyramid backing `SpectrumMipmap`/`ReflectorMipmap`.
struct ColorPyramid {
    levels: Vec<Level<Color3>>,
    wrap: WrapMode,
    filter: FilterMode,
    max_anisotropy: f32,
}

impl ColorPyramid {
    fn build(texels: Vec<Color3>, width: usize, height: usize, wrap: WrapMode, filter: FilterMode, max_anisotropy: f32) -> Result<Self> {
        if !max_anisotropy.is_finite() || max_anisotropy <= 0.0 {
            return Err(RenderError::invalid("max_anisotropy must be finite and positive"));
        }
        let levels = build_levels(texels, width, height, |a, b, c, d| {
            let space = a.space;
            let mut values = [0.0f32; 3];
            for i in 0..3 {
                values[i] = (a.values[i] + b.values[i] + c.values[i] + d.values[i]) * 0.25;
            }
            Color3 { values, space }
        })?;
        Ok(ColorPyramid {
            levels,
            wrap,
            filter,
            max_anisotropy,
        })
    }

    color_pyramid_core!();

    fn lookup(&self, s: f32, t: f32, dsdx: f32, dsdy: f32, dtdx: f32, dtdy: f32) -> Option<Color3> {
        let samples = match self.filter {
            FilterMode::None => return self.nearest(0, s, t),
            FilterMode::Trilinear => self.trilinear(s, t, dsdx, dsdy, dtdx, dtdy),
            FilterMode::Ewa => self.ewa(s, t, dsdx, dsdy, dtdx, dtdy, self.max_anisotropy),
        };
        weighted_average(&samples)
    }
}

/// Spectral texture backed by a colour pyramid; each fetched texel is
/// spectralised through a `ColorExtrapolator` and combined through a
/// `SpectrumCompositor`, so repeated colours share one cached spectrum.
pub struct SpectrumMipmap {
    pyramid: ColorPyramid,
}

impl SpectrumMipmap {
    pub fn build(texels: Vec<Color3>, width: usize, height: usize, wrap: WrapMode, filter: FilterMode, max_anisotropy: f32) -> Result<Self> {
        Ok(SpectrumMipmap {
            pyramid: ColorPyramid::build(texels, width, height, wrap, filter, max_anisotropy)?,
        })
    }

    pub fn lookup<'s>(
        &self,
        s: f32,
        t: f32,
        dsdx: f32,
        dsdy: f32,
        dtdx: f32,
        dtdy: f32,
        extrapolator: &mut ColorExtrapolator,
        compositor: &'s SpectrumCompositor,
    ) -> Result<Option<&'s dyn SpectrumLike>> {
        let Some(color) = self.pyramid.lookup(s, t, dsdx, dsdy, dtdx, dtdy) else {
            return Ok(None);
        };
        let Some(spectrum) = extrapolator.spectrum(color)? else {
            return Ok(None);
        };
        Ok(Some(compositor.adopt(spectrum)))
    }
}

/// Reflectance texture; same structure as `SpectrumMipmap` but composed
/// through a `ReflectorCompositor`.
pub struct ReflectorMipmap {
    pyramid: ColorPyramid,
}

impl ReflectorMipmap {
    pub fn build(texels: Vec<Color3>, width: usize, height: usize, wrap: WrapMode, filter: FilterMode, max_anisotropy: f32) -> Result<Self> {
        Ok(ReflectorMipmap {
            pyramid: ColorPyramid::build(texels, width, height, wrap, filter, max_anisotropy)?,
        })
    }

    pub fn lookup<'s>(
        &self,
        s: f32,
        t: f32,
        dsdx: f32,
        dsdy: f32,
        dtdx: f32,
        dtdy: f32,
        extrapolator: &mut ColorExtrapolator,
        compositor: &'s ReflectorCompositor,
    ) -> Result<Option<&'s dyn ReflectorLike>> {
        let Some(color) = self.pyramid.lookup(s, t, dsdx, dsdy, dtdx, dtdy) else {
            return Ok(None);
        };
        let Some(reflector) = extrapolator.reflector(color)? else {
            return Ok(None);
        };
        Ok(Some(compositor.adopt(reflector)))
    }
}

/// Plain scalar texture (e.g. bump/displacement or alpha maps); no
/// compositor is needed since `f32` combination is just arithmetic.
pub struct FloatMipmap {
    levels: Vec<Level<f32>>,
    wrap: WrapMode,
    filter: FilterMode,
    max_anisotropy: f32,
}

impl FloatMipmap {
    pub fn build(texels: Vec<f32>, width: usize, height: usize, wrap: WrapMode, filter: FilterMode, max_anisotropy: f32) -> Result<Self> {
        if !max_anisotropy.is_finite() || max_anisotropy <= 0.0 {
            return Err(RenderError::invalid("max_anisotropy must be finite and positive"));
        }
        let levels = build_levels(texels, width, height, |a, b, c, d| (a + b + c + d) * 0.25)?;
        Ok(FloatMipmap {
            levels,
            wrap,
            filter,
            max_anisotropy,
        })
    }

    fn nearest(&self, level: usize, s: f32, t: f32) -> Option<f32> {
        let (s, t) = wrap_coords(self.wrap, s, t)?;
        let level = &self.levels[level.min(self.levels.len() - 1)];
        let x = texel_index(level.width_fp, level.width, s);
        let y = texel_index(level.height_fp, level.height, t);
        Some(level.texel(x, y))
    }

    fn triangle_filter(&self, level_idx: usize, s: f32, t: f32) -> Vec<(f32, f32)> {
        let level_idx = level_idx.min(self.levels.len() - 1);
        let level = &self.levels[level_idx];
        let scaled_s = s * level.width_fp;
        let scaled_t = t * level.height_fp;
        let scaled_s0 = (scaled_s - 0.5).floor() + 0.5;
        let scaled_t0 = (scaled_t - 0.5).floor() + 0.5;
        let s0 = scaled_s0 * level.texel_width;
        let t0 = scaled_t0 * level.texel_height;
        let ds = (scaled_s - scaled_s0).clamp(0.0, 1.0);
        let dt = (scaled_t - scaled_t0).clamp(0.0, 1.0);
        let s1 = s0 + level.texel_width;
        let t1 = t0 + level.texel_height;

        let corners = [
            (s0, t0, (1.0 - ds) * (1.0 - dt)),
            (s0, t1, (1.0 - ds) * dt),
            (s1, t0, ds * (1.0 - dt)),
            (s1, t1, ds * dt),
        ];
        corners
            .iter()
            .copied()
            .filter_map(|(s, t, w)| self.nearest(level_idx, s, t).map(|v| (v, w)))
            .collect()
    }

    fn ewa_at_level(&self, level_idx: usize, s: f32, t: f32, dst0: [f32; 2], dst1: [f32; 2]) -> Vec<(f32, f32)> {
        if level_idx >= self.levels.len() {
            return self
                .nearest(self.levels.len() - 1, s, t)
                .into_iter()
                .map(|v| (v, 1.0))
                .collect();
        }
        let level = &self.levels[level_idx];
        let shape = Level::<()> {
            texels: Vec::new(),
            width: level.width,
            height: level.height,
            width_fp: level.width_fp,
            height_fp: level.height_fp,
            texel_width: level.texel_width,
            texel_height: level.texel_height,
        };
        ewa_footprint(&shape, s, t, dst0, dst1)
            .into_iter()
            .map(|(x, y, w)| (level.texel(x, y), w))
            .collect()
    }

    pub fn lookup(&self, s: f32, t: f32, dsdx: f32, dsdy: f32, dtdx: f32, dtdy: f32) -> Option<f32> {
        let samples: Vec<(f32, f32)> = match self.filter {
            FilterMode::None => return self.nearest(0, s, t),
            FilterMode::Trilinear => {
                let lod = trilinear_lod(self.levels.len(), dsdx, dsdy, dtdx, dtdy);
                if lod < 0.0 {
                    self.triangle_filter(0, s, t)
                } else if lod >= last_level_index_fp(self.levels.len()) {
                    self.triangle_filter(self.levels.len() - 1, s, t)
                } else {
                    let level0 = lod.floor();
                    let delta = lod - level0;
                    let mut lo = self.triangle_filter(level0 as usize, s, t);
                    let hi = self.triangle_filter(level0 as usize + 1, s, t);
                    for (_, w) in lo.iter_mut() {
                        *w *= 1.0 - delta;
                    }
                    lo.extend(hi.into_iter().map(|(v, w)| (v, w * delta)));
                    lo
                }
            }
            FilterMode::Ewa => {
                let Some((minor_length, dst0, dst1)) = ewa_axes(dsdx, dtdx, dsdy, dtdy, self.max_anisotropy) else {
                    return self.nearest(0, s, t);
                };
                let lod = (last_level_index_fp(self.levels.len()) + float_log2(minor_length)).max(0.0);
                let lod_floor = lod.floor();
                let level = lod_floor as usize;
                let delta = lod - lod_floor;
                let mut lo = self.ewa_at_level(level, s, t, dst0, dst1);
                let total: f32 = lo.iter().map(|(_, w)| *w).sum();
                if total > 0.0 {
                    for (_, w) in lo.iter_mut() {
                        *w = *w / total * (1.0 - delta);
                    }
                }
                let mut hi = self.ewa_at_level(level + 1, s, t, dst0, dst1);
                let total_hi: f32 = hi.iter().map(|(_, w)| *w).sum();
                if total_hi > 0.0 {
                    for (_, w) in hi.iter_mut() {
                        *w = *w / total_hi * delta;
                    }
                }
                lo.extend(hi);
                lo
            }
        };
        let total: f32 = samples.iter().map(|(_, w)| *w).sum();
        if total <= 0.0 {
            return samples.first().map(|(v, _)| *v);
        }
        Some(samples.iter().map(|(v, w)| v * w).sum::<f32>() / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorSpace;

    fn checker(n: usize) -> Vec<f32> {
        (0..n * n).map(|i| if (i / n + i % n) % 2 == 0 { 1.0 } else { 0.0 }).collect()
    }

    #[test]
    fn float_mipmap_builds_expected_level_count() {
        let texels = checker(8);
        let mm = FloatMipmap::build(texels, 8, 8, WrapMode::Repeat, FilterMode::None, 16.0).unwrap();
        assert_eq!(mm.levels.len(), 4);
        assert_eq!(mm.levels[3].width, 1);
        assert_eq!(mm.levels[3].height, 1);
    }

    #[test]
    fn float_mipmap_none_filter_is_nearest() {
        let mm = FloatMipmap::build(vec![1.0, 2.0, 3.0, 4.0], 2, 2, WrapMode::Clamp, FilterMode::None, 16.0).unwrap();
        let v = mm.lookup(0.9, 0.1, 0.0, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(v, 2.0);
    }

    #[test]
    fn float_mipmap_black_wrap_out_of_range_is_none() {
        let mm = FloatMipmap::build(vec![1.0; 4], 2, 2, WrapMode::Black, FilterMode::None, 16.0).unwrap();
        assert!(mm.lookup(1.5, 0.5, 0.0, 0.0, 0.0, 0.0).is_none());
    }

    #[test]
    fn float_mipmap_repeat_wraps_negative_coords() {
        let mm = FloatMipmap::build(vec![1.0, 2.0, 3.0, 4.0], 2, 2, WrapMode::Repeat, FilterMode::None, 16.0).unwrap();
        let wrapped = mm.lookup(-0.1, -0.1, 0.0, 0.0, 0.0, 0.0).unwrap();
        let direct = mm.lookup(0.9, 0.9, 0.0, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(wrapped, direct);
    }

    #[test]
    fn float_mipmap_rejects_non_power_of_two() {
        assert!(FloatMipmap::build(vec![0.0; 6], 3, 2, WrapMode::Clamp, FilterMode::None, 16.0).is_err());
    }

    #[test]
    fn float_mipmap_trilinear_uses_coarser_level_for_large_footprint() {
        let mm = FloatMipmap::build(checker(8), 8, 8, WrapMode::Repeat, FilterMode::Trilinear, 16.0).unwrap();
        let v = mm.lookup(0.5, 0.5, 2.0, 0.0, 0.0, 2.0).unwrap();
        assert!(v.is_finite());
    }

    #[test]
    fn spectrum_mipmap_lookup_is_nonnegative() {
        let mut extrapolator = ColorExtrapolator::new();
        let compositor = SpectrumCompositor::new();
        let texels = vec![
            Color3::new([1.0, 0.0, 0.0], ColorSpace::LinearSrgb).unwrap(),
            Color3::new([0.0, 1.0, 0.0], ColorSpace::LinearSrgb).unwrap(),
            Color3::new([0.0, 0.0, 1.0], ColorSpace::LinearSrgb).unwrap(),
            Color3::new([1.0, 1.0, 1.0], ColorSpace::LinearSrgb).unwrap(),
        ];
        let mm = SpectrumMipmap::build(texels, 2, 2, WrapMode::Clamp, FilterMode::None, 16.0).unwrap();
        let s = mm
            .lookup(0.2, 0.2, 0.0, 0.0, 0.0, 0.0, &mut extrapolator, &compositor)
            .unwrap()
            .unwrap();
        assert!(s.sample(550.0) >= 0.0);
    }

    #[test]
    fn reflector_mipmap_lookup_is_bounded() {
        let mut extrapolator = ColorExtrapolator::new();
        let compositor = ReflectorCompositor::new();
        let texels = vec![Color3::new([1.0, 1.0, 1.0], ColorSpace::LinearSrgb).unwrap(); 4];
        let mm = ReflectorMipmap::build(texels, 2, 2, WrapMode::Repeat, FilterMode::Trilinear, 16.0).unwrap();
        let r = mm
            .lookup(0.5, 0.5, 0.1, 0.0, 0.0, 0.1, &mut extrapolator, &compositor)
            .unwrap()
            .unwrap();
        let v = r.sample(550.0);
        assert!((0.0..=1.0).contains(&v));
    }
}
