//! Per-ray compositors: scoped bump arenas that are also content-addressed
//! factories for derived spectra/reflectors. A path tracer with MIS calls
//! `attenuate`/`add` thousands of times per pixel with repeating operands;
//! deduplicating on operand identity keeps the arena's working set small
//! and cache-resident.
//!
//! Allocates trait objects into a scope-owned `Bump`, with a dedup cache in
//! front of the allocator. `reset(&mut self)` requires an exclusive
//! borrow, so the borrow checker refuses to compile any call site that
//! still holds a spectrum/reflector produced before the reset — the
//! invalidation invariant is enforced at compile time, not at runtime.

use std::cell::RefCell;
use std::collections::HashMap;

use bumpalo::Bump;

use crate::spectrum::{ReflectorLike, SharedReflector, SharedSpectrum, SpectrumLike};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum SpectrumKey {
    Sum(usize, usize),
    Attenuated(usize, u32),
    AttenuatedAdd(usize, usize, u32),
    Reflect(usize, usize),
    AttenuateReflection(usize, usize, u32),
}

fn spectrum_addr(s: &dyn SpectrumLike) -> usize {
    s as *const dyn SpectrumLike as *const () as usize
}

fn reflector_addr(r: &dyn ReflectorLike) -> usize {
    r as *const dyn ReflectorLike as *const () as usize
}

struct Sum<'a> {
    a: &'a dyn SpectrumLike,
    b: &'a dyn SpectrumLike,
}

impl SpectrumLike for Sum<'_> {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        self.a.sample(wavelength_nm) + self.b.sample(wavelength_nm)
    }
}

struct Attenuated<'a> {
    a: &'a dyn SpectrumLike,
    k: f32,
}

impl SpectrumLike for Attenuated<'_> {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        self.k * self.a.sample(wavelength_nm)
    }
}

struct AttenuatedAdd<'a> {
    a: &'a dyn SpectrumLike,
    b: &'a dyn SpectrumLike,
    k: f32,
}

impl SpectrumLike for AttenuatedAdd<'_> {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        self.a.sample(wavelength_nm) + self.k * self.b.sample(wavelength_nm)
    }
}

struct Reflect<'a> {
    s: &'a dyn SpectrumLike,
    r: &'a dyn ReflectorLike,
}

impl SpectrumLike for Reflect<'_> {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        self.s.sample(wavelength_nm) * self.r.sample(wavelength_nm)
    }
}

struct AttenuateReflection<'a> {
    s: &'a dyn SpectrumLike,
    r: &'a dyn ReflectorLike,
    k: f32,
}

impl SpectrumLike for AttenuateReflection<'_> {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        self.k * self.s.sample(wavelength_nm) * self.r.sample(wavelength_nm)
    }
}

/// Scoped arena + dedup cache producing arithmetic spectrum combinations.
/// Owned by exactly one render worker; never shared across threads.
pub struct SpectrumCompositor {
    bump: Bump,
    // Lifetime-erased: every stored pointer is only ever dereferenced with
    // a lifetime bounded by `&'s self` (see `get_or_insert`), and `reset`
    // requires `&mut self` to clear it, so the erasure never outlives the
    // arena storage it points into.
    cache: RefCell<HashMap<SpectrumKey, *const (dyn SpectrumLike + 'static)>>,
}

impl SpectrumCompositor {
    pub fn new() -> Self {
        SpectrumCompositor {
            bump: Bump::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Invalidates every spectrum this compositor has ever returned.
    /// Requires `&mut self`: the borrow checker rejects any call site that
    /// still holds a reference derived from this compositor.
    pub fn reset(&mut self) {
        self.bump.reset();
        self.cache.borrow_mut().clear();
    }

    /// Bridges a reference-counted scene-graph spectrum into this
    /// compositor's arena so it can be combined with arena-local composite
    /// nodes through the same `&'s dyn SpectrumLike` reference shape: the
    /// `Arc` itself is bump-allocated, so it lives exactly as long as
    /// everything else the compositor has handed out.
    pub fn adopt<'s>(&'s self, owned: SharedSpectrum) -> &'s dyn SpectrumLike {
        let boxed: &'s SharedSpectrum = self.bump.alloc(owned);
        boxed.as_ref()
    }

    fn get_or_insert<'s, T: SpectrumLike + 's>(
        &'s self,
        key: SpectrumKey,
        make: impl FnOnce() -> T,
    ) -> &'s dyn SpectrumLike {
        if let Some(&ptr) = self.cache.borrow().get(&key) {
            // SAFETY: `ptr` was produced below from a value allocated in
            // `self.bump` and is only invalidated by `reset`, which takes
            // `&mut self` and therefore cannot run while this `&'s self`
            // borrow (or anything derived from it) is alive.
            return unsafe { &*ptr };
        }
        let allocated: &'s mut T = self.bump.alloc_with(make);
        let value: &'s dyn SpectrumLike = allocated;
        // SAFETY: erasing to 'static for storage only; every access path
        // re-bounds the reference to the caller's `&'s self` borrow.
        let erased: *const (dyn SpectrumLike + 'static) =
            unsafe { std::mem::transmute::<&dyn SpectrumLike, &'static dyn SpectrumLike>(value) };
        self.cache.borrow_mut().insert(key, erased);
        value
    }

    pub fn add<'s>(
        &'s self,
        a: Option<&'s dyn SpectrumLike>,
        b: Option<&'s dyn SpectrumLike>,
    ) -> Option<&'s dyn SpectrumLike> {
        match (a, b) {
            (None, None) => None,
            (Some(x), None) | (None, Some(x)) => Some(x),
            (Some(a), Some(b)) => {
                let key = SpectrumKey::Sum(spectrum_addr(a), spectrum_addr(b));
                Some(self.get_or_insert(key, || Sum { a, b }))
            }
        }
    }

    pub fn attenuate<'s>(&'s self, a: Option<&'s dyn SpectrumLike>, k: f32) -> Option<&'s dyn SpectrumLike> {
        let a = a?;
        if k == 0.0 {
            return None;
        }
        if k == 1.0 {
            return Some(a);
        }
        let key = SpectrumKey::Attenuated(spectrum_addr(a), k.to_bits());
        Some(self.get_or_insert(key, || Attenuated { a, k }))
    }

    pub fn attenuated_add<'s>(
        &'s self,
        a: Option<&'s dyn SpectrumLike>,
        b: Option<&'s dyn SpectrumLike>,
        k: f32,
    ) -> Option<&'s dyn SpectrumLike> {
        let Some(b) = b else { return a };
        if k == 0.0 {
            return a;
        }
        let Some(a) = a else { return self.attenuate(Some(b), k) };
        let key = SpectrumKey::AttenuatedAdd(spectrum_addr(a), spectrum_addr(b), k.to_bits());
        Some(self.get_or_insert(key, || AttenuatedAdd { a, b, k }))
    }

    pub fn reflect<'s>(
        &'s self,
        s: Option<&'s dyn SpectrumLike>,
        r: &'s dyn ReflectorLike,
    ) -> Option<&'s dyn SpectrumLike> {
        let s = s?;
        let key = SpectrumKey::Reflect(spectrum_addr(s), reflector_addr(r));
        Some(self.get_or_insert(key, || Reflect { s, r }))
    }

    pub fn attenuate_reflection<'s>(
        &'s self,
        s: Option<&'s dyn SpectrumLike>,
        r: &'s dyn ReflectorLike,
        k: f32,
    ) -> Option<&'s dyn SpectrumLike> {
        let s = s?;
        if k == 0.0 {
            return None;
        }
        let key = SpectrumKey::AttenuateReflection(spectrum_addr(s), reflector_addr(r), k.to_bits());
        Some(self.get_or_insert(key, || AttenuateReflection { s, r, k }))
    }
}

impl Default for SpectrumCompositor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum ReflectorKey {
    Sum(usize, usize),
    Attenuated(usize, u32),
    AttenuatedAdd(usize, usize, u32),
}

struct ReflectorSum<'a> {
    a: &'a dyn ReflectorLike,
    b: &'a dyn ReflectorLike,
}

impl ReflectorLike for ReflectorSum<'_> {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        (self.a.sample(wavelength_nm) + self.b.sample(wavelength_nm)).min(1.0)
    }

    fn albedo(&self) -> f32 {
        (self.a.albedo() + self.b.albedo()).min(1.0)
    }
}

struct ReflectorAttenuated<'a> {
    a: &'a dyn ReflectorLike,
    k: f32,
}

impl ReflectorLike for ReflectorAttenuated<'_> {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        (self.k * self.a.sample(wavelength_nm)).clamp(0.0, 1.0)
    }

    fn albedo(&self) -> f32 {
        (self.k * self.a.albedo()).clamp(0.0, 1.0)
    }
}

struct ReflectorAttenuatedAdd<'a> {
    a: &'a dyn ReflectorLike,
    b: &'a dyn ReflectorLike,
    k: f32,
}

impl ReflectorLike for ReflectorAttenuatedAdd<'_> {
    fn sample(&self, wavelength_nm: f32) -> f32 {
        (self.a.sample(wavelength_nm) + self.k * self.b.sample(wavelength_nm)).clamp(0.0, 1.0)
    }

    fn albedo(&self) -> f32 {
        (self.a.albedo() + self.k * self.b.albedo()).clamp(0.0, 1.0)
    }
}

/// Scoped arena + dedup cache producing arithmetic reflector combinations,
/// used by aggregate BSDFs to average component lobes.
pub struct ReflectorCompositor {
    bump: Bump,
    cache: RefCell<HashMap<ReflectorKey, *const (dyn ReflectorLike + 'static)>>,
}

impl ReflectorCompositor {
    pub fn new() -> Self {
        ReflectorCompositor {
            bump: Bump::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn reset(&mut self) {
        self.bump.reset();
        self.cache.borrow_mut().clear();
    }

    /// See `SpectrumCompositor::adopt`.
    pub fn adopt<'s>(&'s self, owned: SharedReflector) -> &'s dyn ReflectorLike {
        let boxed: &'s SharedReflector = self.bump.alloc(owned);
        boxed.as_ref()
    }

    fn get_or_insert<'s, T: ReflectorLike + 's>(
        &'s self,
        key: ReflectorKey,
        make: impl FnOnce() -> T,
    ) -> &'s dyn ReflectorLike {
        if let Some(&ptr) = self.cache.borrow().get(&key) {
            // SAFETY: see SpectrumCompositor::get_or_insert.
            return unsafe { &*ptr };
        }
        let allocated: &'s mut T = self.bump.alloc_with(make);
        let value: &'s dyn ReflectorLike = allocated;
        let erased: *const (dyn ReflectorLike + 'static) =
            unsafe { std::mem::transmute::<&dyn ReflectorLike, &'static dyn ReflectorLike>(value) };
        self.cache.borrow_mut().insert(key, erased);
        value
    }

    pub fn add<'s>(
        &'s self,
        a: Option<&'s dyn ReflectorLike>,
        b: Option<&'s dyn ReflectorLike>,
    ) -> Option<&'s dyn ReflectorLike> {
        match (a, b) {
            (None, None) => None,
            (Some(x), None) | (None, Some(x)) => Some(x),
            (Some(a), Some(b)) => {
                let key = ReflectorKey::Sum(reflector_addr(a), reflector_addr(b));
                Some(self.get_or_insert(key, || ReflectorSum { a, b }))
            }
        }
    }

    pub fn attenuate<'s>(&'s self, a: Option<&'s dyn ReflectorLike>, k: f32) -> Option<&'s dyn ReflectorLike> {
        let a = a?;
        if k == 0.0 {
            return None;
        }
        if k == 1.0 {
            return Some(a);
        }
        let key = ReflectorKey::Attenuated(reflector_addr(a), k.to_bits());
        Some(self.get_or_insert(key, || ReflectorAttenuated { a, k }))
    }

    pub fn attenuated_add<'s>(
        &'s self,
        a: Option<&'s dyn ReflectorLike>,
        b: Option<&'s dyn ReflectorLike>,
        k: f32,
    ) -> Option<&'s dyn ReflectorLike> {
        let Some(b) = b else { return a };
        if k == 0.0 {
            return a;
        }
        let Some(a) = a else { return self.attenuate(Some(b), k) };
        let key = ReflectorKey::AttenuatedAdd(reflector_addr(a), reflector_addr(b), k.to_bits());
        Some(self.get_or_insert(key, || ReflectorAttenuatedAdd { a, b, k }))
    }
}

impl Default for ReflectorCompositor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::ConstantSpectrum;

    #[test]
    fn add_identity_with_null() {
        let c = SpectrumCompositor::new();
        let a = ConstantSpectrum::new(2.0).unwrap();
        let r = c.add(Some(&a), None).unwrap();
        assert_eq!(r.sample(500.0), 2.0);
    }

    #[test]
    fn attenuate_zero_is_null() {
        let c = SpectrumCompositor::new();
        let a = ConstantSpectrum::new(2.0).unwrap();
        assert!(c.attenuate(Some(&a), 0.0).is_none());
    }

    #[test]
    fn attenuate_one_is_identity() {
        let c = SpectrumCompositor::new();
        let a = ConstantSpectrum::new(2.0).unwrap();
        let r = c.attenuate(Some(&a), 1.0).unwrap();
        assert!(std::ptr::eq(r, &a as &dyn SpectrumLike));
    }

    #[test]
    fn compositor_linearity() {
        let c = SpectrumCompositor::new();
        let a = ConstantSpectrum::new(2.0).unwrap();
        let b = ConstantSpectrum::new(3.0).unwrap();
        let sum = c.add(Some(&a), Some(&b)).unwrap();
        let scaled = c.attenuate(Some(sum), 4.0).unwrap();
        let expected = 4.0 * (a.sample(550.0) + b.sample(550.0));
        assert!((scaled.sample(550.0) - expected).abs() < 1e-6);
    }

    #[test]
    fn dedup_returns_same_identity() {
        let c = SpectrumCompositor::new();
        let a = ConstantSpectrum::new(2.0).unwrap();
        let b = ConstantSpectrum::new(3.0).unwrap();
        let s1 = c.add(Some(&a), Some(&b)).unwrap() as *const dyn SpectrumLike;
        let s2 = c.add(Some(&a), Some(&b)).unwrap() as *const dyn SpectrumLike;
        assert!(std::ptr::eq(s1, s2));
    }

    #[test]
    fn reset_invalidation_preserves_semantic_equality() {
        let mut c = SpectrumCompositor::new();
        let a = ConstantSpectrum::new(2.0).unwrap();
        let b = ConstantSpectrum::new(3.0).unwrap();
        let before = c.add(Some(&a), Some(&b)).unwrap().sample(500.0);
        c.reset();
        let after = c.add(Some(&a), Some(&b)).unwrap().sample(500.0);
        assert_eq!(before, after);
    }

    #[test]
    fn attenuated_add_fused_matches_separate_ops() {
        let c = SpectrumCompositor::new();
        let a = ConstantSpectrum::new(2.0).unwrap();
        let b = ConstantSpectrum::new(3.0).unwrap();
        let fused = c.attenuated_add(Some(&a), Some(&b), 0.5).unwrap();
        assert!((fused.sample(500.0) - (2.0 + 0.5 * 3.0)).abs() < 1e-6);
    }

    #[test]
    fn reflect_and_attenuate_reflection() {
        use crate::spectrum::ConstantReflector;
        let c = SpectrumCompositor::new();
        let s = ConstantSpectrum::new(4.0).unwrap();
        let r = ConstantReflector::new(0.5).unwrap();
        let reflected = c.reflect(Some(&s), &r).unwrap();
        assert!((reflected.sample(500.0) - 2.0).abs() < 1e-6);
        let attenuated = c.attenuate_reflection(Some(&s), &r, 2.0).unwrap();
        assert!((attenuated.sample(500.0) - 4.0).abs() < 1e-6);
    }
}
