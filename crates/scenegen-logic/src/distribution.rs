//! Randomizable values and the resolver that draws concrete values from them.
//!
//! A [`Choice`] is a literal, a non-empty list of nested choices (uniform pick,
//! then recurse), or an inclusive numeric range. Anything that can sit inside
//! a choice implements [`Draw`]; containers and templates implement
//! [`Resolve`]. Nothing here caches: every call draws again.
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use scenegen_logic::distribution::{Choice, Resolve};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let steps: Choice<i64> = Choice::range(1, 3);
//! let drawn = steps.resolve(&mut rng);
//! assert!((1..=3).contains(&drawn));
//! ```

use std::convert::Infallible;
use std::fmt;

use rand::Rng;

use crate::geometry::Vec3;

/// Decimal places kept when drawing from a float range.
pub const FLOAT_PRECISION: i32 = 4;

/// Round to [`FLOAT_PRECISION`] decimal places.
pub fn round_precision(value: f64) -> f64 {
    let scale = 10_f64.powi(FLOAT_PRECISION);
    (value * scale).round() / scale
}

/// Uniform draw from `[lo, hi]`. A width past `f64::MAX` is interpolated
/// instead, since `gen_range` refuses it.
pub fn uniform_inclusive<R: Rng + ?Sized>(lo: f64, hi: f64, rng: &mut R) -> f64 {
    if (hi - lo).is_finite() {
        rng.gen_range(lo..=hi)
    } else {
        let t: f64 = rng.gen();
        lo * (1.0 - t) + hi * t
    }
}

/// Inclusive bounds of a numeric range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span<B> {
    pub min: B,
    pub max: B,
}

impl<B: PartialOrd + Copy> Span<B> {
    /// Bounds in ascending order.
    fn ordered(&self) -> (B, B) {
        if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        }
    }
}

/// A value type that can appear inside a [`Choice`].
///
/// `Bound` is the range bound type: the type itself for numerics,
/// [`Infallible`] for everything else, so a range over a string or a
/// composite cannot be constructed.
pub trait Draw: Clone + fmt::Debug + PartialEq {
    type Output;
    type Bound: Clone + Copy + fmt::Debug + PartialOrd;

    /// Concrete value for a literal.
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Output;

    /// Uniform draw from an inclusive range.
    fn draw_span<R: Rng + ?Sized>(span: &Span<Self::Bound>, rng: &mut R) -> Self::Output;

    /// Reject a range that cannot be drawn from.
    fn check_span(_span: &Span<Self::Bound>) -> Result<(), String> {
        Ok(())
    }
}

/// Anything that can be resolved into a concrete value.
pub trait Resolve {
    type Output;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Output;
}

/// Non-empty list of alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct Options<T: Draw>(Vec<Choice<T>>);

impl<T: Draw> Options<T> {
    /// `None` if `items` is empty.
    pub fn new(items: Vec<Choice<T>>) -> Option<Self> {
        (!items.is_empty()).then_some(Self(items))
    }

    pub fn items(&self) -> &[Choice<T>] {
        &self.0
    }
}

/// A randomizable field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice<T: Draw> {
    Fixed(T),
    OneOf(Options<T>),
    Range(Span<T::Bound>),
}

impl<T: Draw> Choice<T> {
    pub fn fixed(value: impl Into<T>) -> Self {
        Choice::Fixed(value.into())
    }

    /// Uniform pick among `first` and `rest`.
    pub fn pick(first: impl Into<T>, rest: impl IntoIterator<Item = T>) -> Self {
        let mut items = vec![Choice::Fixed(first.into())];
        items.extend(rest.into_iter().map(Choice::Fixed));
        Choice::OneOf(Options(items))
    }

    /// Uniform pick among nested choices; `None` if `items` is empty.
    pub fn one_of(items: Vec<Choice<T>>) -> Option<Self> {
        Options::new(items).map(Choice::OneOf)
    }

    pub fn range(min: T::Bound, max: T::Bound) -> Self {
        Choice::Range(Span { min, max })
    }

    /// Every literal reachable from this choice, in declaration order.
    pub fn literals(&self) -> Vec<&T> {
        match self {
            Choice::Fixed(v) => vec![v],
            Choice::OneOf(options) => options.0.iter().flat_map(|c| c.literals()).collect(),
            Choice::Range(_) => Vec::new(),
        }
    }
}

impl<T: Draw> From<T> for Choice<T> {
    fn from(value: T) -> Self {
        Choice::Fixed(value)
    }
}

impl<T: Draw> Resolve for Choice<T> {
    type Output = T::Output;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> T::Output {
        match self {
            Choice::Fixed(value) => value.draw(rng),
            Choice::OneOf(options) => {
                let index = rng.gen_range(0..options.0.len());
                options.0[index].resolve(rng)
            }
            Choice::Range(span) => T::draw_span(span, rng),
        }
    }
}

impl<T: Resolve> Resolve for Option<T> {
    type Output = Option<T::Output>;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Output {
        self.as_ref().map(|v| v.resolve(rng))
    }
}

impl<T: Resolve> Resolve for Vec<T> {
    type Output = Vec<T::Output>;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Output {
        self.iter().map(|v| v.resolve(rng)).collect()
    }
}

// ── Leaf types ──────────────────────────────────────────────────────────

impl Draw for i64 {
    type Output = i64;
    type Bound = i64;

    fn draw<R: Rng + ?Sized>(&self, _rng: &mut R) -> i64 {
        *self
    }

    fn draw_span<R: Rng + ?Sized>(span: &Span<i64>, rng: &mut R) -> i64 {
        let (lo, hi) = span.ordered();
        rng.gen_range(lo..=hi)
    }
}

impl Draw for f64 {
    type Output = f64;
    type Bound = f64;

    fn draw<R: Rng + ?Sized>(&self, _rng: &mut R) -> f64 {
        *self
    }

    fn draw_span<R: Rng + ?Sized>(span: &Span<f64>, rng: &mut R) -> f64 {
        let (lo, hi) = span.ordered();
        if lo == hi {
            return lo;
        }
        round_precision(uniform_inclusive(lo, hi, rng)).clamp(lo, hi)
    }

    fn check_span(span: &Span<f64>) -> Result<(), String> {
        if (span.max - span.min).is_finite() {
            Ok(())
        } else {
            Err(format!(
                "range {} to {} is wider than the largest float",
                span.min, span.max
            ))
        }
    }
}

impl Draw for bool {
    type Output = bool;
    type Bound = Infallible;

    fn draw<R: Rng + ?Sized>(&self, _rng: &mut R) -> bool {
        *self
    }

    fn draw_span<R: Rng + ?Sized>(span: &Span<Infallible>, _rng: &mut R) -> bool {
        let never: Infallible = span.min;
        match never {}
    }
}

impl Draw for String {
    type Output = String;
    type Bound = Infallible;

    fn draw<R: Rng + ?Sized>(&self, _rng: &mut R) -> String {
        self.clone()
    }

    fn draw_span<R: Rng + ?Sized>(span: &Span<Infallible>, _rng: &mut R) -> String {
        let never: Infallible = span.min;
        match never {}
    }
}

/// A drawn `None` is an explicit null, distinct from an absent field.
impl<T: Draw> Draw for Option<T> {
    type Output = Option<T::Output>;
    type Bound = T::Bound;

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Output {
        self.as_ref().map(|v| v.draw(rng))
    }

    fn draw_span<R: Rng + ?Sized>(span: &Span<T::Bound>, rng: &mut R) -> Self::Output {
        Some(T::draw_span(span, rng))
    }

    fn check_span(span: &Span<T::Bound>) -> Result<(), String> {
        T::check_span(span)
    }
}

// ── Composites ──────────────────────────────────────────────────────────

/// A point whose axes are drawn independently. `y` defaults to the floor.
#[derive(Debug, Clone, PartialEq)]
pub struct Vec3Template {
    pub x: Choice<f64>,
    pub y: Option<Choice<f64>>,
    pub z: Choice<f64>,
}

impl Vec3Template {
    pub fn floor(x: impl Into<Choice<f64>>, z: impl Into<Choice<f64>>) -> Self {
        Self {
            x: x.into(),
            y: None,
            z: z.into(),
        }
    }
}

impl From<Vec3> for Vec3Template {
    fn from(v: Vec3) -> Self {
        Self {
            x: Choice::Fixed(v.x),
            y: Some(Choice::Fixed(v.y)),
            z: Choice::Fixed(v.z),
        }
    }
}

impl Draw for Vec3Template {
    type Output = Vec3;
    type Bound = Infallible;

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        Vec3::new(
            self.x.resolve(rng),
            self.y.resolve(rng).unwrap_or(0.0),
            self.z.resolve(rng),
        )
    }

    fn draw_span<R: Rng + ?Sized>(span: &Span<Infallible>, _rng: &mut R) -> Vec3 {
        let never: Infallible = span.min;
        match never {}
    }
}
