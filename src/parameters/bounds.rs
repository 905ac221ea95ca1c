//! Parameter bounds and the bounded/unbounded variable mapping.
//!
//! The optimizer works on unbounded internal variables. Bounded parameters
//! are mapped to and from that space with the MINUIT transformations, so any
//! internal value the optimizer proposes lands inside the bounds.

use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must be less than max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Bound is NaN")]
    NanBound,
}

/// Which sides of a parameter are bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsKind {
    Unbounded,
    Lower,
    Upper,
    Both,
}

/// Bounds on a parameter value; infinite on both sides by default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lower limit (may be `-inf`)
    pub min: f64,

    /// Upper limit (may be `inf`)
    pub max: f64,
}

// Infinite limits are written as `null` so the JSON stays portable.
impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct Limits {
            min: Option<f64>,
            max: Option<f64>,
        }

        Limits {
            min: self.min.is_finite().then_some(self.min),
            max: self.max.is_finite().then_some(self.max),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Limits {
            #[serde(default)]
            min: Option<f64>,
            #[serde(default)]
            max: Option<f64>,
        }

        let limits = Limits::deserialize(deserializer)?;
        Bounds::new(
            limits.min.unwrap_or(NEG_INFINITY),
            limits.max.unwrap_or(INFINITY),
        )
        .map_err(serde::de::Error::custom)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// Create bounds `[min, max]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelfit::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.clamp(12.0), 10.0);
    /// assert!(Bounds::new(1.0, 1.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() {
            return Err(BoundsError::NanBound);
        }
        if min >= max {
            return Err(BoundsError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// No bounds at all.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Only a lower limit.
    pub fn lower(min: f64) -> Result<Self, BoundsError> {
        Self::new(min, INFINITY)
    }

    /// Only an upper limit.
    pub fn upper(max: f64) -> Result<Self, BoundsError> {
        Self::new(NEG_INFINITY, max)
    }

    pub fn kind(&self) -> BoundsKind {
        match (self.min.is_finite(), self.max.is_finite()) {
            (false, false) => BoundsKind::Unbounded,
            (true, false) => BoundsKind::Lower,
            (false, true) => BoundsKind::Upper,
            (true, true) => BoundsKind::Both,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// MINUIT-style mapping between external (bounded) and internal values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Map an external value into the optimizer's unbounded space.
    ///
    /// Values outside the bounds are clamped first.
    pub fn to_internal(&self, external: f64) -> f64 {
        let Bounds { min, max } = self.bounds;
        let value = self.bounds.clamp(external);
        match self.bounds.kind() {
            BoundsKind::Unbounded => value,
            BoundsKind::Lower => ((value - min + 1.0).powi(2) - 1.0).sqrt(),
            BoundsKind::Upper => ((max - value + 1.0).powi(2) - 1.0).sqrt(),
            BoundsKind::Both => (2.0 * (value - min) / (max - min) - 1.0).asin(),
        }
    }

    /// Map an internal value back to the bounded external space.
    pub fn to_external(&self, internal: f64) -> f64 {
        let Bounds { min, max } = self.bounds;
        match self.bounds.kind() {
            BoundsKind::Unbounded => internal,
            BoundsKind::Lower => min - 1.0 + (internal * internal + 1.0).sqrt(),
            BoundsKind::Upper => max + 1.0 - (internal * internal + 1.0).sqrt(),
            BoundsKind::Both => min + (internal.sin() + 1.0) * (max - min) / 2.0,
        }
    }

    /// Derivative `d external / d internal` evaluated at `internal`.
    pub fn gradient(&self, internal: f64) -> f64 {
        let Bounds { min, max } = self.bounds;
        match self.bounds.kind() {
            BoundsKind::Unbounded => 1.0,
            BoundsKind::Lower => internal / (internal * internal + 1.0).sqrt(),
            BoundsKind::Upper => -internal / (internal * internal + 1.0).sqrt(),
            BoundsKind::Both => internal.cos() * (max - min) / 2.0,
        }
    }
}
