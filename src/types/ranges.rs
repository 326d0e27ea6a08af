// Copyright (c) 2024 Mike Tsao

use serde::{Deserialize, Serialize};

/// An f64 held inside `LOWER..=UPPER`. Out-of-range values are clamped on the
/// way in, without complaint, which is what level and pan controls want.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RangedF64<const LOWER: i8, const UPPER: i8>(pub f64);
impl<const LOWER: i8, const UPPER: i8> RangedF64<LOWER, UPPER> {
    /// The highest valid value.
    pub const MAX: f64 = UPPER as f64;
    /// The lowest valid value.
    pub const MIN: f64 = LOWER as f64;

    /// Clamps `value` into range.
    pub fn new(value: f64) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    #[allow(missing_docs)]
    pub const fn maximum() -> Self {
        Self(Self::MAX)
    }

    #[allow(missing_docs)]
    pub const fn minimum() -> Self {
        Self(Self::MIN)
    }
}
impl<const LOWER: i8, const UPPER: i8> From<f64> for RangedF64<LOWER, UPPER> {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}
impl<const LOWER: i8, const UPPER: i8> From<RangedF64<LOWER, UPPER>> for f64 {
    fn from(value: RangedF64<LOWER, UPPER>) -> Self {
        value.0
    }
}

/// Gains, volumes, and mix levels: 0.0 to 1.0.
pub type Normal = RangedF64<0, 1>;
impl Default for Normal {
    // Unity. A level that defaults to silence is never what anyone wanted.
    fn default() -> Self {
        Self::maximum()
    }
}

/// Stereo position: -1.0 is hard left, 1.0 hard right.
pub type BipolarNormal = RangedF64<-1, 1>;
impl Default for BipolarNormal {
    fn default() -> Self {
        Self(0.0)
    }
}
