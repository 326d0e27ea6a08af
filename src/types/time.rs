// Copyright (c) 2024 Mike Tsao

//! Handles digital-audio and wall-clock time.

use core::{
    fmt,
    ops::{Add, Div, Mul, Sub},
};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// Wall-clock time, as measured against the processing context's clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Seconds(pub f64);
impl Seconds {
    /// Zero seconds.
    pub const fn zero() -> Seconds {
        Seconds(0.0)
    }

    /// Returns the later of the two times.
    pub fn max(self, other: Seconds) -> Seconds {
        Seconds(self.0.max(other.0))
    }
}
impl From<f64> for Seconds {
    fn from(value: f64) -> Self {
        Self(value)
    }
}
impl From<f32> for Seconds {
    fn from(value: f32) -> Self {
        Self(value as f64)
    }
}
impl From<Seconds> for f64 {
    fn from(value: Seconds) -> Self {
        value.0
    }
}
impl Add for Seconds {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}
impl Add<f64> for Seconds {
    type Output = Self;

    fn add(self, rhs: f64) -> Self::Output {
        Self(self.0 + rhs)
    }
}
impl Sub for Seconds {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}
impl Mul<f64> for Seconds {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}
impl Div<Seconds> for Seconds {
    type Output = f64;

    fn div(self, rhs: Seconds) -> Self::Output {
        self.0 / rhs.0
    }
}
impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:0.3}s", self.0))
    }
}

/// Samples per second. Always a positive integer; zero is replaced with the
/// default.
#[derive(Synonym, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[synonym(skip(Default))]
#[serde(rename_all = "kebab-case")]
pub struct SampleRate(#[derivative(Default(value = "44100"))] pub usize);
#[allow(missing_docs)]
impl SampleRate {
    pub const DEFAULT_SAMPLE_RATE: usize = 44100;
    pub const DEFAULT: SampleRate = SampleRate::new(Self::DEFAULT_SAMPLE_RATE);

    pub const fn new(value: usize) -> Self {
        if value != 0 {
            Self(value)
        } else {
            Self(Self::DEFAULT_SAMPLE_RATE)
        }
    }

    /// The duration of a single frame at this rate.
    pub fn frame_duration(&self) -> Seconds {
        Seconds(1.0 / self.0 as f64)
    }

    /// How many whole frames fit in the given duration.
    pub fn frames_in(&self, seconds: Seconds) -> usize {
        (self.0 as f64 * seconds.0.max(0.0)) as usize
    }
}
impl From<SampleRate> for f64 {
    fn from(value: SampleRate) -> Self {
        value.0 as f64
    }
}
impl From<SampleRate> for u32 {
    fn from(value: SampleRate) -> Self {
        value.0 as u32
    }
}
impl Mul<Seconds> for SampleRate {
    type Output = usize;

    // (sample rate x seconds) = buffer size
    fn mul(self, rhs: Seconds) -> Self::Output {
        self.frames_in(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rate_default_is_reasonable() {
        let sample_rate = SampleRate::default();
        assert_eq!(sample_rate.0, 44100);
        assert_eq!(SampleRate::new(0), SampleRate::DEFAULT);
    }

    #[test]
    fn frames_and_seconds() {
        let sample_rate = SampleRate::new(48000);
        assert_eq!(sample_rate * Seconds(0.5), 24000);
        assert_eq!(sample_rate.frames_in(Seconds(-1.0)), 0);
        assert_eq!(Seconds(1.5) + Seconds(0.5), Seconds(2.0));
        assert_eq!(Seconds(1.0) / Seconds(4.0), 0.25);
    }
}
