// Copyright (c) 2024 Mike Tsao

use crate::{prelude::*, traits::Configurables};
use core::f64::consts::{PI, SQRT_2};
use delegate::delegate;
use derivative::Derivative;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// The response shapes a [BiQuadFilterCore] can take.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    EnumIter,
    IntoStaticStr,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FilterType {
    #[default]
    #[allow(missing_docs)]
    LowPass,
    #[allow(missing_docs)]
    HighPass,
    /// Constant 0 dB peak gain.
    BandPass,
    #[allow(missing_docs)]
    Notch,
    #[allow(missing_docs)]
    AllPass,
    /// Boost or cut around the frequency by `gain_db`.
    PeakingEq,
    /// Boost or cut below the frequency by `gain_db`.
    LowShelf,
    /// Boost or cut above the frequency by `gain_db`.
    HighShelf,
}

/// A two-pole, two-zero filter with one of the classic responses. Q is the
/// linear (not decibel) resonance.
#[derive(Debug, Clone, Derivative, Builder)]
#[derivative(Default)]
#[builder(default, build_fn(private, name = "build_from_builder"))]
pub struct BiQuadFilterCore {
    filter_type: FilterType,

    #[derivative(Default(value = "FrequencyHz(350.0)"))]
    frequency: FrequencyHz,

    #[derivative(Default(value = "1.0"))]
    q: ParameterType,

    /// Only the peaking and shelving types use this.
    gain_db: ParameterType,

    #[builder(setter(skip))]
    channels: [BiQuadFilter; 2],

    #[builder(setter(skip))]
    c: Configurables,
}
impl BiQuadFilterCoreBuilder {
    /// The overridden Builder build() method.
    pub fn build(&self) -> Result<BiQuadFilterCore, BiQuadFilterCoreBuilderError> {
        self.build_from_builder().map(|mut s| {
            s.update_coefficients();
            s
        })
    }
}
impl Configurable for BiQuadFilterCore {
    delegate! {
        to self.c {
            fn sample_rate(&self) -> SampleRate;
        }
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.c.update_sample_rate(sample_rate);
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.channels.iter_mut().for_each(|c| c.clear_history());
    }
}
impl TransformsAudio for BiQuadFilterCore {
    fn transform_channel(&mut self, channel: usize, input_sample: Sample) -> Sample {
        self.channels[channel.min(1)].transform(input_sample)
    }
}
impl BiQuadFilterCore {
    fn update_coefficients(&mut self) {
        let coefficients = CoefficientSet::for_type(
            self.filter_type,
            self.c.sample_rate(),
            self.frequency,
            self.q,
            self.gain_db,
        );
        self.channels
            .iter_mut()
            .for_each(|c| c.coefficients = coefficients);
    }

    #[allow(missing_docs)]
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }
    #[allow(missing_docs)]
    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        if self.filter_type != filter_type {
            self.filter_type = filter_type;
            self.update_coefficients();
        }
    }
    #[allow(missing_docs)]
    pub fn frequency(&self) -> FrequencyHz {
        self.frequency
    }
    #[allow(missing_docs)]
    pub fn set_frequency(&mut self, frequency: FrequencyHz) {
        if self.frequency != frequency {
            self.frequency = frequency;
            self.update_coefficients();
        }
    }
    #[allow(missing_docs)]
    pub fn q(&self) -> ParameterType {
        self.q
    }
    #[allow(missing_docs)]
    pub fn set_q(&mut self, q: ParameterType) {
        if self.q != q {
            self.q = q;
            self.update_coefficients();
        }
    }
    #[allow(missing_docs)]
    pub fn gain_db(&self) -> ParameterType {
        self.gain_db
    }
    #[allow(missing_docs)]
    pub fn set_gain_db(&mut self, gain_db: ParameterType) {
        if self.gain_db != gain_db {
            self.gain_db = gain_db;
            self.update_coefficients();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CoefficientSet {
    a0: f64,
    a1: f64,
    a2: f64,
    b0: f64,
    b1: f64,
    b2: f64,
}
impl Default for CoefficientSet {
    // This is an identity set.
    fn default() -> Self {
        Self {
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
        }
    }
}
impl CoefficientSet {
    // Robert Bristow-Johnson's audio EQ cookbook.
    //
    // f0 is the center frequency, corner frequency, or shelf midpoint,
    // depending on the filter type. A*Q is the classic EE Q for peaking EQ, so
    // that a boost of N dB followed by a cut of N dB with the same Q and f0
    // comes out flat. Shelves use a slope of S = 1, the steepest that stays
    // monotonic.
    fn for_type(
        filter_type: FilterType,
        sample_rate: SampleRate,
        frequency: FrequencyHz,
        q: ParameterType,
        gain_db: ParameterType,
    ) -> Self {
        let nyquist = f64::from(sample_rate) / 2.0;
        let f0 = frequency.0.clamp(1.0, nyquist * 0.999);
        let w0 = 2.0 * PI * f0 / f64::from(sample_rate);
        let (w0sin, w0cos) = w0.sin_cos();
        let alpha = w0sin / (2.0 * q.max(ParameterType::EPSILON));
        let a = 10.0f64.powf(gain_db / 40.0);

        match filter_type {
            FilterType::LowPass => Self {
                b0: (1.0 - w0cos) / 2.0,
                b1: 1.0 - w0cos,
                b2: (1.0 - w0cos) / 2.0,
                a0: 1.0 + alpha,
                a1: -2.0 * w0cos,
                a2: 1.0 - alpha,
            },
            FilterType::HighPass => Self {
                b0: (1.0 + w0cos) / 2.0,
                b1: -(1.0 + w0cos),
                b2: (1.0 + w0cos) / 2.0,
                a0: 1.0 + alpha,
                a1: -2.0 * w0cos,
                a2: 1.0 - alpha,
            },
            FilterType::BandPass => Self {
                b0: alpha,
                b1: 0.0,
                b2: -alpha,
                a0: 1.0 + alpha,
                a1: -2.0 * w0cos,
                a2: 1.0 - alpha,
            },
            FilterType::Notch => Self {
                b0: 1.0,
                b1: -2.0 * w0cos,
                b2: 1.0,
                a0: 1.0 + alpha,
                a1: -2.0 * w0cos,
                a2: 1.0 - alpha,
            },
            FilterType::AllPass => Self {
                b0: 1.0 - alpha,
                b1: -2.0 * w0cos,
                b2: 1.0 + alpha,
                a0: 1.0 + alpha,
                a1: -2.0 * w0cos,
                a2: 1.0 - alpha,
            },
            FilterType::PeakingEq => Self {
                b0: 1.0 + alpha * a,
                b1: -2.0 * w0cos,
                b2: 1.0 - alpha * a,
                a0: 1.0 + alpha / a,
                a1: -2.0 * w0cos,
                a2: 1.0 - alpha / a,
            },
            FilterType::LowShelf => {
                let shelf = 2.0 * a.sqrt() * (w0sin / SQRT_2);
                Self {
                    b0: a * ((a + 1.0) - (a - 1.0) * w0cos + shelf),
                    b1: 2.0 * a * ((a - 1.0) - (a + 1.0) * w0cos),
                    b2: a * ((a + 1.0) - (a - 1.0) * w0cos - shelf),
                    a0: (a + 1.0) + (a - 1.0) * w0cos + shelf,
                    a1: -2.0 * ((a - 1.0) + (a + 1.0) * w0cos),
                    a2: (a + 1.0) + (a - 1.0) * w0cos - shelf,
                }
            }
            FilterType::HighShelf => {
                let shelf = 2.0 * a.sqrt() * (w0sin / SQRT_2);
                Self {
                    b0: a * ((a + 1.0) + (a - 1.0) * w0cos + shelf),
                    b1: -2.0 * a * ((a - 1.0) + (a + 1.0) * w0cos),
                    b2: a * ((a + 1.0) + (a - 1.0) * w0cos - shelf),
                    a0: (a + 1.0) - (a - 1.0) * w0cos + shelf,
                    a1: 2.0 * ((a - 1.0) - (a + 1.0) * w0cos),
                    a2: (a + 1.0) - (a - 1.0) * w0cos - shelf,
                }
            }
        }
    }
}

/// <https://en.wikipedia.org/wiki/Digital_biquad_filter>, direct form I.
#[derive(Clone, Debug, Default)]
struct BiQuadFilter {
    coefficients: CoefficientSet,

    // x(n-1), x(n-2), y(n-1), y(n-2)
    sample_m1: f64,
    sample_m2: f64,
    output_m1: f64,
    output_m2: f64,
}
impl BiQuadFilter {
    fn transform(&mut self, input_sample: Sample) -> Sample {
        let c = &self.coefficients;
        let s64 = input_sample.0;
        let r = (c.b0 / c.a0) * s64 + (c.b1 / c.a0) * self.sample_m1 + (c.b2 / c.a0) * self.sample_m2
            - (c.a1 / c.a0) * self.output_m1
            - (c.a2 / c.a0) * self.output_m2;

        // Scroll everything forward in time.
        self.sample_m2 = self.sample_m1;
        self.sample_m1 = s64;

        self.output_m2 = self.output_m1;
        self.output_m1 = r;
        Sample(r)
    }

    fn clear_history(&mut self) {
        self.sample_m1 = 0.0;
        self.sample_m2 = 0.0;
        self.output_m1 = 0.0;
        self.output_m2 = 0.0;
    }
}
