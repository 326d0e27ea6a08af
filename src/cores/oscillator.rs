// Copyright (c) 2024 Mike Tsao

use crate::{prelude::*, traits::Configurables};
use core::f64::consts::PI;
use delegate::delegate;
use derivative::Derivative;
use derive_builder::Builder;
use kahan::KahanSum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter, IntoStaticStr};

/// Classic oscillator waveforms
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    EnumCount,
    EnumIter,
    IntoStaticStr,
    PartialEq,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Waveform {
    /// Silence
    None,
    /// Sine wave
    #[default]
    Sine,
    /// Square wave
    Square,
    /// Square wave with a specified duty cycle
    PulseWidth(Normal),
    /// Triangle wave
    Triangle,
    /// Sawtooth wave
    Sawtooth,
    /// White noise
    Noise,
}

/// A periodic signal generator. The owner supplies the frequency every
/// frame, so it can be automated or modulated at audio rate without the
/// waveform clicking.
#[derive(Clone, Debug, Builder, Derivative)]
#[derivative(Default)]
#[builder(default, build_fn(private, name = "build_from_builder"))]
pub struct Oscillator {
    /// The fundamental waveform for this oscillator.
    waveform: Waveform,

    /// Hertz. Any positive number. 440 = A4
    #[derivative(Default(value = "FrequencyHz(440.0)"))]
    frequency: FrequencyHz,

    #[builder(setter(skip))]
    e: OscillatorEphemerals,
}
#[derive(Clone, Debug, Derivative)]
#[derivative(Default)]
struct OscillatorEphemerals {
    /// working variables to generate semi-deterministic noise.
    #[derivative(Default(value = "0x70f4f854"))]
    noise_x1: u32,
    #[derivative(Default(value = "0xe1e9f0a7"))]
    noise_x2: u32,

    // Where we are in the current cycle, 0.0..1.0. Remembering this (rather
    // than recomputing it from elapsed time) keeps frequency changes from
    // producing discontinuities. Kahan summation keeps FP error from piling
    // up over long runs.
    cycle_position: KahanSum<f64>,

    delta: f64,
    delta_updated: bool,

    #[derivative(Default(value = "true"))]
    reset_pending: bool,

    c: Configurables,
}
impl OscillatorBuilder {
    /// The overridden Builder build() method.
    pub fn build(&self) -> Result<Oscillator, OscillatorBuilderError> {
        self.build_from_builder().map(|mut s| {
            s.reset();
            s
        })
    }
}
impl Configurable for Oscillator {
    delegate! {
        to self.e.c {
            fn sample_rate(&self) -> SampleRate;
        }
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.e.c.update_sample_rate(sample_rate);
        self.e.delta_updated = false;
    }

    fn reset(&mut self) {
        self.e.reset_pending = true;
        self.e.delta_updated = false;
    }
}
impl Oscillator {
    /// Creates an oscillator running at the given rate.
    pub fn new_with(waveform: Waveform, frequency: FrequencyHz, sample_rate: SampleRate) -> Self {
        let mut r = Self {
            waveform,
            frequency,
            ..Default::default()
        };
        r.update_sample_rate(sample_rate);
        r.reset();
        r
    }

    /// Produces the next value in -1.0..=1.0.
    pub fn tick(&mut self) -> f64 {
        let cycle_position = self.calculate_cycle_position();
        let amplitude = self.amplitude_for_position(self.waveform, cycle_position);
        self.e.reset_pending = false;
        amplitude
    }

    /// Sets the frequency that the next [Oscillator::tick()] will use.
    pub fn set_frequency(&mut self, frequency: FrequencyHz) {
        if frequency != self.frequency {
            self.frequency = frequency;
            self.e.delta_updated = false;
        }
    }

    #[allow(missing_docs)]
    pub fn frequency(&self) -> FrequencyHz {
        self.frequency
    }

    #[allow(missing_docs)]
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    #[allow(missing_docs)]
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    fn update_delta(&mut self) {
        if !self.e.delta_updated {
            self.e.delta = self.frequency.0 / f64::from(self.e.c.sample_rate());

            // This resets the accumulated error.
            self.e.cycle_position = KahanSum::new_with_value(self.e.cycle_position.sum());

            self.e.delta_updated = true;
        }
    }

    fn calculate_cycle_position(&mut self) -> f64 {
        self.update_delta();

        if self.e.reset_pending {
            self.e.cycle_position = Default::default();
            return 0.0;
        }

        self.e.cycle_position += self.e.delta;
        let position = self.e.cycle_position.sum();
        // The 0.999999999999 (rather than 1.0) keeps square waves from
        // flipping one sample late because of FP precision.
        if position > 0.999999999999 {
            self.e.cycle_position = KahanSum::new_with_value(position - position.floor());
        } else if position < 0.0 {
            // Negative frequencies run the cycle backward.
            self.e.cycle_position = KahanSum::new_with_value(position - position.floor());
        }
        self.e.cycle_position.sum()
    }

    // https://en.wikipedia.org/wiki/Sine_wave
    // https://en.wikipedia.org/wiki/Square_wave
    // https://en.wikipedia.org/wiki/Triangle_wave
    // https://en.wikipedia.org/wiki/Sawtooth_wave
    // https://www.musicdsp.org/en/latest/Synthesis/216-fast-whitenoise-generator.html
    //
    // The phase-shift constants make every waveform start at amplitude zero,
    // which avoids a transient when the oscillator starts.
    fn amplitude_for_position(&mut self, waveform: Waveform, cycle_position: f64) -> f64 {
        match waveform {
            Waveform::None => 0.0,
            Waveform::Sine => (cycle_position * 2.0 * PI).sin(),
            Waveform::Square => -(cycle_position - 0.5).signum(),
            Waveform::PulseWidth(duty_cycle) => -(cycle_position - duty_cycle.0).signum(),
            Waveform::Triangle => {
                4.0 * (cycle_position - (0.5 + cycle_position).floor()).abs() - 1.0
            }
            Waveform::Sawtooth => 2.0 * (cycle_position - (0.5 + cycle_position).floor()),
            Waveform::Noise => {
                self.e.noise_x1 ^= self.e.noise_x2;
                let tmp =
                    2.0 * (self.e.noise_x2 as f64 - (u32::MAX as f64 / 2.0)) / u32::MAX as f64;
                (self.e.noise_x2, _) = self.e.noise_x2.overflowing_add(self.e.noise_x1);
                tmp
            }
        }
    }
}
