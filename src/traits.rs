// Copyright (c) 2024 Mike Tsao

//! The traits that define many characteristics and relationships among parts of
//! the system.

use crate::types::{SampleRate, Sample, StereoSample};

/// Quick import of all important traits.
pub mod prelude {
    pub use super::{Configurable, Configurables, TransformsAudio};
}

/// Something that [Configurable] needs to know about the environment it's
/// running in. Right now that's only the sample rate.
pub trait Configurable {
    /// Returns this item's sample rate.
    fn sample_rate(&self) -> SampleRate;

    /// The sample rate changed.
    #[allow(unused_variables)]
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {}

    /// Sent to indicate that it's time to reset internal state. Oscillators
    /// should reset phase, delay lines should empty, etc.
    fn reset(&mut self) {}
}

/// A convenience struct for the fields implied by [Configurable]. Not
/// serde-compliant, because these fields are runtime state.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Configurables {
    sample_rate: SampleRate,
}
impl Configurable for Configurables {
    fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate
    }
}

/// A [TransformsAudio] takes input audio, does something to it, and then
/// outputs it. It's what effects do.
pub trait TransformsAudio: core::fmt::Debug {
    /// Transforms a buffer of audio.
    fn transform(&mut self, samples: &mut [StereoSample]) {
        for sample in samples {
            *sample = self.transform_frame(*sample);
        }
    }

    /// Transforms a single stereo frame. Effects that mix between channels
    /// (panners, for example) override this rather than
    /// [TransformsAudio::transform_channel()].
    fn transform_frame(&mut self, frame: StereoSample) -> StereoSample {
        StereoSample(
            self.transform_channel(0, frame.0),
            self.transform_channel(1, frame.1),
        )
    }

    /// channel: 0 is left, 1 is right. Use the value as an index into arrays.
    #[allow(unused_variables)]
    fn transform_channel(&mut self, channel: usize, input_sample: Sample) -> Sample {
        // Default implementation is passthrough
        input_sample
    }
}
