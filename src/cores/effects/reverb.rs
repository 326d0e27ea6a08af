// Copyright (c) 2024 Mike Tsao

use super::delay::{AllPassDelayLine, Delays, RecirculatingDelayLine};
use crate::{prelude::*, traits::Configurables};
use delegate::delegate;
use derivative::Derivative;
use derive_builder::Builder;

/// Schroeder reverb. Uses four parallel recirculating delay lines feeding into
/// a series of two all-pass delay lines.
#[derive(Clone, Debug, Derivative, Builder)]
#[derivative(Default)]
#[builder(default, build_fn(private, name = "build_from_builder"))]
pub struct ReverbCore {
    /// How much the effect should attenuate the input.
    #[derivative(Default(value = "0.8.into()"))]
    attenuation: Normal,

    /// How long the tail takes to die away.
    #[derivative(Default(value = "1.0.into()"))]
    seconds: Seconds,

    #[builder(setter(skip))]
    channels: [ReverbChannel; 2],

    #[builder(setter(skip))]
    c: Configurables,
}
impl ReverbCoreBuilder {
    /// The overridden Builder build() method.
    pub fn build(&self) -> Result<ReverbCore, ReverbCoreBuilderError> {
        self.build_from_builder().map(|mut s| {
            s.rebuild_channels();
            s
        })
    }
}
impl Configurable for ReverbCore {
    delegate! {
        to self.c {
            fn sample_rate(&self) -> SampleRate;
        }
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.c.update_sample_rate(sample_rate);
        self.rebuild_channels();
    }

    fn reset(&mut self) {
        self.rebuild_channels();
    }
}
impl TransformsAudio for ReverbCore {
    fn transform_channel(&mut self, channel: usize, input_sample: Sample) -> Sample {
        self.channels[channel.min(1)].transform(input_sample)
    }
}
impl ReverbCore {
    fn rebuild_channels(&mut self) {
        let sample_rate = self.c.sample_rate();
        self.channels = [
            ReverbChannel::new_with(sample_rate, self.attenuation, self.seconds),
            ReverbChannel::new_with(sample_rate, self.attenuation, self.seconds),
        ];
    }

    #[allow(missing_docs)]
    pub fn attenuation(&self) -> Normal {
        self.attenuation
    }

    #[allow(missing_docs)]
    pub fn set_attenuation(&mut self, attenuation: Normal) {
        self.attenuation = attenuation;
        self.channels
            .iter_mut()
            .for_each(|c| c.attenuation = attenuation);
    }

    #[allow(missing_docs)]
    pub fn seconds(&self) -> Seconds {
        self.seconds
    }

    /// Changing the decay time clears the tail.
    pub fn set_seconds(&mut self, seconds: Seconds) {
        self.seconds = seconds;
        self.rebuild_channels();
    }
}

#[derive(Clone, Debug, Default)]
struct ReverbChannel {
    attenuation: Normal,

    recirc_delay_lines: Vec<RecirculatingDelayLine>,
    allpass_delay_lines: Vec<AllPassDelayLine>,
}
impl ReverbChannel {
    // Thanks to https://basicsynth.com/ (page 133 of paperback) for
    // constants.
    const RECIRC_DELAYS: [f64; 4] = [0.0297, 0.0371, 0.0411, 0.0437];
    const ALLPASS_DELAYS: [(f64, f64); 2] = [(0.09683, 0.0050), (0.03292, 0.0017)];

    fn new_with(sample_rate: SampleRate, attenuation: Normal, seconds: Seconds) -> Self {
        Self {
            attenuation,
            recirc_delay_lines: Self::RECIRC_DELAYS
                .iter()
                .map(|delay| {
                    RecirculatingDelayLine::new_with(
                        sample_rate,
                        Seconds(*delay),
                        seconds,
                        Normal::from(0.001),
                        Normal::from(1.0),
                    )
                })
                .collect(),
            allpass_delay_lines: Self::ALLPASS_DELAYS
                .iter()
                .map(|(delay, decay)| {
                    AllPassDelayLine::new_with(
                        sample_rate,
                        Seconds(*delay),
                        Seconds(*decay),
                        Normal::from(0.001),
                        Normal::from(1.0),
                    )
                })
                .collect(),
        }
    }

    fn transform(&mut self, input_sample: Sample) -> Sample {
        let input_attenuated = input_sample * self.attenuation.0;
        let recirc_output = self
            .recirc_delay_lines
            .iter_mut()
            .fold(Sample::SILENCE, |acc, line| {
                acc + line.pop_output(input_attenuated)
            });
        self.allpass_delay_lines
            .iter_mut()
            .fold(recirc_output, |signal, line| line.pop_output(signal))
    }
}
