// Copyright (c) 2024 Mike Tsao

use crate::{prelude::*, traits::Configurables};
use delegate::delegate;
use derivative::Derivative;
use derive_builder::Builder;

pub(crate) trait Delays {
    fn peek_output(&self) -> Sample;
    fn pop_output(&mut self, input: Sample) -> Sample;
}

/// A plain ring buffer of samples. What goes in comes out `delay` later.
#[derive(Clone, Debug, Default)]
pub(crate) struct DelayLine {
    delay: Seconds,
    buffer_pointer: usize,
    buffer: Vec<Sample>,
}
impl DelayLine {
    pub(crate) fn new_with(sample_rate: SampleRate, delay: Seconds) -> Self {
        let mut r = Self {
            delay,
            ..Default::default()
        };
        r.resize_buffer(sample_rate);
        r
    }

    pub(crate) fn resize_buffer(&mut self, sample_rate: SampleRate) {
        let buffer_size = sample_rate * self.delay;
        self.buffer = vec![Sample::SILENCE; buffer_size];
        self.buffer_pointer = 0;
    }

    pub(crate) fn delay(&self) -> Seconds {
        self.delay
    }
}
impl Delays for DelayLine {
    fn peek_output(&self) -> Sample {
        self.buffer
            .get(self.buffer_pointer)
            .copied()
            .unwrap_or_default()
    }

    fn pop_output(&mut self, input: Sample) -> Sample {
        if self.buffer.is_empty() {
            input
        } else {
            let out = self.peek_output();
            self.buffer[self.buffer_pointer] = input;
            self.buffer_pointer += 1;
            if self.buffer_pointer >= self.buffer.len() {
                self.buffer_pointer = 0;
            }
            out
        }
    }
}

/// A delay line whose output is fed back into its input, losing `gain`
/// each pass. The gain is derived from how long the tail should take to fall
/// to `final_amplitude`.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecirculatingDelayLine {
    line: DelayLine,
    gain: f64,
}
impl RecirculatingDelayLine {
    pub(crate) fn new_with(
        sample_rate: SampleRate,
        delay: Seconds,
        decay: Seconds,
        final_amplitude: Normal,
        peak_amplitude: Normal,
    ) -> Self {
        Self {
            line: DelayLine::new_with(sample_rate, delay),
            gain: Self::gain_for(delay, decay, final_amplitude, peak_amplitude),
        }
    }

    fn gain_for(
        delay: Seconds,
        decay: Seconds,
        final_amplitude: Normal,
        peak_amplitude: Normal,
    ) -> f64 {
        if decay.0 <= 0.0 {
            0.0
        } else {
            (peak_amplitude.0 * final_amplitude.0).powf(delay / decay)
        }
    }

    pub(crate) fn gain(&self) -> f64 {
        self.gain
    }

    pub(crate) fn resize_buffer(&mut self, sample_rate: SampleRate) {
        self.line.resize_buffer(sample_rate);
    }
}
impl Delays for RecirculatingDelayLine {
    fn peek_output(&self) -> Sample {
        self.line.peek_output() * self.gain
    }

    fn pop_output(&mut self, input: Sample) -> Sample {
        let output = self.peek_output();
        self.line.pop_output(input + output);
        output
    }
}

/// Schroeder's all-pass section: flat magnitude response, smeared phase.
#[derive(Clone, Debug, Default)]
pub(crate) struct AllPassDelayLine {
    inner: RecirculatingDelayLine,
}
impl AllPassDelayLine {
    pub(crate) fn new_with(
        sample_rate: SampleRate,
        delay: Seconds,
        decay: Seconds,
        final_amplitude: Normal,
        peak_amplitude: Normal,
    ) -> Self {
        Self {
            inner: RecirculatingDelayLine::new_with(
                sample_rate,
                delay,
                decay,
                final_amplitude,
                peak_amplitude,
            ),
        }
    }

    pub(crate) fn resize_buffer(&mut self, sample_rate: SampleRate) {
        self.inner.resize_buffer(sample_rate);
    }
}
impl Delays for AllPassDelayLine {
    fn peek_output(&self) -> Sample {
        self.inner.line.peek_output()
    }

    fn pop_output(&mut self, input: Sample) -> Sample {
        let g = self.inner.gain();
        let vm = self.inner.line.peek_output();
        let vn = input - (vm * g);
        self.inner.line.pop_output(vn);
        vm + vn * g
    }
}

/// An echo. Each channel has its own line; `feedback` sends some of the
/// output back around for repeats.
#[derive(Clone, Debug, Builder, Derivative)]
#[derivative(Default)]
#[builder(default, build_fn(private, name = "build_from_builder"))]
pub struct DelayCore {
    /// The number of seconds of delay.
    #[derivative(Default(value = "0.25.into()"))]
    seconds: Seconds,

    /// How much of the delayed signal is fed back into the line.
    #[derivative(Default(value = "Normal::minimum()"))]
    feedback: Normal,

    #[builder(setter(skip))]
    channels: [DelayLine; 2],

    #[builder(setter(skip))]
    c: Configurables,
}
impl DelayCoreBuilder {
    /// The overridden Builder build() method.
    pub fn build(&self) -> Result<DelayCore, DelayCoreBuilderError> {
        self.build_from_builder().map(|mut s| {
            s.rebuild_lines();
            s
        })
    }
}
impl Configurable for DelayCore {
    delegate! {
        to self.c {
            fn sample_rate(&self) -> SampleRate;
        }
    }

    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.c.update_sample_rate(sample_rate);
        self.rebuild_lines();
    }

    fn reset(&mut self) {
        self.rebuild_lines();
    }
}
impl TransformsAudio for DelayCore {
    fn transform_channel(&mut self, channel: usize, input_sample: Sample) -> Sample {
        let line = &mut self.channels[channel.min(1)];
        let delayed = line.peek_output();
        line.pop_output(input_sample + delayed * self.feedback.0);
        delayed
    }
}
impl DelayCore {
    fn rebuild_lines(&mut self) {
        let sample_rate = self.c.sample_rate();
        self.channels = [
            DelayLine::new_with(sample_rate, self.seconds),
            DelayLine::new_with(sample_rate, self.seconds),
        ];
    }

    #[allow(missing_docs)]
    pub fn seconds(&self) -> Seconds {
        self.channels[0].delay()
    }

    /// Changing the delay time empties the lines.
    pub fn set_seconds(&mut self, seconds: Seconds) {
        if seconds != self.seconds {
            self.seconds = seconds;
            self.rebuild_lines();
        }
    }

    #[allow(missing_docs)]
    pub fn feedback(&self) -> Normal {
        self.feedback
    }

    #[allow(missing_docs)]
    pub fn set_feedback(&mut self, feedback: Normal) {
        self.feedback = feedback;
    }
}
