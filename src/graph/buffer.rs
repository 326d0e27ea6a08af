// Copyright (c) 2024 Mike Tsao

use crate::types::{Sample, SampleRate, SampleType, Seconds, StereoSample};

/// Decoded PCM audio held in memory. Buffers are immutable once built and
/// are shared through `Arc` by every source that plays them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    sample_rate: SampleRate,
    channels: Vec<Vec<SampleType>>,
}
impl AudioBuffer {
    /// Builds a buffer from planar channel data. Channels shorter than the
    /// longest one are padded with silence.
    pub fn new_with(sample_rate: SampleRate, mut channels: Vec<Vec<SampleType>>) -> Self {
        let length = channels.iter().map(|c| c.len()).max().unwrap_or_default();
        channels
            .iter_mut()
            .for_each(|c| c.resize(length, Sample::SILENCE_VALUE));
        Self {
            sample_rate,
            channels,
        }
    }

    /// Builds a buffer from interleaved samples, as most decoders produce them.
    pub fn from_interleaved<S: Copy + Into<SampleType>>(
        sample_rate: SampleRate,
        channel_count: usize,
        interleaved: &[S],
    ) -> Self {
        let channel_count = channel_count.max(1);
        let mut channels = vec![Vec::with_capacity(interleaved.len() / channel_count); channel_count];
        for frame in interleaved.chunks(channel_count) {
            for (channel, sample) in frame.iter().enumerate() {
                channels[channel].push((*sample).into());
            }
        }
        Self::new_with(sample_rate, channels)
    }

    #[allow(missing_docs)]
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    #[allow(missing_docs)]
    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    /// The number of frames.
    pub fn length(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or_default()
    }

    #[allow(missing_docs)]
    pub fn duration(&self) -> Seconds {
        Seconds(self.length() as f64 / f64::from(self.sample_rate))
    }

    #[allow(missing_docs)]
    pub fn channel(&self, index: usize) -> Option<&[SampleType]> {
        self.channels.get(index).map(|c| c.as_slice())
    }

    /// The frame at `index`. Mono buffers play in both channels; channels
    /// past the second are ignored.
    pub fn frame(&self, index: usize) -> StereoSample {
        match self.channels.len() {
            0 => StereoSample::SILENCE,
            1 => StereoSample::from(Sample(self.channels[0].get(index).copied().unwrap_or_default())),
            _ => StereoSample(
                Sample(self.channels[0].get(index).copied().unwrap_or_default()),
                Sample(self.channels[1].get(index).copied().unwrap_or_default()),
            ),
        }
    }

    /// The frame at a fractional position, linearly interpolated.
    pub fn frame_at(&self, position: f64) -> StereoSample {
        if position < 0.0 {
            return StereoSample::SILENCE;
        }
        let index = position.floor() as usize;
        let fraction = position - position.floor();
        let a = self.frame(index);
        if fraction == 0.0 {
            return a;
        }
        let b = self.frame(index + 1);
        StereoSample(
            a.0 + (b.0 - a.0) * fraction,
            a.1 + (b.1 - a.1) * fraction,
        )
    }
}
