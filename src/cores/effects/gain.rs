// Copyright (c) 2024 Mike Tsao

use crate::prelude::*;
use derive_builder::Builder;

/// An effect that multiplies the signal by a constant factor.
#[derive(Clone, Debug, Builder, Default)]
#[builder(default)]
pub struct GainCore {
    /// The multiplier that is applied to each sample.
    ceiling: Normal,
}
impl TransformsAudio for GainCore {
    fn transform_channel(&mut self, _channel: usize, input_sample: Sample) -> Sample {
        input_sample * self.ceiling.0
    }
}
impl GainCore {
    #[allow(missing_docs)]
    pub fn new_with(ceiling: Normal) -> Self {
        Self { ceiling }
    }

    #[allow(missing_docs)]
    pub fn ceiling(&self) -> Normal {
        self.ceiling
    }

    #[allow(missing_docs)]
    pub fn set_ceiling(&mut self, ceiling: Normal) {
        self.ceiling = ceiling;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_mainline() {
        let mut gain = GainCoreBuilder::default()
            .ceiling(0.5.into())
            .build()
            .unwrap();
        let mut buffer = [StereoSample::MAX; 1];
        gain.transform(&mut buffer);
        assert_eq!(buffer[0], StereoSample::from(0.5));
    }

    #[test]
    fn default_gain_is_unity() {
        let mut gain = GainCore::default();
        assert_eq!(
            gain.transform_frame(StereoSample::from(0.25)),
            StereoSample::from(0.25)
        );
    }
}
