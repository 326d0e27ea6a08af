// Copyright (c) 2024 Mike Tsao

use crate::prelude::*;
use core::f64::consts::FRAC_PI_2;
use derive_builder::Builder;

/// Places a stereo signal between the left and right speakers with an
/// equal-power law, so the perceived loudness stays constant as the pan
/// position moves.
///
/// At -1.0 everything ends up on the left, at 1.0 everything ends up on the
/// right, and at 0.0 the signal passes through unchanged.
pub fn equal_power_pan(frame: StereoSample, pan: f64) -> StereoSample {
    let pan = pan.clamp(-1.0, 1.0);
    let StereoSample(left, right) = frame;
    if pan <= 0.0 {
        let x = (pan + 1.0) * FRAC_PI_2;
        let (gain_l, gain_r) = (x.cos(), x.sin());
        StereoSample(left + right * gain_l, right * gain_r)
    } else {
        let x = pan * FRAC_PI_2;
        let (gain_l, gain_r) = (x.cos(), x.sin());
        StereoSample(left * gain_l, right + left * gain_r)
    }
}

/// A fixed-position stereo panner.
#[derive(Clone, Debug, Builder, Default)]
#[builder(default)]
pub struct StereoPannerCore {
    /// -1.0 is hard left, 1.0 is hard right.
    pan: BipolarNormal,
}
impl TransformsAudio for StereoPannerCore {
    fn transform_frame(&mut self, frame: StereoSample) -> StereoSample {
        equal_power_pan(frame, self.pan.0)
    }
}
impl StereoPannerCore {
    #[allow(missing_docs)]
    pub fn new_with(pan: BipolarNormal) -> Self {
        Self { pan }
    }

    #[allow(missing_docs)]
    pub fn pan(&self) -> BipolarNormal {
        self.pan
    }

    #[allow(missing_docs)]
    pub fn set_pan(&mut self, pan: BipolarNormal) {
        self.pan = pan;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn assert_frame_eq(actual: StereoSample, expected: StereoSample) {
        assert!(
            approx_eq!(f64, actual.0 .0, expected.0 .0, epsilon = 1e-12)
                && approx_eq!(f64, actual.1 .0, expected.1 .0, epsilon = 1e-12),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn center_is_passthrough() {
        let frame = StereoSample(Sample(0.3), Sample(-0.7));
        assert_frame_eq(equal_power_pan(frame, 0.0), frame);
    }

    #[test]
    fn hard_left_and_right() {
        let frame = StereoSample(Sample(0.5), Sample(0.25));
        assert_frame_eq(
            equal_power_pan(frame, -1.0),
            StereoSample(Sample(0.75), Sample(0.0)),
        );
        assert_frame_eq(
            equal_power_pan(frame, 1.0),
            StereoSample(Sample(0.0), Sample(0.75)),
        );
    }

    #[test]
    fn mono_signal_keeps_constant_power() {
        let mono = StereoSample(Sample(1.0), Sample(0.0));
        for pan in [0.1, 0.25, 0.5, 0.9] {
            let out = equal_power_pan(mono, pan);
            let power = out.0 .0 * out.0 .0 + out.1 .0 * out.1 .0;
            assert!(approx_eq!(f64, power, 1.0, epsilon = 1e-12));
        }
    }

    #[test]
    fn core_uses_its_pan_position() {
        let mut panner = StereoPannerCoreBuilder::default()
            .pan(BipolarNormal::minimum())
            .build()
            .unwrap();
        assert_frame_eq(
            panner.transform_frame(StereoSample::from(0.5)),
            StereoSample(Sample(1.0), Sample(0.0)),
        );
    }
}
