// Copyright (c) 2024 Mike Tsao

use crate::{graph::AudioBuffer, prelude::*};
use std::sync::Arc;

/// Convolution with an impulse response: the recorded sound of a room, a
/// spring tank, a cabinet. Direct-form, so the cost per frame grows with the
/// length of the response. Short responses are fine; a several-second hall
/// is expensive.
///
/// Without a response the convolver is silent. A mono response is applied
/// to both channels.
#[derive(Clone, Debug, Default)]
pub struct ConvolverCore {
    impulse_response: Option<Arc<AudioBuffer>>,
    normalize: bool,

    kernels: [Vec<f64>; 2],
    history: [Vec<f64>; 2],
    cursor: usize,
}
impl TransformsAudio for ConvolverCore {
    fn transform_frame(&mut self, frame: StereoSample) -> StereoSample {
        let len = self.kernels[0].len();
        if len == 0 {
            return StereoSample::SILENCE;
        }
        self.history[0][self.cursor] = frame.0 .0;
        self.history[1][self.cursor] = frame.1 .0;
        let mut out = [0.0; 2];
        for (channel, out) in out.iter_mut().enumerate() {
            let kernel = &self.kernels[channel];
            let history = &self.history[channel];
            // y[n] = sum over k of h[k] * x[n - k]
            let (newer, older) = history.split_at(self.cursor + 1);
            *out = newer
                .iter()
                .rev()
                .chain(older.iter().rev())
                .zip(kernel.iter())
                .map(|(x, h)| x * h)
                .sum();
        }
        self.cursor = (self.cursor + 1) % len;
        StereoSample(Sample(out[0]), Sample(out[1]))
    }
}
impl ConvolverCore {
    /// A convolver with the given response. `normalize` scales the response
    /// to unit energy so that quiet and loud recordings come out at similar
    /// levels.
    pub fn new_with(impulse_response: Option<Arc<AudioBuffer>>, normalize: bool) -> Self {
        let mut r = Self {
            normalize,
            ..Default::default()
        };
        r.set_impulse_response(impulse_response);
        r
    }

    #[allow(missing_docs)]
    pub fn impulse_response(&self) -> Option<&Arc<AudioBuffer>> {
        self.impulse_response.as_ref()
    }

    /// Replaces the response. The convolver's memory of past input is
    /// cleared.
    pub fn set_impulse_response(&mut self, impulse_response: Option<Arc<AudioBuffer>>) {
        self.impulse_response = impulse_response;
        self.rebuild_kernels();
    }

    #[allow(missing_docs)]
    pub fn normalize(&self) -> bool {
        self.normalize
    }

    #[allow(missing_docs)]
    pub fn set_normalize(&mut self, normalize: bool) {
        if normalize != self.normalize {
            self.normalize = normalize;
            self.rebuild_kernels();
        }
    }

    fn rebuild_kernels(&mut self) {
        let Some(ir) = self.impulse_response.as_ref() else {
            self.kernels = Default::default();
            self.history = Default::default();
            self.cursor = 0;
            return;
        };
        let left = ir.channel(0).map(|c| c.to_vec()).unwrap_or_default();
        let right = ir.channel(1).map(|c| c.to_vec()).unwrap_or_else(|| left.clone());
        let mut kernels = [left, right];
        if self.normalize {
            let energy: f64 = kernels.iter().flatten().map(|h| h * h).sum::<f64>() / 2.0;
            if energy > 0.0 {
                let scale = 1.0 / energy.sqrt();
                kernels.iter_mut().flatten().for_each(|h| *h *= scale);
            }
        }
        let len = kernels[0].len();
        self.history = [vec![0.0; len], vec![0.0; len]];
        self.kernels = kernels;
        self.cursor = 0;
    }
}
