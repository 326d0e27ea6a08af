// Copyright (c) 2024 Mike Tsao

//! Effects transform audio through the
//! [TransformsAudio](crate::traits::TransformsAudio) trait. Examples are
//! [ReverbCore] and [BiQuadFilterCore].

use crate::prelude::*;
use strum_macros::{Display, EnumDiscriminants, EnumIter, IntoStaticStr};

pub use {
    convolver::ConvolverCore,
    delay::{DelayCore, DelayCoreBuilder},
    filter::{BiQuadFilterCore, BiQuadFilterCoreBuilder, FilterType},
    gain::{GainCore, GainCoreBuilder},
    panner::{equal_power_pan, StereoPannerCore, StereoPannerCoreBuilder},
    reverb::{ReverbCore, ReverbCoreBuilder},
};

mod convolver;
mod delay;
mod filter;
mod gain;
mod panner;
mod reverb;

/// Any processing unit that can occupy an effect slot. [EffectKind] names
/// the variant without its contents, which is how chains look effects up.
#[derive(Clone, Debug, EnumDiscriminants)]
#[strum_discriminants(name(EffectKind), derive(Display, EnumIter, IntoStaticStr, Hash))]
#[allow(missing_docs)]
pub enum Effect {
    Filter(BiQuadFilterCore),
    Convolver(ConvolverCore),
    Reverb(ReverbCore),
    Delay(DelayCore),
    Gain(GainCore),
    Panner(StereoPannerCore),
}
impl Effect {
    /// Which kind of effect this is.
    pub fn kind(&self) -> EffectKind {
        EffectKind::from(self)
    }

    fn as_transformer_mut(&mut self) -> &mut dyn TransformsAudio {
        match self {
            Effect::Filter(e) => e,
            Effect::Convolver(e) => e,
            Effect::Reverb(e) => e,
            Effect::Delay(e) => e,
            Effect::Gain(e) => e,
            Effect::Panner(e) => e,
        }
    }

    /// Tells effects that depend on the sample rate what it is.
    pub fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        match self {
            Effect::Filter(e) => e.update_sample_rate(sample_rate),
            Effect::Reverb(e) => e.update_sample_rate(sample_rate),
            Effect::Delay(e) => e.update_sample_rate(sample_rate),
            Effect::Convolver(_) | Effect::Gain(_) | Effect::Panner(_) => {}
        }
    }
}
impl TransformsAudio for Effect {
    fn transform_frame(&mut self, frame: StereoSample) -> StereoSample {
        self.as_transformer_mut().transform_frame(frame)
    }
}

macro_rules! impl_effect_from {
    ($($variant:ident($core:ty)),* $(,)?) => {
        $(
            impl From<$core> for Effect {
                fn from(value: $core) -> Self {
                    Effect::$variant(value)
                }
            }
        )*
    };
}
impl_effect_from!(
    Filter(BiQuadFilterCore),
    Convolver(ConvolverCore),
    Reverb(ReverbCore),
    Delay(DelayCore),
    Gain(GainCore),
    Panner(StereoPannerCore),
);
