// Copyright (c) 2024 Mike Tsao

//! Things that make noise: one-shot samples, streamed music, and synth
//! voices. Each owns an [EffectChain] that its generator feeds.

pub use envelope::{Envelope, EnvelopeSettings, EnvelopeUpdate};
pub use music::Music;
pub use sound_effect::SoundEffect;
pub use synth::{MonoSynth, SynthOptions};

mod envelope;
mod music;
mod sound_effect;
mod synth;

use crate::{
    error::GraphError,
    graph::{ProcessingContext, Target},
    routing::EffectChain,
};

/// Behavior shared by every kind of sound.
pub trait Sound: core::fmt::Debug {
    /// The chain the sound's generator feeds.
    fn effects(&self) -> &EffectChain;

    #[allow(missing_docs)]
    fn effects_mut(&mut self) -> &mut EffectChain;

    /// Routes the sound's output, usually to a bus input.
    fn connect(
        &mut self,
        ctx: &mut ProcessingContext,
        target: Target,
    ) -> Result<(), GraphError> {
        self.effects_mut().set_target(ctx, target)
    }

    /// Whether the sound has what it needs to play.
    fn is_loaded(&self, ctx: &ProcessingContext) -> bool;

    /// Lets go of the sound's source material.
    fn unload(&mut self, ctx: &mut ProcessingContext);

    /// Removes the sound from the graph: the generator is disconnected first,
    /// then the effect chain goes, then everything else.
    fn dispose(self, ctx: &mut ProcessingContext)
    where
        Self: Sized;
}
