// Copyright (c) 2024 Mike Tsao

use super::{Envelope, EnvelopeSettings, Sound};
use crate::{
    cores::Waveform,
    error::GraphError,
    graph::{OscillatorOptions, ParamKind, ProcessingContext, Target},
    prelude::*,
    routing::EffectChain,
};

/// How a [MonoSynth]'s oscillator starts out.
pub type SynthOptions = OscillatorOptions;

/// A single always-running oscillator whose loudness is shaped by an
/// [Envelope]. Playing the synth retriggers the envelope; the oscillator is
/// never recreated.
#[derive(Debug)]
pub struct MonoSynth {
    oscillator: NodeId,
    frequency: ParamId,
    effects: EffectChain,
    envelope: Envelope,
}
impl MonoSynth {
    /// Creates the oscillator and starts it right away. It stays silent
    /// because the chain's gain starts at zero and only the envelope raises
    /// it.
    pub fn new_with(
        ctx: &mut ProcessingContext,
        target: Option<Target>,
        options: &SynthOptions,
        envelope: EnvelopeSettings,
    ) -> Result<Self, GraphError> {
        let effects = EffectChain::new_with(ctx, target)?;
        let oscillator = ctx.create_oscillator(options);
        let frequency = match Self::wire(ctx, &effects, oscillator) {
            Ok(frequency) => frequency,
            Err(e) => {
                ctx.dispose_node(oscillator);
                effects.dispose(ctx);
                return Err(e);
            }
        };

        let mut envelope = Envelope::new_with(envelope);
        envelope.add_target(effects.gain());
        Ok(Self {
            oscillator,
            frequency,
            effects,
            envelope,
        })
    }

    // Silences the chain, then connects and starts the oscillator. Returns
    // its frequency param.
    fn wire(
        ctx: &mut ProcessingContext,
        effects: &EffectChain,
        oscillator: NodeId,
    ) -> Result<ParamId, GraphError> {
        ctx.set_param_value(effects.gain(), 0.0)?;
        let frequency = ctx
            .param_of(oscillator, ParamKind::Frequency)
            .ok_or(GraphError::UnknownNode(oscillator))?;
        ctx.connect(oscillator, effects.input())?;
        let now = ctx.current_time();
        ctx.start_oscillator(oscillator, now)?;
        Ok(frequency)
    }

    /// # Panics
    ///
    /// Always. A synth generates its sound rather than loading it.
    pub fn load(&mut self, _url: &str) {
        panic!("MonoSynth can't load assets");
    }

    /// Sounds a note `when` from now.
    pub fn play(&mut self, ctx: &mut ProcessingContext, when: Seconds) {
        self.envelope.activate(ctx, when);
    }

    #[allow(missing_docs)]
    pub fn oscillator(&self) -> NodeId {
        self.oscillator
    }

    #[allow(missing_docs)]
    pub fn waveform(&self, ctx: &ProcessingContext) -> Option<Waveform> {
        ctx.oscillator(self.oscillator).map(|o| o.waveform())
    }

    #[allow(missing_docs)]
    pub fn set_waveform(&mut self, ctx: &mut ProcessingContext, waveform: Waveform) {
        if let Some(oscillator) = ctx.oscillator_mut(self.oscillator) {
            oscillator.set_waveform(waveform);
        }
    }

    /// The oscillator's frequency, in Hz. Automate it for glides, or connect a
    /// modulator to it for vibrato.
    pub fn frequency(&self) -> ParamId {
        self.frequency
    }

    #[allow(missing_docs)]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    #[allow(missing_docs)]
    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }
}
impl Sound for MonoSynth {
    fn effects(&self) -> &EffectChain {
        &self.effects
    }

    fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    fn is_loaded(&self, _ctx: &ProcessingContext) -> bool {
        true
    }

    /// # Panics
    ///
    /// Always. A synth has nothing to unload.
    fn unload(&mut self, _ctx: &mut ProcessingContext) {
        panic!("MonoSynth has no source material to unload");
    }

    fn dispose(mut self, ctx: &mut ProcessingContext) {
        ctx.disconnect(self.oscillator);
        let gain = self.effects.gain();
        self.effects.dispose(ctx);
        self.envelope.remove_target(gain);
        ctx.dispose_node(self.oscillator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ContextSettings;
    use float_cmp::approx_eq;

    fn running_context() -> ProcessingContext {
        ProcessingContext::new_with(ContextSettings {
            start_suspended: false,
            ..Default::default()
        })
    }

    #[test]
    fn silent_until_played() {
        let mut ctx = running_context();
        let destination = ctx.destination();
        let mut synth = MonoSynth::new_with(
            &mut ctx,
            Some(destination.into()),
            &SynthOptions::default(),
            EnvelopeSettings::default(),
        )
        .unwrap();
        let mut frames = [StereoSample::SILENCE; 64];
        ctx.render(&mut frames);
        assert!(frames.iter().all(|f| f.is_silent()));

        synth.play(&mut ctx, Seconds::zero());
        let mut frames = [StereoSample::SILENCE; 4410];
        ctx.render(&mut frames);
        assert!(frames.iter().any(|f| !f.is_silent()));
    }

    #[test]
    fn play_reuses_the_oscillator() {
        let mut ctx = running_context();
        let mut synth = MonoSynth::new_with(
            &mut ctx,
            None,
            &SynthOptions::default(),
            EnvelopeSettings::default(),
        )
        .unwrap();
        let count = ctx.node_count();
        synth.play(&mut ctx, Seconds::zero());
        synth.play(&mut ctx, Seconds(0.1));
        assert_eq!(ctx.node_count(), count);
        assert_eq!(synth.envelope().targets(), &[synth.effects().gain()]);
    }

    #[test]
    fn frequency_and_waveform() {
        let mut ctx = running_context();
        let mut synth = MonoSynth::new_with(
            &mut ctx,
            None,
            &SynthOptions {
                waveform: Waveform::Square,
                frequency: FrequencyHz(220.0),
                ..Default::default()
            },
            EnvelopeSettings::default(),
        )
        .unwrap();
        assert!(approx_eq!(
            f64,
            ctx.param(synth.frequency()).unwrap().value(),
            220.0
        ));
        assert_eq!(synth.waveform(&ctx), Some(Waveform::Square));
        synth.set_waveform(&mut ctx, Waveform::Triangle);
        assert_eq!(synth.waveform(&ctx), Some(Waveform::Triangle));
    }

    #[test]
    #[should_panic]
    fn load_is_a_usage_error() {
        let mut ctx = running_context();
        let mut synth = MonoSynth::new_with(
            &mut ctx,
            None,
            &SynthOptions::default(),
            EnvelopeSettings::default(),
        )
        .unwrap();
        synth.load("tone.wav");
    }

    #[test]
    #[should_panic]
    fn unload_is_a_usage_error() {
        let mut ctx = running_context();
        let mut synth = MonoSynth::new_with(
            &mut ctx,
            None,
            &SynthOptions::default(),
            EnvelopeSettings::default(),
        )
        .unwrap();
        synth.unload(&mut ctx);
    }

    #[test]
    fn dispose_removes_everything() {
        let mut ctx = running_context();
        let before = ctx.node_count();
        let synth = MonoSynth::new_with(
            &mut ctx,
            None,
            &SynthOptions::default(),
            EnvelopeSettings::default(),
        )
        .unwrap();
        synth.dispose(&mut ctx);
        assert_eq!(ctx.node_count(), before);
    }

    #[test]
    fn failed_create_leaves_no_nodes_behind() {
        let mut ctx = running_context();
        let stale = ctx.create_gain();
        ctx.dispose_node(stale);
        let before = ctx.node_count();
        assert!(MonoSynth::new_with(
            &mut ctx,
            Some(stale.into()),
            &SynthOptions::default(),
            EnvelopeSettings::default(),
        )
        .is_err());
        assert_eq!(ctx.node_count(), before);
    }
}
