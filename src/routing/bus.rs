// Copyright (c) 2024 Mike Tsao

use super::{gain_param, EffectChain, SendManager};
use crate::{
    error::GraphError,
    graph::{ParamKind, ProcessingContext, Target},
    prelude::*,
};

/// A mixing channel. Its wiring never changes shape:
///
/// ```text
/// effects.output -> panner -> post_gain -+-> sends.input
///                                        +-> target
/// ```
///
/// Only the last leg, to the external target, can be re-pointed.
#[derive(Debug)]
pub struct Bus {
    effects: EffectChain,
    panner: NodeId,
    pan: ParamId,
    post_gain: NodeId,
    volume: ParamId,
    sends: SendManager,
    target: Option<Target>,
}
impl Bus {
    #[allow(missing_docs)]
    pub fn new_with(
        ctx: &mut ProcessingContext,
        target: Option<Target>,
    ) -> Result<Self, GraphError> {
        let panner = ctx.create_stereo_panner();
        let post_gain = ctx.create_gain();
        let sends = SendManager::new_with(ctx);
        let mut effects = match EffectChain::new_with(ctx, None) {
            Ok(effects) => effects,
            Err(e) => {
                ctx.dispose_node(panner);
                ctx.dispose_node(post_gain);
                sends.dispose(ctx);
                return Err(e);
            }
        };
        match Self::wire(ctx, &mut effects, panner, post_gain, sends.input(), target) {
            Ok((pan, volume)) => Ok(Self {
                effects,
                panner,
                pan,
                post_gain,
                volume,
                sends,
                target,
            }),
            Err(e) => {
                ctx.dispose_node(panner);
                ctx.dispose_node(post_gain);
                effects.dispose(ctx);
                sends.dispose(ctx);
                Err(e)
            }
        }
    }

    // Returns the pan and volume params.
    fn wire(
        ctx: &mut ProcessingContext,
        effects: &mut EffectChain,
        panner: NodeId,
        post_gain: NodeId,
        sends_input: NodeId,
        target: Option<Target>,
    ) -> Result<(ParamId, ParamId), GraphError> {
        let pan = ctx
            .param_of(panner, ParamKind::Pan)
            .ok_or(GraphError::UnknownNode(panner))?;
        let volume = gain_param(ctx, post_gain)?;
        effects.set_target(ctx, panner)?;
        ctx.connect(panner, post_gain)?;
        ctx.connect(post_gain, sends_input)?;
        if let Some(target) = target {
            ctx.connect(post_gain, target)?;
        }
        Ok((pan, volume))
    }

    /// Where other things connect to feed this bus.
    pub fn input(&self) -> NodeId {
        self.effects.input()
    }

    #[allow(missing_docs)]
    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    #[allow(missing_docs)]
    pub fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    #[allow(missing_docs)]
    pub fn sends(&self) -> &SendManager {
        &self.sends
    }

    #[allow(missing_docs)]
    pub fn sends_mut(&mut self) -> &mut SendManager {
        &mut self.sends
    }

    #[allow(missing_docs)]
    pub fn panner(&self) -> NodeId {
        self.panner
    }

    #[allow(missing_docs)]
    pub fn pan_param(&self) -> ParamId {
        self.pan
    }

    #[allow(missing_docs)]
    pub fn post_gain(&self) -> NodeId {
        self.post_gain
    }

    /// The linear volume control. Volume sliders drive this.
    pub fn post_gain_param(&self) -> ParamId {
        self.volume
    }

    #[allow(missing_docs)]
    pub fn set_volume(&self, ctx: &mut ProcessingContext, volume: Normal) -> Result<(), GraphError> {
        ctx.set_param_value(self.volume, volume.0)
    }

    #[allow(missing_docs)]
    pub fn set_pan(&self, ctx: &mut ProcessingContext, pan: BipolarNormal) -> Result<(), GraphError> {
        ctx.set_param_value(self.pan, pan.0)
    }

    /// The bus's one external destination.
    pub fn target(&self) -> Option<Target> {
        self.target
    }

    /// Re-points the external leg. The send tap stays where it is, and the
    /// old target is dropped before the new one is connected.
    pub fn connect(
        &mut self,
        ctx: &mut ProcessingContext,
        target: impl Into<Target>,
    ) -> Result<(), GraphError> {
        let target = target.into();
        self.disconnect(ctx);
        ctx.connect(self.post_gain, target)?;
        self.target = Some(target);
        Ok(())
    }

    /// Drops the external leg.
    pub fn disconnect(&mut self, ctx: &mut ProcessingContext) {
        if let Some(old) = self.target.take() {
            ctx.disconnect_from(self.post_gain, old);
        }
    }

    /// Tears the bus down: panner, then post-gain, then the effects, then the
    /// sends.
    pub fn dispose(self, ctx: &mut ProcessingContext) {
        ctx.dispose_node(self.panner);
        ctx.dispose_node(self.post_gain);
        self.effects.dispose(ctx);
        self.sends.dispose(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cores::GainCore;

    #[test]
    fn wiring_matches_the_fixed_topology() {
        let mut ctx = ProcessingContext::default();
        let destination = ctx.destination();
        let bus = Bus::new_with(&mut ctx, Some(destination.into())).unwrap();
        assert_eq!(
            ctx.outputs(bus.effects().output()).unwrap(),
            &[Target::Node(bus.panner())]
        );
        assert_eq!(
            ctx.outputs(bus.panner()).unwrap(),
            &[Target::Node(bus.post_gain())]
        );
        assert_eq!(
            ctx.outputs(bus.post_gain()).unwrap(),
            &[
                Target::Node(bus.sends().input()),
                Target::Node(destination)
            ]
        );
    }

    #[test]
    fn connect_only_moves_the_external_leg() {
        let mut ctx = ProcessingContext::default();
        let destination = ctx.destination();
        let elsewhere = ctx.create_gain();
        let mut bus = Bus::new_with(&mut ctx, Some(destination.into())).unwrap();
        bus.connect(&mut ctx, elsewhere).unwrap();
        assert_eq!(bus.target(), Some(Target::Node(elsewhere)));
        assert_eq!(
            ctx.outputs(bus.post_gain()).unwrap(),
            &[
                Target::Node(bus.sends().input()),
                Target::Node(elsewhere)
            ]
        );
    }

    #[test]
    fn volume_and_pan() {
        let mut ctx = ProcessingContext::default();
        let bus = Bus::new_with(&mut ctx, None).unwrap();
        bus.set_volume(&mut ctx, Normal::new(0.3)).unwrap();
        bus.set_pan(&mut ctx, BipolarNormal::new(-0.5)).unwrap();
        assert_eq!(ctx.param(bus.post_gain_param()).unwrap().value(), 0.3);
        assert_eq!(ctx.param(bus.pan_param()).unwrap().value(), -0.5);
    }

    #[test]
    fn signal_passes_through() {
        let mut ctx = ProcessingContext::default();
        let destination = ctx.destination();
        let mut bus = Bus::new_with(&mut ctx, Some(destination.into())).unwrap();
        bus.effects_mut()
            .push(&mut ctx, GainCore::new_with(Normal::new(0.5)).into())
            .unwrap();
        bus.set_volume(&mut ctx, Normal::new(0.5)).unwrap();

        let buffer = std::sync::Arc::new(crate::graph::AudioBuffer::new_with(
            ctx.sample_rate(),
            vec![vec![1.0; 8]],
        ));
        let source = ctx.create_buffer_source(buffer, &Default::default());
        ctx.connect(source, bus.input()).unwrap();
        ctx.start_source(source, Seconds::zero(), Seconds::zero(), None)
            .unwrap();
        let mut frames = [StereoSample::SILENCE; 4];
        ctx.render(&mut frames);

        // A centered panner passes stereo through untouched.
        let expected = 0.25;
        assert!(frames
            .iter()
            .all(|f| (f.0 .0 - expected).abs() < 1e-9 && (f.1 .0 - expected).abs() < 1e-9));
    }

    #[test]
    fn dispose_removes_all_nodes() {
        let mut ctx = ProcessingContext::default();
        let before = ctx.node_count();
        let destination = ctx.destination();
        let mut bus = Bus::new_with(&mut ctx, Some(destination.into())).unwrap();
        let aux = ctx.create_gain();
        bus.sends_mut().create(&mut ctx, aux).unwrap();
        bus.dispose(&mut ctx);
        ctx.dispose_node(aux);
        assert_eq!(ctx.node_count(), before);
    }

    #[test]
    fn failed_create_leaves_no_nodes_behind() {
        let mut ctx = ProcessingContext::default();
        let stale = ctx.create_gain();
        ctx.dispose_node(stale);
        let before = ctx.node_count();
        assert!(matches!(
            Bus::new_with(&mut ctx, Some(stale.into())),
            Err(GraphError::UnknownNode(id)) if id == stale
        ));
        assert_eq!(ctx.node_count(), before);
    }
}
