// Copyright (c) 2024 Mike Tsao

use super::gain_param;
use crate::{
    cores::{Effect, EffectKind},
    error::GraphError,
    graph::{ProcessingContext, Target},
    prelude::*,
};

/// Wraps one [Effect] node with a wet/dry splitter so that every effect can be
/// inserted, blended, or bypassed the same way.
///
/// ```text
/// input -> dry -----------> output
/// input -> wet -> effect -> output
/// ```
///
/// A new wrapper is fully wet. It's consumed by [AudioEffect::dispose()] or
/// [AudioEffect::take()], so it can't be disposed twice.
#[derive(Debug)]
pub struct AudioEffect {
    kind: EffectKind,
    effect: NodeId,
    input: NodeId,
    output: NodeId,
    dry: NodeId,
    wet: NodeId,
    dry_gain: ParamId,
    wet_gain: ParamId,
}
impl AudioEffect {
    /// Adds the effect and its four gain nodes to the graph and wires them
    /// together.
    pub fn new_with(ctx: &mut ProcessingContext, effect: Effect) -> Result<Self, GraphError> {
        let kind = effect.kind();
        let effect = ctx.create_effect(effect);
        let input = ctx.create_gain();
        let output = ctx.create_gain();
        let dry = ctx.create_gain();
        let wet = ctx.create_gain();

        ctx.connect(input, dry)?;
        ctx.connect(dry, output)?;
        ctx.connect(input, wet)?;
        ctx.connect(wet, effect)?;
        ctx.connect(effect, output)?;

        let r = Self {
            kind,
            effect,
            input,
            output,
            dry,
            wet,
            dry_gain: gain_param(ctx, dry)?,
            wet_gain: gain_param(ctx, wet)?,
        };
        ctx.set_param_value(r.dry_gain, 0.0)?;
        ctx.set_param_value(r.wet_gain, 1.0)?;
        Ok(r)
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Where signal enters the wrapper.
    pub fn input(&self) -> NodeId {
        self.input
    }

    /// Where signal leaves the wrapper.
    pub fn output(&self) -> NodeId {
        self.output
    }

    /// The node that holds the wrapped [Effect].
    pub fn effect_node(&self) -> NodeId {
        self.effect
    }

    #[allow(missing_docs)]
    pub fn wet_gain(&self) -> ParamId {
        self.wet_gain
    }

    #[allow(missing_docs)]
    pub fn dry_gain(&self) -> ParamId {
        self.dry_gain
    }

    /// The current intrinsic wet level.
    pub fn wet(&self, ctx: &ProcessingContext) -> ParameterType {
        ctx.param(self.wet_gain)
            .map(|p| p.value())
            .unwrap_or_default()
    }

    /// The current intrinsic dry level.
    pub fn dry(&self, ctx: &ProcessingContext) -> ParameterType {
        ctx.param(self.dry_gain)
            .map(|p| p.value())
            .unwrap_or_default()
    }

    /// Blends the effect in. `percent` is clamped to 0.0..=1.0; the wet level
    /// becomes `percent` and the dry level `1.0 - percent`. A zero `ramp` sets
    /// both immediately. Otherwise they glide linearly, arriving `ramp` from
    /// now.
    pub fn set_wet_dry(
        &self,
        ctx: &mut ProcessingContext,
        percent: f64,
        ramp: Seconds,
    ) -> Result<(), GraphError> {
        let wet = percent.clamp(0.0, 1.0);
        Self::glide(ctx, self.wet_gain, wet, ramp)?;
        Self::glide(ctx, self.dry_gain, 1.0 - wet, ramp)
    }

    /// Sets the wet level alone, gliding over `ramp` like
    /// [AudioEffect::set_wet_dry()]. Negative values become zero.
    pub fn set_wet(
        &self,
        ctx: &mut ProcessingContext,
        value: f64,
        ramp: Seconds,
    ) -> Result<(), GraphError> {
        Self::glide(ctx, self.wet_gain, value.max(0.0), ramp)
    }

    /// Sets the dry level alone, gliding over `ramp` like
    /// [AudioEffect::set_wet_dry()]. Negative values become zero.
    pub fn set_dry(
        &self,
        ctx: &mut ProcessingContext,
        value: f64,
        ramp: Seconds,
    ) -> Result<(), GraphError> {
        Self::glide(ctx, self.dry_gain, value.max(0.0), ramp)
    }

    fn glide(
        ctx: &mut ProcessingContext,
        id: ParamId,
        value: f64,
        ramp: Seconds,
    ) -> Result<(), GraphError> {
        let now = ctx.current_time();
        let param = ctx.param_mut(id).ok_or(GraphError::UnknownParam(id))?;
        param.cancel_scheduled_values(now);
        if ramp.0 <= 0.0 {
            param.set_value(value);
        } else {
            param.linear_ramp_to_value_at_time(value, now + ramp);
        }
        Ok(())
    }

    /// Points the output at `target`, dropping whatever it was connected to.
    pub fn connect(
        &self,
        ctx: &mut ProcessingContext,
        target: impl Into<Target>,
    ) -> Result<(), GraphError> {
        ctx.disconnect(self.output);
        ctx.connect(self.output, target)
    }

    #[allow(missing_docs)]
    pub fn disconnect(&self, ctx: &mut ProcessingContext) {
        ctx.disconnect(self.output);
    }

    #[allow(missing_docs)]
    pub fn effect<'a>(&self, ctx: &'a ProcessingContext) -> Option<&'a Effect> {
        ctx.effect(self.effect)
    }

    /// Use this to adjust the wrapped effect's own settings.
    pub fn effect_mut<'a>(&self, ctx: &'a mut ProcessingContext) -> Option<&'a mut Effect> {
        ctx.effect_mut(self.effect)
    }

    fn dispose_gains(&self, ctx: &mut ProcessingContext) {
        for id in [self.input, self.wet, self.dry, self.output] {
            ctx.dispose_node(id);
        }
    }

    /// Removes all five nodes from the graph.
    pub fn dispose(self, ctx: &mut ProcessingContext) {
        self.dispose_gains(ctx);
        ctx.dispose_node(self.effect);
    }

    /// Removes the wrapper's nodes from the graph and hands back the
    /// processing unit, which can go into another wrapper later.
    pub fn take(self, ctx: &mut ProcessingContext) -> Option<Effect> {
        self.dispose_gains(ctx);
        ctx.take_effect(self.effect)
    }
}
