// Copyright (c) 2024 Mike Tsao

use super::{gain_param, AudioEffect};
use crate::{
    cores::{Effect, EffectKind},
    error::GraphError,
    graph::{NodeType, ProcessingContext, Target},
    prelude::*,
};

/// An ordered run of [AudioEffect]s between a pre-gain input node and a
/// post-gain output node. Insertion order is signal order, and there is always
/// exactly one path from input to output.
///
/// Chains hold a handful of effects, so lookups are linear scans.
#[derive(Debug)]
pub struct EffectChain {
    input: NodeId,
    output: NodeId,
    gain: ParamId,
    effects: Vec<AudioEffect>,
    target: Option<Target>,
}
impl EffectChain {
    /// An empty chain, its input wired straight to its output, and its output
    /// wired to `target` if there is one.
    pub fn new_with(
        ctx: &mut ProcessingContext,
        target: Option<Target>,
    ) -> Result<Self, GraphError> {
        let input = ctx.create_gain();
        let output = ctx.create_gain();
        match Self::wire(ctx, input, output, target) {
            Ok(gain) => Ok(Self {
                input,
                output,
                gain,
                effects: Default::default(),
                target,
            }),
            Err(e) => {
                ctx.dispose_node(input);
                ctx.dispose_node(output);
                Err(e)
            }
        }
    }

    fn wire(
        ctx: &mut ProcessingContext,
        input: NodeId,
        output: NodeId,
        target: Option<Target>,
    ) -> Result<ParamId, GraphError> {
        ctx.connect(input, output)?;
        if let Some(target) = target {
            ctx.connect(output, target)?;
        }
        gain_param(ctx, output)
    }

    #[allow(missing_docs)]
    pub fn input(&self) -> NodeId {
        self.input
    }

    #[allow(missing_docs)]
    pub fn output(&self) -> NodeId {
        self.output
    }

    /// The post-gain parameter on the chain's output.
    pub fn gain(&self) -> ParamId {
        self.gain
    }

    /// Where the chain's output goes, if anywhere.
    pub fn target(&self) -> Option<Target> {
        self.target
    }

    /// Re-points the chain's output. The old connection is gone before the new
    /// one is made.
    pub fn set_target(
        &mut self,
        ctx: &mut ProcessingContext,
        target: impl Into<Target>,
    ) -> Result<(), GraphError> {
        let target = target.into();
        if let Some(old) = self.target.take() {
            ctx.disconnect_from(self.output, old);
        }
        ctx.connect(self.output, target)?;
        self.target = Some(target);
        Ok(())
    }

    /// Disconnects the chain's output.
    pub fn clear_target(&mut self, ctx: &mut ProcessingContext) {
        if let Some(old) = self.target.take() {
            ctx.disconnect_from(self.output, old);
        }
    }

    // The node just upstream of slot `index`.
    fn upstream_of(&self, index: usize) -> NodeId {
        if index == 0 {
            self.input
        } else {
            self.effects[index - 1].output()
        }
    }

    // The node just downstream of slot `index`, when `index` is the position
    // of something that isn't there yet.
    fn downstream_of(&self, index: usize) -> NodeId {
        self.effects
            .get(index)
            .map(|e| e.input())
            .unwrap_or(self.output)
    }

    /// Appends `effect` at the tail of the chain.
    pub fn push(&mut self, ctx: &mut ProcessingContext, effect: Effect) -> Result<(), GraphError> {
        let effect = AudioEffect::new_with(ctx, effect)?;
        self.push_existing(ctx, effect)
    }

    /// Appends an already-wrapped effect at the tail of the chain.
    pub fn push_existing(
        &mut self,
        ctx: &mut ProcessingContext,
        effect: AudioEffect,
    ) -> Result<(), GraphError> {
        self.splice_in(ctx, effect, self.effects.len())
    }

    /// Inserts `effect` so that it ends up at `index`, or at the tail if
    /// `index` is past the end.
    pub fn insert(
        &mut self,
        ctx: &mut ProcessingContext,
        effect: Effect,
        index: usize,
    ) -> Result<(), GraphError> {
        let effect = AudioEffect::new_with(ctx, effect)?;
        self.splice_in(ctx, effect, index.min(self.effects.len()))
    }

    fn splice_in(
        &mut self,
        ctx: &mut ProcessingContext,
        effect: AudioEffect,
        index: usize,
    ) -> Result<(), GraphError> {
        let upstream = self.upstream_of(index);
        let downstream = self.downstream_of(index);
        ctx.disconnect_from(upstream, downstream);
        ctx.connect(upstream, effect.input())?;
        effect.connect(ctx, downstream)?;
        self.effects.insert(index, effect);
        Ok(())
    }

    fn remove_at(&mut self, ctx: &mut ProcessingContext, index: usize) -> Result<Effect, GraphError> {
        let upstream = self.upstream_of(index);
        let removed = self.effects.remove(index);
        let downstream = self.downstream_of(index);
        ctx.disconnect_from(upstream, removed.input());
        removed.disconnect(ctx);
        ctx.connect(upstream, downstream)?;
        let node = removed.effect_node();
        removed
            .take(ctx)
            .ok_or(GraphError::WrongNodeType(node, NodeType::Effect))
    }

    /// Removes the first effect of the given kind, closing the gap it leaves,
    /// and returns its processing unit.
    pub fn remove(&mut self, ctx: &mut ProcessingContext, kind: EffectKind) -> Option<Effect> {
        self.remove_where(ctx, |e| e.kind() == kind)
    }

    /// Removes the first effect that satisfies `predicate`.
    pub fn remove_where(
        &mut self,
        ctx: &mut ProcessingContext,
        predicate: impl Fn(&AudioEffect) -> bool,
    ) -> Option<Effect> {
        let index = self.effects.iter().position(predicate)?;
        self.remove_at(ctx, index).ok()
    }

    /// The first effect of the given kind.
    pub fn get(&self, kind: EffectKind) -> Option<&AudioEffect> {
        self.effects.iter().find(|e| e.kind() == kind)
    }

    #[allow(missing_docs)]
    pub fn get_mut(&mut self, kind: EffectKind) -> Option<&mut AudioEffect> {
        self.effects.iter_mut().find(|e| e.kind() == kind)
    }

    /// Every effect of the given kind, in chain order.
    pub fn get_all_of(&self, kind: EffectKind) -> Vec<&AudioEffect> {
        self.effects.iter().filter(|e| e.kind() == kind).collect()
    }

    /// The `n`th (counting from zero) effect of the given kind.
    pub fn get_nth(&self, kind: EffectKind, n: usize) -> Option<&AudioEffect> {
        self.effects.iter().filter(|e| e.kind() == kind).nth(n)
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// The effects in signal order.
    pub fn iter(&self) -> impl Iterator<Item = &AudioEffect> {
        self.effects.iter()
    }

    /// Removes every effect and both gain nodes from the graph.
    pub fn dispose(self, ctx: &mut ProcessingContext) {
        ctx.disconnect(self.output);
        for effect in self.effects {
            effect.dispose(ctx);
        }
        ctx.dispose_node(self.input);
        ctx.dispose_node(self.output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cores::{BiQuadFilterCore, DelayCore, GainCore, ReverbCore};

    // Walks the chain's wiring and checks that each link points at the next.
    fn assert_single_path(ctx: &ProcessingContext, chain: &EffectChain) {
        let mut expected_inputs: Vec<NodeId> = chain.iter().map(|e| e.input()).collect();
        expected_inputs.push(chain.output());
        let mut upstream = chain.input();
        for expected in expected_inputs {
            assert_eq!(
                ctx.outputs(upstream).unwrap(),
                &[Target::Node(expected)],
                "{upstream} should feed only {expected}"
            );
            if let Some(effect) = chain.iter().find(|e| e.input() == expected) {
                upstream = effect.output();
            }
        }
    }

    fn kinds(chain: &EffectChain) -> Vec<EffectKind> {
        chain.iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn empty_chain_is_a_straight_wire() {
        let mut ctx = ProcessingContext::default();
        let destination = ctx.destination();
        let chain = EffectChain::new_with(&mut ctx, Some(destination.into())).unwrap();
        assert!(chain.is_empty());
        assert_single_path(&ctx, &chain);
        assert_eq!(
            ctx.outputs(chain.output()).unwrap(),
            &[Target::Node(destination)]
        );
    }

    #[test]
    fn removing_the_middle_closes_the_gap() {
        let mut ctx = ProcessingContext::default();
        let mut chain = EffectChain::new_with(&mut ctx, None).unwrap();
        chain.push(&mut ctx, ReverbCore::default().into()).unwrap();
        chain.push(&mut ctx, DelayCore::default().into()).unwrap();
        chain.push(&mut ctx, GainCore::default().into()).unwrap();
        assert_single_path(&ctx, &chain);

        let removed = chain.remove(&mut ctx, EffectKind::Delay).unwrap();
        assert_eq!(removed.kind(), EffectKind::Delay);
        assert_eq!(kinds(&chain), vec![EffectKind::Reverb, EffectKind::Gain]);
        let a = chain.get(EffectKind::Reverb).unwrap();
        let c = chain.get(EffectKind::Gain).unwrap();
        assert_eq!(ctx.outputs(a.output()).unwrap(), &[Target::Node(c.input())]);
        assert_single_path(&ctx, &chain);

        assert!(chain.remove(&mut ctx, EffectKind::Delay).is_none());
    }

    #[test]
    fn insert_clamps_the_index() {
        let mut ctx = ProcessingContext::default();
        let mut chain = EffectChain::new_with(&mut ctx, None).unwrap();
        chain.insert(&mut ctx, GainCore::default().into(), 99).unwrap();
        chain.insert(&mut ctx, ReverbCore::default().into(), 0).unwrap();
        chain
            .insert(&mut ctx, BiQuadFilterCore::default().into(), 1)
            .unwrap();
        chain.insert(&mut ctx, DelayCore::default().into(), 3).unwrap();
        assert_eq!(
            kinds(&chain),
            vec![
                EffectKind::Reverb,
                EffectKind::Filter,
                EffectKind::Gain,
                EffectKind::Delay
            ]
        );
        assert_single_path(&ctx, &chain);

        while !chain.is_empty() {
            let _ = chain.remove_where(&mut ctx, |_| true);
            assert_single_path(&ctx, &chain);
        }
    }

    #[test]
    fn lookups_by_kind() {
        let mut ctx = ProcessingContext::default();
        let mut chain = EffectChain::new_with(&mut ctx, None).unwrap();
        chain.push(&mut ctx, GainCore::default().into()).unwrap();
        chain.push(&mut ctx, ReverbCore::default().into()).unwrap();
        chain.push(&mut ctx, GainCore::default().into()).unwrap();

        assert_eq!(chain.get_all_of(EffectKind::Gain).len(), 2);
        let second = chain.get_nth(EffectKind::Gain, 1).unwrap();
        assert_eq!(second.input(), chain.iter().nth(2).unwrap().input());
        assert!(chain.get_nth(EffectKind::Gain, 2).is_none());
        assert!(chain.get(EffectKind::Convolver).is_none());
    }

    #[test]
    fn retargeting_never_doubles_up() {
        let mut ctx = ProcessingContext::default();
        let a = ctx.create_gain();
        let b = ctx.create_gain();
        let mut chain = EffectChain::new_with(&mut ctx, Some(a.into())).unwrap();
        chain.push(&mut ctx, GainCore::default().into()).unwrap();
        chain.set_target(&mut ctx, b).unwrap();
        assert_eq!(chain.target(), Some(Target::Node(b)));
        assert_eq!(ctx.outputs(chain.output()).unwrap(), &[Target::Node(b)]);
        chain.clear_target(&mut ctx);
        assert!(ctx.outputs(chain.output()).unwrap().is_empty());
    }

    #[test]
    fn dispose_removes_everything() {
        let mut ctx = ProcessingContext::default();
        let before = ctx.node_count();
        let destination = ctx.destination();
        let mut chain = EffectChain::new_with(&mut ctx, Some(destination.into())).unwrap();
        chain.push(&mut ctx, GainCore::default().into()).unwrap();
        chain.push(&mut ctx, ReverbCore::default().into()).unwrap();
        chain.dispose(&mut ctx);
        assert_eq!(ctx.node_count(), before);
        assert!(ctx.sources_of(ctx.destination()).is_empty());
    }

    #[test]
    fn failed_create_leaves_no_nodes_behind() {
        let mut ctx = ProcessingContext::default();
        let stale = ctx.create_gain();
        ctx.dispose_node(stale);
        let before = ctx.node_count();
        assert!(EffectChain::new_with(&mut ctx, Some(stale.into())).is_err());
        assert_eq!(ctx.node_count(), before);
    }
}
