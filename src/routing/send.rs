// Copyright (c) 2024 Mike Tsao

use super::gain_param;
use crate::{
    error::GraphError,
    graph::{ProcessingContext, Target},
    prelude::*,
};

/// One auxiliary tap: a gain node fed by its manager's shared input and
/// connected to one destination.
#[derive(Debug)]
pub struct AuxSend {
    id: SendId,
    node: NodeId,
    gain: ParamId,
    target: Option<Target>,
}
impl AuxSend {
    #[allow(missing_docs)]
    pub fn id(&self) -> SendId {
        self.id
    }

    /// The send's gain node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// How much of the shared input reaches the target.
    pub fn gain(&self) -> ParamId {
        self.gain
    }

    #[allow(missing_docs)]
    pub fn target(&self) -> Option<Target> {
        self.target
    }

    #[allow(missing_docs)]
    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    /// Re-points the send, dropping its old connection first.
    pub fn set_target(
        &mut self,
        ctx: &mut ProcessingContext,
        target: impl Into<Target>,
    ) -> Result<(), GraphError> {
        let target = target.into();
        ctx.disconnect(self.node);
        self.target = None;
        ctx.connect(self.node, target)?;
        self.target = Some(target);
        Ok(())
    }
}

/// Fans one shared input out to any number of [AuxSend]s. Sends are parallel
/// taps, not a chain, so their order means nothing.
///
/// Nothing stops two sends from sharing a target. Callers that don't want
/// double the signal should check [SendManager::get_by_target()] first.
#[derive(Debug)]
pub struct SendManager {
    input: NodeId,
    uid_factory: UidFactory<SendId>,
    sends: Vec<AuxSend>,
}
impl SendManager {
    #[allow(missing_docs)]
    pub fn new_with(ctx: &mut ProcessingContext) -> Self {
        Self {
            input: ctx.create_gain(),
            uid_factory: Default::default(),
            sends: Default::default(),
        }
    }

    /// The shared input that every send taps.
    pub fn input(&self) -> NodeId {
        self.input
    }

    /// Adds a send from the shared input to `target`.
    pub fn create(
        &mut self,
        ctx: &mut ProcessingContext,
        target: impl Into<Target>,
    ) -> Result<SendId, GraphError> {
        let target = target.into();
        let node = ctx.create_gain();
        let wired = gain_param(ctx, node).and_then(|gain| {
            ctx.connect(node, target)?;
            ctx.connect(self.input, node)?;
            Ok(gain)
        });
        let gain = match wired {
            Ok(gain) => gain,
            Err(e) => {
                ctx.dispose_node(node);
                return Err(e);
            }
        };
        let id = self.uid_factory.mint_next();
        self.sends.push(AuxSend {
            id,
            node,
            gain,
            target: Some(target),
        });
        Ok(id)
    }

    #[allow(missing_docs)]
    pub fn get(&self, id: SendId) -> Option<&AuxSend> {
        self.sends.iter().find(|s| s.id == id)
    }

    #[allow(missing_docs)]
    pub fn get_mut(&mut self, id: SendId) -> Option<&mut AuxSend> {
        self.sends.iter_mut().find(|s| s.id == id)
    }

    /// The first send aimed at `target`.
    pub fn get_by_target(&self, target: impl Into<Target>) -> Option<&AuxSend> {
        let target = Some(target.into());
        self.sends.iter().find(|s| s.target == target)
    }

    /// The send at `index` in creation order.
    pub fn get_nth(&self, index: usize) -> Option<&AuxSend> {
        self.sends.get(index)
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.sends.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.sends.is_empty()
    }

    #[allow(missing_docs)]
    pub fn iter(&self) -> impl Iterator<Item = &AuxSend> {
        self.sends.iter()
    }

    /// Disconnects and drops one send. Returns whether it existed.
    pub fn remove(&mut self, ctx: &mut ProcessingContext, id: SendId) -> bool {
        match self.sends.iter().position(|s| s.id == id) {
            Some(index) => {
                let send = self.sends.remove(index);
                ctx.dispose_node(send.node);
                true
            }
            None => false,
        }
    }

    /// Drops every send aimed at `target`, returning how many there were.
    pub fn remove_if_targeting(
        &mut self,
        ctx: &mut ProcessingContext,
        target: impl Into<Target>,
    ) -> usize {
        let target = Some(target.into());
        let (doomed, kept): (Vec<AuxSend>, Vec<AuxSend>) = std::mem::take(&mut self.sends)
            .into_iter()
            .partition(|s| s.target == target);
        self.sends = kept;
        doomed.iter().for_each(|s| ctx.dispose_node(s.node));
        doomed.len()
    }

    #[allow(missing_docs)]
    pub fn remove_all(&mut self, ctx: &mut ProcessingContext) {
        std::mem::take(&mut self.sends)
            .into_iter()
            .for_each(|s| ctx.dispose_node(s.node));
    }

    /// Removes every send and the shared input from the graph.
    pub fn dispose(mut self, ctx: &mut ProcessingContext) {
        self.remove_all(ctx);
        ctx.dispose_node(self.input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_tap_the_shared_input() {
        let mut ctx = ProcessingContext::default();
        let reverb_bus = ctx.create_gain();
        let delay_bus = ctx.create_gain();
        let mut sends = SendManager::new_with(&mut ctx);

        let a = sends.create(&mut ctx, reverb_bus).unwrap();
        let b = sends.create(&mut ctx, delay_bus).unwrap();
        assert_ne!(a, b);
        assert_eq!(sends.len(), 2);
        assert_eq!(ctx.outputs(sends.input()).unwrap().len(), 2);
        assert_eq!(
            sends.get_by_target(delay_bus).map(|s| s.id()),
            Some(b)
        );
        assert_eq!(sends.get_nth(0).map(|s| s.id()), Some(a));
        assert!(sends.get(a).unwrap().has_target());
        assert_eq!(
            ctx.outputs(sends.get(a).unwrap().node()).unwrap(),
            &[Target::Node(reverb_bus)]
        );

        assert!(sends.remove(&mut ctx, a));
        assert!(!sends.remove(&mut ctx, a));
        assert_eq!(ctx.outputs(sends.input()).unwrap().len(), 1);
    }

    #[test]
    fn remove_if_targeting_counts() {
        let mut ctx = ProcessingContext::default();
        let target = ctx.create_gain();
        let other = ctx.create_gain();
        let mut sends = SendManager::new_with(&mut ctx);
        sends.create(&mut ctx, target).unwrap();
        sends.create(&mut ctx, target).unwrap();
        sends.create(&mut ctx, other).unwrap();

        assert_eq!(sends.remove_if_targeting(&mut ctx, target), 2);
        assert_eq!(sends.remove_if_targeting(&mut ctx, target), 0);
        assert_eq!(sends.len(), 1);
        assert!(ctx.sources_of(target).is_empty());
    }

    #[test]
    fn retargeting_a_send() {
        let mut ctx = ProcessingContext::default();
        let first = ctx.create_gain();
        let second = ctx.create_gain();
        let mut sends = SendManager::new_with(&mut ctx);
        let id = sends.create(&mut ctx, first).unwrap();
        sends
            .get_mut(id)
            .unwrap()
            .set_target(&mut ctx, second)
            .unwrap();
        assert!(ctx.sources_of(first).is_empty());
        assert_eq!(sends.get(id).unwrap().target(), Some(Target::Node(second)));
    }

    #[test]
    fn dispose_cleans_up() {
        let mut ctx = ProcessingContext::default();
        let target = ctx.create_gain();
        let before = ctx.node_count();
        let mut sends = SendManager::new_with(&mut ctx);
        sends.create(&mut ctx, target).unwrap();
        sends.dispose(&mut ctx);
        assert_eq!(ctx.node_count(), before);
    }
}
