// Copyright (c) 2024 Mike Tsao

use super::{
    node::{
        cents_to_ratio, BufferSourceState, Node, NodeKind, OscillatorState, Schedule,
    },
    AudioBuffer, AudioParam, BufferSourceOptions, MediaElement, NodeType, OscillatorOptions,
    ParamKind, Target,
};
use crate::{
    cores::{equal_power_pan, Effect, Oscillator},
    error::GraphError,
    prelude::*,
    util::CrossbeamChannel,
};
use crossbeam::channel::{Receiver, TrySendError};
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::{collections::VecDeque, sync::Arc};
use strum_macros::Display;

/// Where the context is in its lifecycle.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// Things that happen inside the context that its owner might care about.
#[derive(Clone, Debug, PartialEq)]
pub enum ContextEvent {
    /// The context moved to a new lifecycle state.
    StateChanged(ContextState),
    /// A source node reached its end and was removed from the graph.
    Ended(NodeId),
}

/// How to build a [ProcessingContext].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContextSettings {
    #[allow(missing_docs)]
    pub sample_rate: SampleRate,
    /// Whether the clock waits for [ProcessingContext::resume()] before it
    /// starts running. Hosts that require a user gesture start suspended.
    pub start_suspended: bool,
}

#[derive(Debug)]
struct ParamSlot {
    param: AudioParam,
    owner: NodeId,
    // Automation plus modulation, as of the most recent rendered frame.
    computed: ParameterType,
}

/// Owns every node and parameter in a processing graph and renders the graph
/// into frames.
///
/// Nodes are addressed by [NodeId] and parameters by [ParamId]; neither handle
/// keeps anything alive. Connections run from a node to a [Target], and the
/// context refuses any connection that would close a cycle, so rendering can
/// always proceed in topological order.
///
/// The clock advances one frame per rendered frame, and only while the context
/// is [ContextState::Running]. Source nodes that finish are disposed at the
/// end of the block in which they finished, and a [ContextEvent::Ended] goes
/// out on the event channel. The channel keeps only the most recent
/// [ProcessingContext::EVENT_CAPACITY] events, so nobody has to listen.
#[derive(Debug)]
pub struct ProcessingContext {
    sample_rate: SampleRate,
    state: ContextState,
    frames_rendered: usize,

    node_uid_factory: UidFactory<NodeId>,
    param_uid_factory: UidFactory<ParamId>,
    nodes: FxHashMap<NodeId, Node>,
    params: FxHashMap<ParamId, ParamSlot>,
    destination: NodeId,

    // Derived from the node outputs whenever the graph changes shape.
    is_order_dirty: bool,
    order: Vec<NodeId>,
    node_inputs: FxHashMap<NodeId, Vec<NodeId>>,
    param_inputs: FxHashMap<ParamId, Vec<NodeId>>,

    frame_outputs: FxHashMap<NodeId, StereoSample>,

    events: CrossbeamChannel<ContextEvent>,
}
impl Default for ProcessingContext {
    fn default() -> Self {
        Self::new_with(ContextSettings::default())
    }
}
impl ProcessingContext {
    /// How many undelivered events the context holds before dropping the
    /// oldest.
    pub const EVENT_CAPACITY: usize = 256;

    #[allow(missing_docs)]
    pub fn new_with(settings: ContextSettings) -> Self {
        let node_uid_factory = UidFactory::<NodeId>::default();
        let destination = node_uid_factory.mint_next();
        let mut nodes = FxHashMap::default();
        nodes.insert(destination, Node::new_with(NodeKind::Destination));
        let state = if settings.start_suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        info!(
            "Processing context created at {} Hz, {state}",
            settings.sample_rate
        );
        Self {
            sample_rate: settings.sample_rate,
            state,
            frames_rendered: 0,
            node_uid_factory,
            param_uid_factory: Default::default(),
            nodes,
            params: Default::default(),
            destination,
            is_order_dirty: true,
            order: Default::default(),
            node_inputs: Default::default(),
            param_inputs: Default::default(),
            frame_outputs: Default::default(),
            events: CrossbeamChannel::new_bounded(Self::EVENT_CAPACITY),
        }
    }

    #[allow(missing_docs)]
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// The context clock. It starts at zero and stands still unless the
    /// context is running.
    pub fn current_time(&self) -> Seconds {
        Seconds(self.frames_rendered as f64 / f64::from(self.sample_rate))
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// The final node. Whatever reaches it is what [Self::render()] produces.
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// A receiver for lifecycle and source-ended events.
    pub fn events(&self) -> Receiver<ContextEvent> {
        self.events.receiver.clone()
    }

    /// Starts (or restarts) the clock.
    pub fn resume(&mut self) -> Result<(), GraphError> {
        match self.state {
            ContextState::Closed => Err(GraphError::Closed),
            ContextState::Running => Ok(()),
            ContextState::Suspended => {
                self.set_state(ContextState::Running);
                Ok(())
            }
        }
    }

    /// Stops the clock. Rendering produces silence until the next resume.
    pub fn suspend(&mut self) -> Result<(), GraphError> {
        match self.state {
            ContextState::Closed => Err(GraphError::Closed),
            ContextState::Suspended => Ok(()),
            ContextState::Running => {
                self.set_state(ContextState::Suspended);
                Ok(())
            }
        }
    }

    /// Shuts the context down for good.
    pub fn close(&mut self) {
        if self.state != ContextState::Closed {
            self.set_state(ContextState::Closed);
        }
    }

    fn set_state(&mut self, state: ContextState) {
        info!("Processing context {} -> {state}", self.state);
        self.state = state;
        self.send_event(ContextEvent::StateChanged(state));
    }

    fn send_event(&self, event: ContextEvent) {
        let mut event = event;
        loop {
            match self.events.sender.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(unsent)) => {
                    if let Ok(dropped) = self.events.receiver.try_recv() {
                        debug!("Event backlog full; dropped {dropped:?}");
                    }
                    event = unsent;
                }
                Err(TrySendError::Disconnected(unsent)) => {
                    warn!("Couldn't post context event: {unsent:?}");
                    return;
                }
            }
        }
    }

    fn add_param(&mut self, owner: NodeId, param: AudioParam) -> ParamId {
        let id = self.param_uid_factory.mint_next();
        let mut param = param;
        param.advance_to(self.current_time());
        let computed = param.value();
        self.params.insert(
            id,
            ParamSlot {
                param,
                owner,
                computed,
            },
        );
        id
    }

    fn add_node(&mut self, id: NodeId, kind: NodeKind) -> NodeId {
        debug!("Adding {} node {id}", kind.node_type());
        self.nodes.insert(id, Node::new_with(kind));
        self.is_order_dirty = true;
        id
    }

    /// A node that scales its input by its [ParamKind::Gain] parameter,
    /// initially 1.0.
    pub fn create_gain(&mut self) -> NodeId {
        let id = self.node_uid_factory.mint_next();
        let gain = self.add_param(id, AudioParam::new_unbounded(1.0));
        self.add_node(id, NodeKind::Gain { gain })
    }

    /// A node that positions its input with an equal-power pan law. Its
    /// [ParamKind::Pan] parameter runs from -1.0 (left) to 1.0 (right).
    pub fn create_stereo_panner(&mut self) -> NodeId {
        let id = self.node_uid_factory.mint_next();
        let pan = self.add_param(id, AudioParam::new_with(0.0, -1.0, 1.0));
        self.add_node(id, NodeKind::StereoPanner { pan })
    }

    /// A node that runs its input through an [Effect].
    pub fn create_effect(&mut self, effect: Effect) -> NodeId {
        let mut effect = effect;
        effect.update_sample_rate(self.sample_rate);
        let id = self.node_uid_factory.mint_next();
        self.add_node(id, NodeKind::Effect(effect))
    }

    /// A one-shot node that plays `buffer` once started. It removes itself
    /// when it ends.
    pub fn create_buffer_source(
        &mut self,
        buffer: Arc<AudioBuffer>,
        options: &BufferSourceOptions,
    ) -> NodeId {
        let id = self.node_uid_factory.mint_next();
        let playback_rate = self.add_param(id, AudioParam::new_unbounded(options.playback_rate));
        let detune = self.add_param(id, AudioParam::new_unbounded(options.detune));
        self.add_node(
            id,
            NodeKind::BufferSource(BufferSourceState::new_with(
                buffer,
                options,
                playback_rate,
                detune,
            )),
        )
    }

    /// A periodic tone generator. It's silent until started.
    pub fn create_oscillator(&mut self, options: &OscillatorOptions) -> NodeId {
        let id = self.node_uid_factory.mint_next();
        let frequency = self.add_param(
            id,
            AudioParam::new_with(
                options.frequency.0,
                -FrequencyHz::FREQUENCY_MAX,
                FrequencyHz::FREQUENCY_MAX,
            ),
        );
        let detune = self.add_param(id, AudioParam::new_unbounded(options.detune));
        let core = Oscillator::new_with(options.waveform, options.frequency, self.sample_rate);
        self.add_node(
            id,
            NodeKind::Oscillator(OscillatorState {
                core,
                frequency,
                detune,
                start_at: None,
                stop_at: None,
                is_finished: false,
            }),
        )
    }

    /// A node that plays whatever `element` is streaming.
    pub fn create_media_element_source(&mut self, element: MediaElement) -> NodeId {
        let id = self.node_uid_factory.mint_next();
        self.add_node(id, NodeKind::MediaElementSource(element))
    }

    fn target_node(&self, target: Target) -> Option<NodeId> {
        match target {
            Target::Node(id) => self.nodes.contains_key(&id).then_some(id),
            Target::Param(id) => self.params.get(&id).map(|slot| slot.owner),
        }
    }

    // Whether a path of connections leads from `from` to `to`.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = FxHashSet::default();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.outputs.iter().filter_map(|t| self.target_node(*t)));
            }
        }
        false
    }

    /// Routes `source`'s output to `target`. Connecting the same pair twice is
    /// harmless.
    pub fn connect(&mut self, source: NodeId, target: impl Into<Target>) -> Result<(), GraphError> {
        let target = target.into();
        if source == self.destination {
            return Err(GraphError::DestinationIsSink);
        }
        if !self.nodes.contains_key(&source) {
            return Err(GraphError::UnknownNode(source));
        }
        let target_node = match target {
            Target::Node(id) => self
                .target_node(target)
                .ok_or(GraphError::UnknownNode(id))?,
            Target::Param(id) => self
                .target_node(target)
                .ok_or(GraphError::UnknownParam(id))?,
        };
        if self.reaches(target_node, source) {
            return Err(GraphError::WouldCycle(source, target_node));
        }
        if let Some(node) = self.nodes.get_mut(&source) {
            if !node.outputs.contains(&target) {
                debug!("Connecting {source} -> {target:?}");
                node.outputs.push(target);
                self.is_order_dirty = true;
            }
        }
        Ok(())
    }

    /// Removes every outgoing connection from `source`.
    pub fn disconnect(&mut self, source: NodeId) {
        if let Some(node) = self.nodes.get_mut(&source) {
            if !node.outputs.is_empty() {
                node.outputs.clear();
                self.is_order_dirty = true;
            }
        }
    }

    /// Removes the one connection from `source` to `target`, returning whether
    /// it existed.
    pub fn disconnect_from(&mut self, source: NodeId, target: impl Into<Target>) -> bool {
        let target = target.into();
        let Some(node) = self.nodes.get_mut(&source) else {
            return false;
        };
        let before = node.outputs.len();
        node.outputs.retain(|t| *t != target);
        let removed = node.outputs.len() != before;
        if removed {
            self.is_order_dirty = true;
        }
        removed
    }

    /// Removes a node, its parameters, and every connection into or out of
    /// it. Disposing of a node that doesn't exist is a programming error, as
    /// is disposing of the destination.
    pub fn dispose_node(&mut self, id: NodeId) {
        assert!(
            id != self.destination,
            "the destination node can't be disposed"
        );
        if self.remove_node(id).is_none() {
            panic!("node {id} doesn't exist (was it disposed twice?)");
        }
    }

    fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        if id == self.destination {
            return None;
        }
        let node = self.nodes.remove(&id)?;
        let params = node.kind.params();
        for param in params.iter() {
            self.params.remove(param);
        }
        for other in self.nodes.values_mut() {
            other.outputs.retain(|t| match t {
                Target::Node(n) => *n != id,
                Target::Param(p) => !params.contains(p),
            });
        }
        self.frame_outputs.remove(&id);
        self.is_order_dirty = true;
        debug!("Removed {} node {id}", node.kind.node_type());
        Some(node)
    }

    #[allow(missing_docs)]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// How many nodes exist, including the destination.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[allow(missing_docs)]
    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.nodes.get(&id).map(|n| n.kind.node_type())
    }

    /// Where `id` sends its output.
    pub fn outputs(&self, id: NodeId) -> Option<&[Target]> {
        self.nodes.get(&id).map(|n| n.outputs.as_slice())
    }

    /// Every node that connects to `target`, in no particular order.
    pub fn sources_of(&self, target: impl Into<Target>) -> Vec<NodeId> {
        let target = target.into();
        let mut sources: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.outputs.contains(&target))
            .map(|(id, _)| *id)
            .collect();
        sources.sort_by_key(|id| id.0);
        sources
    }

    /// Looks up one of a node's parameters by name.
    pub fn param_of(&self, node: NodeId, kind: ParamKind) -> Option<ParamId> {
        self.nodes.get(&node).and_then(|n| n.kind.param(kind))
    }

    #[allow(missing_docs)]
    pub fn param(&self, id: ParamId) -> Option<&AudioParam> {
        self.params.get(&id).map(|slot| &slot.param)
    }

    /// Use this to schedule automation.
    pub fn param_mut(&mut self, id: ParamId) -> Option<&mut AudioParam> {
        self.params.get_mut(&id).map(|slot| &mut slot.param)
    }

    /// Sets a parameter's intrinsic value.
    pub fn set_param_value(&mut self, id: ParamId, value: ParameterType) -> Result<(), GraphError> {
        let slot = self
            .params
            .get_mut(&id)
            .ok_or(GraphError::UnknownParam(id))?;
        slot.param.set_value(value);
        Ok(())
    }

    /// The parameter's value as of the most recent rendered frame, including
    /// any signal connected to it.
    pub fn computed_value(&self, id: ParamId) -> Option<ParameterType> {
        self.params.get(&id).map(|slot| slot.computed)
    }

    #[allow(missing_docs)]
    pub fn effect(&self, id: NodeId) -> Option<&Effect> {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Effect(effect)) => Some(effect),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn effect_mut(&mut self, id: NodeId) -> Option<&mut Effect> {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Effect(effect)) => Some(effect),
            _ => None,
        }
    }

    /// Takes the [Effect] out of an effect node, disposing of the node.
    pub fn take_effect(&mut self, id: NodeId) -> Option<Effect> {
        if self.node_type(id) != Some(NodeType::Effect) {
            return None;
        }
        match self.remove_node(id)?.kind {
            NodeKind::Effect(effect) => Some(effect),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn media_element(&self, id: NodeId) -> Option<&MediaElement> {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::MediaElementSource(element)) => Some(element),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn media_element_mut(&mut self, id: NodeId) -> Option<&mut MediaElement> {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::MediaElementSource(element)) => Some(element),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn oscillator(&self, id: NodeId) -> Option<&Oscillator> {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Oscillator(state)) => Some(&state.core),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn oscillator_mut(&mut self, id: NodeId) -> Option<&mut Oscillator> {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Oscillator(state)) => Some(&mut state.core),
            _ => None,
        }
    }

    fn node_kind_mut(&mut self, id: NodeId) -> Result<&mut NodeKind, GraphError> {
        self.nodes
            .get_mut(&id)
            .map(|n| &mut n.kind)
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Schedules a buffer source to begin at context time `when`, `offset`
    /// into its buffer, playing for at most `duration` of buffer time. A
    /// source can be started only once.
    pub fn start_source(
        &mut self,
        id: NodeId,
        when: Seconds,
        offset: Seconds,
        duration: Option<Seconds>,
    ) -> Result<(), GraphError> {
        match self.node_kind_mut(id)? {
            NodeKind::BufferSource(state) => {
                if state.schedule.is_some() {
                    return Err(GraphError::AlreadyStarted(id));
                }
                state.schedule = Some(Schedule {
                    when,
                    offset,
                    duration,
                });
                Ok(())
            }
            other => Err(GraphError::WrongNodeType(id, other.node_type())),
        }
    }

    /// Schedules an oscillator to begin at context time `when`.
    pub fn start_oscillator(&mut self, id: NodeId, when: Seconds) -> Result<(), GraphError> {
        match self.node_kind_mut(id)? {
            NodeKind::Oscillator(state) => {
                if state.start_at.is_some() {
                    return Err(GraphError::AlreadyStarted(id));
                }
                state.start_at = Some(when);
                Ok(())
            }
            other => Err(GraphError::WrongNodeType(id, other.node_type())),
        }
    }

    /// Schedules a buffer source or oscillator to end at context time `when`.
    /// It's removed once it does.
    pub fn stop_source(&mut self, id: NodeId, when: Seconds) -> Result<(), GraphError> {
        match self.node_kind_mut(id)? {
            NodeKind::BufferSource(state) => {
                state.stop_at = Some(when);
                if state.schedule.is_none() {
                    state.is_finished = true;
                }
                Ok(())
            }
            NodeKind::Oscillator(state) => {
                state.stop_at = Some(when);
                if state.start_at.is_none() {
                    state.is_finished = true;
                }
                Ok(())
            }
            other => Err(GraphError::WrongNodeType(id, other.node_type())),
        }
    }

    // Kahn's algorithm. An edge into a parameter is an edge into the node
    // that owns it.
    fn rebuild_order(&mut self) {
        self.node_inputs.clear();
        self.param_inputs.clear();
        let mut in_degree: FxHashMap<NodeId, usize> =
            self.nodes.keys().map(|id| (*id, 0)).collect();
        for (id, node) in self.nodes.iter() {
            for target in node.outputs.iter() {
                let owner = match target {
                    Target::Node(n) => {
                        self.node_inputs.entry(*n).or_default().push(*id);
                        *n
                    }
                    Target::Param(p) => {
                        self.param_inputs.entry(*p).or_default().push(*id);
                        match self.params.get(p) {
                            Some(slot) => slot.owner,
                            None => continue,
                        }
                    }
                };
                if let Some(degree) = in_degree.get_mut(&owner) {
                    *degree += 1;
                }
            }
        }

        let mut ready: Vec<NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        ready.sort_by_key(|id| id.0);
        let mut queue = VecDeque::from(ready);
        self.order.clear();
        while let Some(id) = queue.pop_front() {
            self.order.push(id);
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            for target in node.outputs.iter() {
                let owner = match target {
                    Target::Node(n) => Some(*n),
                    Target::Param(p) => self.params.get(p).map(|slot| slot.owner),
                };
                if let Some(owner) = owner {
                    if let Some(degree) = in_degree.get_mut(&owner) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(owner);
                        }
                    }
                }
            }
        }
        if self.order.len() != self.nodes.len() {
            warn!(
                "Graph has a cycle; {} of {} nodes will be skipped",
                self.nodes.len() - self.order.len(),
                self.nodes.len()
            );
        }
        self.is_order_dirty = false;
    }

    /// Fills `buffer` with the output of the destination node. A context that
    /// isn't running renders silence and its clock stays put.
    pub fn render(&mut self, buffer: &mut [StereoSample]) {
        if self.state != ContextState::Running {
            buffer.fill(StereoSample::SILENCE);
            return;
        }
        if self.is_order_dirty {
            self.rebuild_order();
        }

        let Self {
            sample_rate,
            frames_rendered,
            nodes,
            params,
            destination,
            order,
            node_inputs,
            param_inputs,
            frame_outputs,
            ..
        } = self;
        let sample_rate = *sample_rate;
        for frame in buffer.iter_mut() {
            let now = Seconds(*frames_rendered as f64 / f64::from(sample_rate));
            for id in order.iter() {
                let input = node_inputs
                    .get(id)
                    .map(|sources| {
                        sources.iter().fold(StereoSample::SILENCE, |acc, s| {
                            acc + frame_outputs.get(s).copied().unwrap_or_default()
                        })
                    })
                    .unwrap_or_default();
                let Some(node) = nodes.get_mut(id) else {
                    continue;
                };
                let mut param_value =
                    |p: ParamId| evaluate_param(params, param_inputs, frame_outputs, p, now);
                let output = match &mut node.kind {
                    NodeKind::Destination => input,
                    NodeKind::Gain { gain } => input * param_value(*gain),
                    NodeKind::StereoPanner { pan } => {
                        equal_power_pan(input, param_value(*pan))
                    }
                    NodeKind::Effect(effect) => effect.transform_frame(input),
                    NodeKind::BufferSource(state) => {
                        let rate = param_value(state.playback_rate)
                            * cents_to_ratio(param_value(state.detune));
                        state.next_frame(now, sample_rate, rate)
                    }
                    NodeKind::Oscillator(state) => {
                        let frequency = param_value(state.frequency);
                        let detune = param_value(state.detune);
                        state.next_frame(now, frequency, detune)
                    }
                    NodeKind::MediaElementSource(element) => element.next_frame(sample_rate),
                };
                frame_outputs.insert(*id, output);
            }
            *frame = frame_outputs.get(destination).copied().unwrap_or_default();
            *frames_rendered += 1;
        }

        let now = self.current_time();
        self.params
            .values_mut()
            .for_each(|slot| slot.param.advance_to(now));

        let mut finished: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.kind.is_finished())
            .map(|(id, _)| *id)
            .collect();
        finished.sort_by_key(|id| id.0);
        for id in finished {
            self.dispose_node(id);
            self.send_event(ContextEvent::Ended(id));
        }
    }
}

fn evaluate_param(
    params: &mut FxHashMap<ParamId, ParamSlot>,
    param_inputs: &FxHashMap<ParamId, Vec<NodeId>>,
    frame_outputs: &FxHashMap<NodeId, StereoSample>,
    id: ParamId,
    now: Seconds,
) -> ParameterType {
    let modulation: ParameterType = param_inputs
        .get(&id)
        .map(|sources| {
            sources
                .iter()
                .map(|s| Sample::from(frame_outputs.get(s).copied().unwrap_or_default()).0)
                .sum()
        })
        .unwrap_or_default();
    let Some(slot) = params.get_mut(&id) else {
        return ParameterType::default();
    };
    let value = (slot.param.value_at(now) + modulation)
        .clamp(slot.param.min_value(), slot.param.max_value());
    slot.computed = value;
    value
}
