// Copyright (c) 2024 Mike Tsao

//! Mixing infrastructure built from graph nodes: wet/dry effect wrappers,
//! effect chains, auxiliary sends, buses, and the bus registry.

pub use {
    bus::Bus,
    buses::Buses,
    chain::EffectChain,
    effect::AudioEffect,
    send::{AuxSend, SendManager},
};

mod bus;
mod buses;
mod chain;
mod effect;
mod send;

use crate::{
    error::GraphError,
    graph::{ParamKind, ProcessingContext},
    types::{NodeId, ParamId},
};

// Every gain node has a gain parameter, so a miss means the node is gone.
pub(crate) fn gain_param(ctx: &ProcessingContext, node: NodeId) -> Result<ParamId, GraphError> {
    ctx.param_of(node, ParamKind::Gain)
        .ok_or(GraphError::UnknownNode(node))
}
