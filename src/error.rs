// Copyright (c) 2024 Mike Tsao

//! Error types. Each layer of the system has its own, and the higher layers
//! wrap the lower ones.

use crate::{
    cores::EffectKind,
    graph::NodeType,
    types::{NodeId, ParamId},
};
use thiserror::Error;

/// Problems with edits to the processing graph.
#[derive(Clone, Debug, Error, PartialEq)]
#[allow(missing_docs)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("parameter {0} does not exist")]
    UnknownParam(ParamId),
    #[error("connecting node {0} to {1} would create a cycle")]
    WouldCycle(NodeId, NodeId),
    #[error("the destination node can't be used as a source")]
    DestinationIsSink,
    #[error("node {0} is a {1}, which doesn't support that operation")]
    WrongNodeType(NodeId, NodeType),
    #[error("source node {0} has already been started")]
    AlreadyStarted(NodeId),
    #[error("the processing context is closed")]
    Closed,
}

/// Problems with buses, chains, and sends.
#[derive(Clone, Debug, Error, PartialEq)]
#[allow(missing_docs)]
pub enum RoutingError {
    #[error("a bus named '{0}' already exists")]
    DuplicateBus(String),
    #[error("no effect of kind {0} in the chain")]
    EffectNotFound(EffectKind),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Problems fetching or decoding an asset.
#[derive(Clone, Debug, Error, PartialEq)]
#[allow(missing_docs)]
pub enum LoadError {
    #[error("couldn't fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },
    #[error("couldn't decode '{url}': {reason}")]
    Decode { url: String, reason: String },
    #[error("the load task for '{0}' was interrupted")]
    Interrupted(String),
}

/// Problems starting playback.
#[derive(Clone, Debug, Error, PartialEq)]
#[allow(missing_docs)]
pub enum PlaybackError {
    #[error("the sound has no buffer loaded")]
    NotLoaded,
    #[error("no media source has been set")]
    NoSource,
    #[error("playback isn't allowed until the context is running")]
    NotAllowed,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Problems talking to the platform's audio output.
#[derive(Clone, Debug, Error, PartialEq)]
#[allow(missing_docs)]
pub enum PlatformError {
    #[error("audio output is not supported on this platform")]
    Unsupported,
    #[error("audio device failure: {0}")]
    Device(String),
}

/// Everything that [AudioEngine](crate::engine::AudioEngine) can report.
#[derive(Clone, Debug, Error, PartialEq)]
#[allow(missing_docs)]
pub enum EngineError {
    #[error("the audio engine hasn't been initialized")]
    NotInitialized,
    #[error("no bus named '{0}'")]
    BusNotFound(String),
    #[error("nothing loaded under '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}
