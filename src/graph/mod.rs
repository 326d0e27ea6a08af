// Copyright (c) 2024 Mike Tsao

//! The processing graph: a [ProcessingContext] that owns nodes and their
//! automatable parameters, renders them in topological order, and keeps the
//! clock that automation is scheduled against.

pub use {
    buffer::AudioBuffer,
    context::{ContextEvent, ContextSettings, ContextState, ProcessingContext},
    media::MediaElement,
    node::{BufferSourceOptions, NodeType, OscillatorOptions, ParamKind, Target},
    param::{AudioParam, AutomationEvent},
};

mod buffer;
mod context;
mod media;
mod node;
mod param;
