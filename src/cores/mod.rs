// Copyright (c) 2024 Mike Tsao

//! Processing units without the graph plumbing around them. A core takes
//! samples in and gives samples out; the
//! [ProcessingContext](crate::graph::ProcessingContext) decides when.

pub use effects::*;
pub use oscillator::{Oscillator, OscillatorBuilder, Waveform};

mod effects;
mod oscillator;
