// Copyright (c) 2024 Mike Tsao

#![warn(missing_docs)]
#![deny(unused_imports, unused_variables)]
#![allow(rustdoc::private_intra_doc_links)]

//! Ensnare routing gives a game (or any small interactive app) a mixing desk:
//! named buses with effect chains, panning, volume, and auxiliary sends; one-shot
//! samples, streamed music, and envelope-driven synth voices that feed them;
//! and an asset loader that decodes each file once.
//!
//! There are several ways in, depending on how much control you need.
//!
//! * *Easiest*: create an [AudioEngine], [init()](AudioEngine::init()) it, load
//! sounds and synths by name or URL, and play them. Forward user gestures to
//! [AudioEngine::handle_interaction()] so that audio can start on platforms that
//! require one.
//! * *More control*: build [Buses](routing::Buses), [EffectChains](routing::EffectChain),
//! and [sounds](sound) against a [ProcessingContext](graph::ProcessingContext)
//! yourself, and render frames from it in your own loop.
//! * *Most control*: wire [graph] nodes together directly, and use the
//! processing [cores] on their own.

/// A collection of imports that are useful to users of this crate. `use
/// ensnare_routing::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{traits::prelude::*, types::prelude::*};
}

pub use engine::AudioEngine;

pub mod cores;
pub mod engine;
pub mod error;
pub mod graph;
pub mod loading;
pub mod routing;
pub mod sound;
pub mod traits;
pub mod types;
pub mod util;
