// Copyright (c) 2024 Mike Tsao

//! System utilities.

/// Commonly used imports.
pub mod prelude {
    pub use super::{AutoplayPolicy, CrossbeamChannel, EngineSettings};
}

pub use channels::CrossbeamChannel;
pub use settings::{AutoplayPolicy, EngineSettings};

mod channels;
mod settings;
