// Copyright (c) 2024 Mike Tsao

//! Hands frames rendered by an ensnare-routing
//! [AudioEngine](ensnare_routing::AudioEngine) to the platform's audio output.

#![deny(missing_docs)]

/// The most commonly used imports.
pub mod prelude {
    pub use super::ProvidesService;
    #[cfg(feature = "audio")]
    pub use super::{
        CpalAudioService, CpalAudioServiceEvent, CpalAudioServiceInput, CpalPlatform,
        EngineRenderer,
    };
}

#[cfg(feature = "audio")]
pub use audio::{
    AudioSampleType, AudioStereoSampleType, CpalAudioService, CpalAudioServiceEvent,
    CpalAudioServiceInput,
};
#[cfg(feature = "audio")]
pub use platform::CpalPlatform;
#[cfg(feature = "audio")]
pub use renderer::EngineRenderer;
pub use traits::ProvidesService;

#[cfg(feature = "audio")]
mod audio;
#[cfg(feature = "audio")]
mod platform;
#[cfg(feature = "audio")]
mod renderer;
mod traits;
