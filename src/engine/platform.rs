// Copyright (c) 2024 Mike Tsao

use crate::{error::PlatformError, types::SampleRate};
use core::fmt::Debug;

/// What the engine needs to know about the machine it's running on.
pub trait AudioPlatform: Debug {
    /// A short name for logs.
    fn name(&self) -> &str;

    /// Checks that audio output is possible. On success, returns the output
    /// device's sample rate if the platform knows it.
    fn probe(&self) -> Result<Option<SampleRate>, PlatformError>;
}

/// A platform without a device. Audio is produced only when the owner calls
/// [AudioEngine::render()](super::AudioEngine::render), which suits tests,
/// offline bouncing, and hosts that drive their own output.
#[derive(Debug, Default)]
pub struct OfflinePlatform {
    sample_rate: Option<SampleRate>,
}
impl OfflinePlatform {
    /// An offline platform that insists on `sample_rate`.
    pub fn new_with(sample_rate: SampleRate) -> Self {
        Self {
            sample_rate: Some(sample_rate),
        }
    }
}
impl AudioPlatform for OfflinePlatform {
    fn name(&self) -> &str {
        "offline"
    }

    fn probe(&self) -> Result<Option<SampleRate>, PlatformError> {
        Ok(self.sample_rate)
    }
}

/// A platform with no audio at all.
#[derive(Debug, Default)]
pub struct UnsupportedPlatform {}
impl AudioPlatform for UnsupportedPlatform {
    fn name(&self) -> &str {
        "unsupported"
    }

    fn probe(&self) -> Result<Option<SampleRate>, PlatformError> {
        Err(PlatformError::Unsupported)
    }
}
