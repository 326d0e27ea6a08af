// Copyright (c) 2024 Mike Tsao

use cpal::traits::{DeviceTrait, HostTrait};
use ensnare_routing::{engine::AudioPlatform, error::PlatformError, types::SampleRate};

/// Reports whether cpal's default host has an output device, and at what
/// rate it runs, so that [AudioEngine](ensnare_routing::AudioEngine) renders
/// at the device's native rate.
#[derive(Debug, Default)]
pub struct CpalPlatform {}
impl AudioPlatform for CpalPlatform {
    fn name(&self) -> &str {
        "cpal"
    }

    fn probe(&self) -> Result<Option<SampleRate>, PlatformError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlatformError::Unsupported)?;
        let config = device
            .default_output_config()
            .map_err(|e| PlatformError::Device(e.to_string()))?;
        Ok(Some(SampleRate::new(config.sample_rate().0 as usize)))
    }
}
