// Copyright (c) 2024 Mike Tsao

//! Structs that hold configuration information about various parts of the
//! system. Intended to be serialized.

use crate::{
    engine::Interaction,
    graph::ContextSettings,
    sound::EnvelopeSettings,
    types::{Normal, SampleRate},
};
use anyhow::Context;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Whether a freshly created processing context may produce sound right away,
/// or must wait for a user gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoplayPolicy {
    /// The context starts running.
    Allowed,
    /// The context starts suspended and resumes on the first qualifying
    /// interaction.
    #[default]
    RequireGesture,
}

/// Contains persistent engine settings.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineSettings {
    sample_rate: SampleRate,
    autoplay_policy: AutoplayPolicy,
    resume_trigger: Interaction,
    #[derivative(Default(value = "PathBuf::from(\".\")"))]
    asset_root: PathBuf,
    master_volume: Normal,
    envelope: EnvelopeSettings,
}
impl EngineSettings {
    /// Parses settings from a JSON string. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parsing engine settings")
    }

    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine settings from {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json_string(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serializing engine settings")
    }

    /// The settings the processing context is created with.
    pub fn context_settings(&self) -> ContextSettings {
        ContextSettings {
            sample_rate: self.sample_rate,
            start_suspended: matches!(self.autoplay_policy, AutoplayPolicy::RequireGesture),
        }
    }

    #[allow(missing_docs)]
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }
    #[allow(missing_docs)]
    pub fn set_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
    }
    #[allow(missing_docs)]
    pub fn autoplay_policy(&self) -> AutoplayPolicy {
        self.autoplay_policy
    }
    #[allow(missing_docs)]
    pub fn set_autoplay_policy(&mut self, autoplay_policy: AutoplayPolicy) {
        self.autoplay_policy = autoplay_policy;
    }
    #[allow(missing_docs)]
    pub fn resume_trigger(&self) -> Interaction {
        self.resume_trigger
    }
    #[allow(missing_docs)]
    pub fn set_resume_trigger(&mut self, resume_trigger: Interaction) {
        self.resume_trigger = resume_trigger;
    }
    /// Relative asset URLs are resolved against this directory.
    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }
    #[allow(missing_docs)]
    pub fn set_asset_root(&mut self, asset_root: PathBuf) {
        self.asset_root = asset_root;
    }
    #[allow(missing_docs)]
    pub fn master_volume(&self) -> Normal {
        self.master_volume
    }
    #[allow(missing_docs)]
    pub fn set_master_volume(&mut self, master_volume: Normal) {
        self.master_volume = master_volume;
    }
    /// The envelope new synths start with.
    pub fn envelope(&self) -> &EnvelopeSettings {
        &self.envelope
    }
    #[allow(missing_docs)]
    pub fn set_envelope(&mut self, envelope: EnvelopeSettings) {
        self.envelope = envelope;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_reasonable() {
        let settings = EngineSettings::default();
        assert_eq!(settings.sample_rate(), SampleRate::DEFAULT);
        assert_eq!(settings.autoplay_policy(), AutoplayPolicy::RequireGesture);
        assert_eq!(settings.resume_trigger(), Interaction::PointerDown);
        assert_eq!(settings.master_volume(), Normal::maximum());
        assert!(settings.context_settings().start_suspended);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings = EngineSettings::from_json_str(
            r#"{ "sample-rate": 48000, "autoplay-policy": "allowed", "master-volume": 0.5 }"#,
        )
        .unwrap();
        assert_eq!(settings.sample_rate(), SampleRate::new(48000));
        assert_eq!(settings.autoplay_policy(), AutoplayPolicy::Allowed);
        assert_eq!(settings.master_volume(), Normal::new(0.5));
        assert_eq!(settings.envelope(), &EnvelopeSettings::default());
        assert!(!settings.context_settings().start_suspended);
    }

    #[test]
    fn json_round_trip_preserves_settings() {
        let mut settings = EngineSettings::default();
        settings.set_resume_trigger(Interaction::KeyDown);
        settings.set_asset_root(PathBuf::from("assets"));
        let json = settings.to_json_string().unwrap();
        assert_eq!(EngineSettings::from_json_str(&json).unwrap(), settings);
    }

    #[test]
    fn garbage_json_is_an_error() {
        assert!(EngineSettings::from_json_str("{ nope").is_err());
    }
}
