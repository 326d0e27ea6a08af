// Copyright (c) 2024 Mike Tsao

//! The top-level facade: owns the processing context, the buses, and every
//! loaded sound, and is the only thing a game needs to talk to.

pub use interaction::Interaction;
pub use platform::{AudioPlatform, OfflinePlatform, UnsupportedPlatform};

mod interaction;
mod platform;

use crate::{
    cores::Effect,
    error::EngineError,
    graph::{ContextState, ProcessingContext, Target},
    loading::{AssetLoader, FileFetcher, SymphoniaDecoder},
    prelude::*,
    routing::Buses,
    sound::{MonoSynth, Music, Sound, SoundEffect, SynthOptions},
    util::EngineSettings,
};
use log::{error, info, warn};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Creates the processing context on demand and keeps registries of synths
/// (by name), one-shot sounds (by URL), and music (by URL). Loading something
/// that's already loaded hands back the existing instance.
///
/// Nothing works until [AudioEngine::init()] succeeds.
#[derive(Debug)]
pub struct AudioEngine {
    platform: Box<dyn AudioPlatform>,
    settings: EngineSettings,
    loader: AssetLoader,

    context: Option<ProcessingContext>,
    buses: Option<Buses>,

    synths: FxHashMap<String, MonoSynth>,
    sounds: FxHashMap<String, SoundEffect>,
    music: FxHashMap<String, Music>,

    // Set while a suspended context is waiting for a user gesture.
    interaction_hook: Option<Interaction>,
}
impl Default for AudioEngine {
    fn default() -> Self {
        Self::new_with(Box::<OfflinePlatform>::default(), EngineSettings::default())
    }
}
impl AudioEngine {
    /// An engine that hasn't touched the platform yet. Assets are read from
    /// the settings' asset root and decoded with symphonia.
    pub fn new_with(platform: Box<dyn AudioPlatform>, settings: EngineSettings) -> Self {
        let loader = AssetLoader::new_with(
            Arc::new(FileFetcher::new_with(settings.asset_root())),
            Arc::new(SymphoniaDecoder::default()),
        );
        Self {
            platform,
            settings,
            loader,
            context: None,
            buses: None,
            synths: Default::default(),
            sounds: Default::default(),
            music: Default::default(),
            interaction_hook: None,
        }
    }

    /// Replaces the asset loader. Do this before loading anything.
    pub fn set_loader(&mut self, loader: AssetLoader) {
        self.loader = loader;
    }

    #[allow(missing_docs)]
    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    #[allow(missing_docs)]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Creates the processing context and the master bus. Returns false,
    /// having changed nothing, if the platform can't make sound. Calling it
    /// again after it has succeeded does nothing and returns true.
    pub fn init(&mut self) -> bool {
        if self.is_initialized() {
            return true;
        }
        let sample_rate = match self.platform.probe() {
            Ok(sample_rate) => sample_rate,
            Err(e) => {
                error!("Audio isn't available on {}: {e}", self.platform.name());
                return false;
            }
        };

        let mut context_settings = self.settings.context_settings();
        if let Some(sample_rate) = sample_rate {
            context_settings.sample_rate = sample_rate;
        }
        let mut ctx = ProcessingContext::new_with(context_settings);
        let buses = match Buses::new_with(&mut ctx, None) {
            Ok(buses) => buses,
            Err(e) => {
                error!("Couldn't build the master bus: {e}");
                return false;
            }
        };
        if let Err(e) = buses.master().set_volume(&mut ctx, self.settings.master_volume()) {
            warn!("Couldn't set the master volume: {e}");
        }
        info!(
            "Created a {} Hz processing context on {}",
            ctx.sample_rate().0,
            self.platform.name()
        );
        if ctx.state() == ContextState::Suspended {
            self.interaction_hook = Some(self.settings.resume_trigger());
        }
        self.context = Some(ctx);
        self.buses = Some(buses);
        true
    }

    #[allow(missing_docs)]
    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    #[allow(missing_docs)]
    pub fn context(&self) -> Option<&ProcessingContext> {
        self.context.as_ref()
    }

    #[allow(missing_docs)]
    pub fn context_mut(&mut self) -> Option<&mut ProcessingContext> {
        self.context.as_mut()
    }

    #[allow(missing_docs)]
    pub fn buses(&self) -> Option<&Buses> {
        self.buses.as_ref()
    }

    #[allow(missing_docs)]
    pub fn buses_mut(&mut self) -> Option<&mut Buses> {
        self.buses.as_mut()
    }

    /// Whether the engine is still waiting for a gesture to resume audio.
    pub fn has_interaction_hook(&self) -> bool {
        self.interaction_hook.is_some()
    }

    /// Forwards a user gesture. If the engine is waiting for this kind of
    /// gesture, it resumes the context and stops waiting. Returns whether the
    /// context was resumed.
    pub fn handle_interaction(&mut self, interaction: Interaction) -> bool {
        if self.interaction_hook != Some(interaction) {
            return false;
        }
        let Some(ctx) = self.context.as_mut() else {
            return false;
        };
        match ctx.resume() {
            Ok(_) => {
                info!("Resumed the processing context on {interaction}");
                self.interaction_hook = None;
                true
            }
            Err(e) => {
                warn!("Failed to resume the processing context: {e}");
                false
            }
        }
    }

    fn bus_target(buses: &Buses, bus: Option<&str>) -> Result<Target, EngineError> {
        let key = bus.unwrap_or(Buses::MASTER);
        buses
            .get(key)
            .map(|b| Target::Node(b.input()))
            .ok_or_else(|| EngineError::BusNotFound(key.to_string()))
    }

    /// Adds a bus feeding `target`, another bus, or the master bus if
    /// `target` is `None`.
    pub fn create_bus(&mut self, key: &str, target: Option<&str>) -> Result<(), EngineError> {
        let (Some(ctx), Some(buses)) = (self.context.as_mut(), self.buses.as_mut()) else {
            return Err(EngineError::NotInitialized);
        };
        let target = target
            .map(|t| Self::bus_target(buses, Some(t)))
            .transpose()?;
        buses.create(ctx, key, target)?;
        Ok(())
    }

    /// Removes a bus. Sounds that fed it go quiet until they're reconnected.
    pub fn remove_bus(&mut self, key: &str) -> bool {
        match (self.context.as_mut(), self.buses.as_mut()) {
            (Some(ctx), Some(buses)) => buses.remove(ctx, key),
            _ => false,
        }
    }

    #[allow(missing_docs)]
    pub fn set_bus_volume(&mut self, bus: &str, volume: Normal) -> Result<(), EngineError> {
        let (Some(ctx), Some(buses)) = (self.context.as_mut(), self.buses.as_ref()) else {
            return Err(EngineError::NotInitialized);
        };
        let bus = buses
            .get(bus)
            .ok_or_else(|| EngineError::BusNotFound(bus.to_string()))?;
        Ok(bus.set_volume(ctx, volume)?)
    }

    #[allow(missing_docs)]
    pub fn set_bus_pan(&mut self, bus: &str, pan: BipolarNormal) -> Result<(), EngineError> {
        let (Some(ctx), Some(buses)) = (self.context.as_mut(), self.buses.as_ref()) else {
            return Err(EngineError::NotInitialized);
        };
        let bus = buses
            .get(bus)
            .ok_or_else(|| EngineError::BusNotFound(bus.to_string()))?;
        Ok(bus.set_pan(ctx, pan)?)
    }

    /// Appends `effect` to a bus's effect chain.
    pub fn add_bus_effect(&mut self, bus: &str, effect: Effect) -> Result<(), EngineError> {
        let (Some(ctx), Some(buses)) = (self.context.as_mut(), self.buses.as_mut()) else {
            return Err(EngineError::NotInitialized);
        };
        let bus = buses
            .get_mut(bus)
            .ok_or_else(|| EngineError::BusNotFound(bus.to_string()))?;
        Ok(bus.effects_mut().push(ctx, effect)?)
    }

    /// Creates a synth named `name` feeding `bus`, or returns the existing one
    /// if the name is taken. New synths start with the settings' envelope.
    pub fn load_synth(
        &mut self,
        name: &str,
        bus: &str,
        options: &SynthOptions,
    ) -> Result<&mut MonoSynth, EngineError> {
        let (Some(ctx), Some(buses)) = (self.context.as_mut(), self.buses.as_ref()) else {
            return Err(EngineError::NotInitialized);
        };
        if !self.synths.contains_key(name) {
            let target = Self::bus_target(buses, Some(bus))?;
            let synth = MonoSynth::new_with(
                ctx,
                Some(target),
                options,
                self.settings.envelope().clone(),
            )?;
            self.synths.insert(name.to_string(), synth);
        }
        self.synths
            .get_mut(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }

    /// Loads the sample at `url` into a sound feeding `bus` (the master bus if
    /// `None`), or returns the sound already loaded from `url`. A failed load
    /// leaves nothing behind, so it can be retried.
    pub async fn load_sound(
        &mut self,
        url: &str,
        bus: Option<&str>,
    ) -> Result<&mut SoundEffect, EngineError> {
        if !self.sounds.contains_key(url) {
            let (Some(ctx), Some(buses)) = (self.context.as_mut(), self.buses.as_ref()) else {
                return Err(EngineError::NotInitialized);
            };
            let target = Self::bus_target(buses, bus)?;
            let mut sound = SoundEffect::new_with(ctx, Some(target), Default::default())?;
            if let Err(e) = sound.load(&self.loader, url).await {
                sound.dispose(ctx);
                return Err(e.into());
            }
            self.sounds.insert(url.to_string(), sound);
        }
        self.sounds
            .get_mut(url)
            .ok_or_else(|| EngineError::NotFound(url.to_string()))
    }

    /// Prepares the track at `url` to stream into `bus` (the master bus if
    /// `None`), or returns the one already prepared. Nothing is fetched until
    /// it's first played.
    pub fn load_music(&mut self, url: &str, bus: Option<&str>) -> Result<&mut Music, EngineError> {
        let (Some(ctx), Some(buses)) = (self.context.as_mut(), self.buses.as_ref()) else {
            return Err(EngineError::NotInitialized);
        };
        if !self.music.contains_key(url) {
            let target = Self::bus_target(buses, bus)?;
            let mut music = Music::new_with(ctx, Some(target))?;
            music.load(ctx, url);
            self.music.insert(url.to_string(), music);
        }
        self.music
            .get_mut(url)
            .ok_or_else(|| EngineError::NotFound(url.to_string()))
    }

    /// Looks a synth up. This never creates one.
    pub fn get_synth(&self, name: &str) -> Option<&MonoSynth> {
        self.synths.get(name)
    }

    #[allow(missing_docs)]
    pub fn get_synth_mut(&mut self, name: &str) -> Option<&mut MonoSynth> {
        self.synths.get_mut(name)
    }

    #[allow(missing_docs)]
    pub fn get_sound(&self, url: &str) -> Option<&SoundEffect> {
        self.sounds.get(url)
    }

    #[allow(missing_docs)]
    pub fn get_sound_mut(&mut self, url: &str) -> Option<&mut SoundEffect> {
        self.sounds.get_mut(url)
    }

    #[allow(missing_docs)]
    pub fn get_music(&self, url: &str) -> Option<&Music> {
        self.music.get(url)
    }

    #[allow(missing_docs)]
    pub fn get_music_mut(&mut self, url: &str) -> Option<&mut Music> {
        self.music.get_mut(url)
    }

    /// Sounds the named synth `when` from now.
    pub fn play_synth(&mut self, name: &str, when: Seconds) -> Result<(), EngineError> {
        let ctx = self.context.as_mut().ok_or(EngineError::NotInitialized)?;
        let synth = self
            .synths
            .get_mut(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        synth.play(ctx, when);
        Ok(())
    }

    /// Starts a new voice of the sound loaded from `url`.
    pub fn play_sound(
        &mut self,
        url: &str,
        when: Seconds,
        offset: Seconds,
        duration: Option<Seconds>,
    ) -> Result<NodeId, EngineError> {
        let ctx = self.context.as_mut().ok_or(EngineError::NotInitialized)?;
        let sound = self
            .sounds
            .get_mut(url)
            .ok_or_else(|| EngineError::NotFound(url.to_string()))?;
        Ok(sound.play(ctx, when, offset, duration)?)
    }

    /// Starts (or continues) the track prepared from `url`, fetching it first
    /// if necessary.
    pub async fn play_music(&mut self, url: &str) -> Result<NodeId, EngineError> {
        let ctx = self.context.as_mut().ok_or(EngineError::NotInitialized)?;
        let music = self
            .music
            .get_mut(url)
            .ok_or_else(|| EngineError::NotFound(url.to_string()))?;
        Ok(music.play(ctx, &self.loader).await?)
    }

    /// Stops the track and rewinds it.
    pub fn stop_music(&mut self, url: &str) -> Result<(), EngineError> {
        let ctx = self.context.as_mut().ok_or(EngineError::NotInitialized)?;
        let music = self
            .music
            .get_mut(url)
            .ok_or_else(|| EngineError::NotFound(url.to_string()))?;
        music.stop(ctx);
        Ok(())
    }

    /// Disposes of a synth and forgets its name.
    pub fn remove_synth(&mut self, name: &str) -> bool {
        match (self.context.as_mut(), self.synths.remove(name)) {
            (Some(ctx), Some(synth)) => {
                synth.dispose(ctx);
                true
            }
            _ => false,
        }
    }

    /// Disposes of a sound. Its buffer stays in the loader's cache.
    pub fn remove_sound(&mut self, url: &str) -> bool {
        match (self.context.as_mut(), self.sounds.remove(url)) {
            (Some(ctx), Some(sound)) => {
                sound.dispose(ctx);
                true
            }
            _ => false,
        }
    }

    #[allow(missing_docs)]
    pub fn remove_music(&mut self, url: &str) -> bool {
        match (self.context.as_mut(), self.music.remove(url)) {
            (Some(ctx), Some(music)) => {
                music.dispose(ctx);
                true
            }
            _ => false,
        }
    }

    /// Fills `frames` from the master bus. Before [AudioEngine::init()], and
    /// while the context is suspended, that's silence.
    pub fn render(&mut self, frames: &mut [StereoSample]) {
        match self.context.as_mut() {
            Some(ctx) => ctx.render(frames),
            None => frames.fill(StereoSample::SILENCE),
        }
    }

    /// Tears everything down and closes the context for good.
    pub fn dispose(mut self) {
        let Some(mut ctx) = self.context.take() else {
            return;
        };
        for (_, synth) in self.synths.drain() {
            synth.dispose(&mut ctx);
        }
        for (_, sound) in self.sounds.drain() {
            sound.dispose(&mut ctx);
        }
        for (_, music) in self.music.drain() {
            music.dispose(&mut ctx);
        }
        if let Some(buses) = self.buses.take() {
            buses.dispose(&mut ctx);
        }
        self.interaction_hook = None;
        ctx.close();
        info!("Closed the processing context");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::AutoplayPolicy;

    fn allowed_settings() -> EngineSettings {
        let mut settings = EngineSettings::default();
        settings.set_autoplay_policy(AutoplayPolicy::Allowed);
        settings
    }

    #[test]
    fn unsupported_platform_fails_quietly() {
        let mut engine = AudioEngine::new_with(
            Box::<UnsupportedPlatform>::default(),
            EngineSettings::default(),
        );
        assert!(!engine.init());
        assert!(!engine.is_initialized());
        assert!(engine.buses().is_none());
        assert!(!engine.has_interaction_hook());
        assert_eq!(
            engine.create_bus("fx", None),
            Err(EngineError::NotInitialized)
        );
    }

    #[test]
    fn init_is_idempotent() {
        let mut engine = AudioEngine::default();
        assert!(engine.init());
        let master = engine.buses().unwrap().master().input();
        assert!(engine.init());
        assert_eq!(engine.buses().unwrap().master().input(), master);
    }

    #[test]
    fn platform_sample_rate_wins() {
        let mut engine = AudioEngine::new_with(
            Box::new(OfflinePlatform::new_with(SampleRate::new(48000))),
            EngineSettings::default(),
        );
        assert!(engine.init());
        assert_eq!(
            engine.context().unwrap().sample_rate(),
            SampleRate::new(48000)
        );
    }

    #[test]
    fn interaction_hook_resumes_once() {
        let mut engine = AudioEngine::default();
        assert!(engine.init());
        assert_eq!(engine.context().unwrap().state(), ContextState::Suspended);
        assert!(engine.has_interaction_hook());

        assert!(!engine.handle_interaction(Interaction::KeyDown));
        assert!(engine.has_interaction_hook());

        assert!(engine.handle_interaction(Interaction::PointerDown));
        assert!(!engine.has_interaction_hook());
        assert_eq!(engine.context().unwrap().state(), ContextState::Running);
        assert!(!engine.handle_interaction(Interaction::PointerDown));
    }

    #[test]
    fn no_hook_when_autoplay_is_allowed() {
        let mut engine = AudioEngine::new_with(Box::<OfflinePlatform>::default(), allowed_settings());
        assert!(engine.init());
        assert!(!engine.has_interaction_hook());
        assert_eq!(engine.context().unwrap().state(), ContextState::Running);
    }

    #[test]
    fn load_synth_is_idempotent() {
        let mut engine = AudioEngine::default();
        engine.init();
        let options = SynthOptions {
            frequency: FrequencyHz(440.0),
            ..Default::default()
        };
        let first: *const MonoSynth = engine.load_synth("lead", "master", &options).unwrap();
        let count = engine.context().unwrap().node_count();
        let second: *const MonoSynth = engine.load_synth("lead", "master", &options).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.context().unwrap().node_count(), count);
        assert!(std::ptr::eq(first, engine.get_synth("lead").unwrap()));
        assert!(engine.get_synth("bass").is_none());
    }

    #[test]
    fn load_synth_needs_a_real_bus() {
        let mut engine = AudioEngine::default();
        engine.init();
        assert_eq!(
            engine
                .load_synth("lead", "nope", &SynthOptions::default())
                .map(|_| ()),
            Err(EngineError::BusNotFound("nope".to_string()))
        );
        assert!(engine.get_synth("lead").is_none());
    }

    #[test]
    fn bus_volume_and_pan() {
        let mut engine = AudioEngine::default();
        engine.init();
        engine.create_bus("sfx", None).unwrap();
        engine.set_bus_volume("sfx", Normal::new(0.5)).unwrap();
        engine.set_bus_pan("sfx", BipolarNormal::new(0.25)).unwrap();

        let bus = engine.buses().unwrap().get("sfx").unwrap();
        let ctx = engine.context().unwrap();
        assert_eq!(ctx.param(bus.post_gain_param()).unwrap().value(), 0.5);
        assert_eq!(ctx.param(bus.pan_param()).unwrap().value(), 0.25);

        assert_eq!(
            engine.set_bus_volume("nope", Normal::new(0.5)),
            Err(EngineError::BusNotFound("nope".to_string()))
        );
    }

    #[test]
    fn synth_reaches_the_output() {
        let mut engine = AudioEngine::new_with(Box::<OfflinePlatform>::default(), allowed_settings());
        engine.init();
        engine
            .load_synth("lead", "master", &SynthOptions::default())
            .unwrap();
        engine.play_synth("lead", Seconds::zero()).unwrap();
        let mut frames = vec![StereoSample::SILENCE; 4410];
        engine.render(&mut frames);
        assert!(frames.iter().any(|f| !f.is_silent()));
        assert!(matches!(
            engine.play_synth("bass", Seconds::zero()),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn render_before_init_is_silent() {
        let mut engine = AudioEngine::default();
        let mut frames = [StereoSample::from(0.5); 8];
        engine.render(&mut frames);
        assert!(frames.iter().all(|f| f.is_silent()));
    }

    #[test]
    fn dispose_closes_the_context() {
        let mut engine = AudioEngine::default();
        engine.init();
        engine
            .load_synth("lead", "master", &SynthOptions::default())
            .unwrap();
        engine.load_music("theme.ogg", None).unwrap();
        assert!(engine.remove_music("theme.ogg"));
        assert!(!engine.remove_music("theme.ogg"));
        engine.dispose();
    }
}
