// Copyright (c) 2024 Mike Tsao

use ensnare_routing::{
    engine::{Interaction, OfflinePlatform, UnsupportedPlatform},
    error::{EngineError, LoadError, PlaybackError},
    graph::{ContextEvent, ContextState, ProcessingContext},
    loading::{AssetLoader, MemoryFetcher, WavDecoder},
    prelude::*,
    sound::SynthOptions,
    util::{AutoplayPolicy, EngineSettings},
    AudioEngine,
};
use float_cmp::approx_eq;
use std::sync::Arc;

fn wav(frames: usize, value: i16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::default());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn engine(policy: AutoplayPolicy) -> AudioEngine {
    let mut settings = EngineSettings::default();
    settings.set_autoplay_policy(policy);
    let mut engine = AudioEngine::new_with(Box::<OfflinePlatform>::default(), settings);
    engine.set_loader(AssetLoader::new_with(
        Arc::new(
            MemoryFetcher::default()
                .with_asset("sfx/hit.wav", wav(441, 16384))
                .with_asset("music/theme.wav", wav(44100, 8192)),
        ),
        Arc::new(WavDecoder::default()),
    ));
    assert!(engine.init());
    engine
}

#[test]
fn no_audio_means_no_engine() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = AudioEngine::new_with(
        Box::<UnsupportedPlatform>::default(),
        EngineSettings::default(),
    );
    assert!(!engine.init());
    assert!(engine.buses().is_none());
    assert!(engine.context().is_none());
    assert!(matches!(
        engine.load_synth("lead", "master", &SynthOptions::default()),
        Err(EngineError::NotInitialized)
    ));
}

#[test]
fn gesture_unlocks_audio() {
    let mut engine = engine(AutoplayPolicy::RequireGesture);
    engine
        .load_synth("lead", "master", &SynthOptions::default())
        .unwrap();
    engine.play_synth("lead", Seconds::zero()).unwrap();

    let mut frames = vec![StereoSample::SILENCE; 4410];
    engine.render(&mut frames);
    assert!(frames.iter().all(|f| f.is_silent()));
    assert_eq!(engine.context().unwrap().current_time(), Seconds::zero());

    assert!(engine.handle_interaction(Interaction::PointerDown));
    assert!(!engine.has_interaction_hook());
    let events = engine.context().unwrap().events();
    assert!(events
        .try_iter()
        .any(|e| e == ContextEvent::StateChanged(ContextState::Running)));

    // The note was scheduled before the resume, relative to a clock that
    // hadn't moved, so it sounds now.
    engine.render(&mut frames);
    assert!(frames.iter().any(|f| !f.is_silent()));
}

#[tokio::test]
async fn sounds_load_once_and_play_polyphonically() {
    let mut engine = engine(AutoplayPolicy::Allowed);
    engine.create_bus("sfx", None).unwrap();
    let first: *const _ = engine.load_sound("sfx/hit.wav", Some("sfx")).await.unwrap();
    let second: *const _ = engine.load_sound("sfx/hit.wav", Some("sfx")).await.unwrap();
    assert_eq!(first, second);
    assert!(engine.loader().is_cached("sfx/hit.wav"));

    let a = engine
        .play_sound("sfx/hit.wav", Seconds::zero(), Seconds::zero(), None)
        .unwrap();
    let b = engine
        .play_sound("sfx/hit.wav", Seconds::zero(), Seconds::zero(), None)
        .unwrap();
    assert_ne!(a, b);

    let mut frames = [StereoSample::SILENCE; 64];
    engine.render(&mut frames);
    let ctx = engine.context().unwrap();
    assert!(ctx.contains(a) && ctx.contains(b));
    // Two overlapping voices of 0.5 each.
    assert!(frames.iter().all(|f| approx_eq!(f64, f.0 .0, 1.0, epsilon = 1e-9)));
}

#[tokio::test]
async fn long_sessions_of_one_shots_stay_bounded() {
    let mut engine = engine(AutoplayPolicy::Allowed);
    engine.load_sound("sfx/hit.wav", None).await.unwrap();
    let count = engine.context().unwrap().node_count();

    let mut frames = [StereoSample::SILENCE; 64];
    for _ in 0..5000 {
        engine
            .play_sound("sfx/hit.wav", Seconds::zero(), Seconds::zero(), None)
            .unwrap();
        engine.render(&mut frames);
    }
    // Let the last voices run out.
    for _ in 0..10 {
        engine.render(&mut frames);
    }

    let ctx = engine.context().unwrap();
    assert_eq!(ctx.node_count(), count);
    assert!(ctx.events().len() <= ProcessingContext::EVENT_CAPACITY);
}

#[tokio::test]
async fn failed_sound_loads_can_be_retried() {
    let mut engine = engine(AutoplayPolicy::Allowed);
    let count = engine.context().unwrap().node_count();
    assert!(matches!(
        engine.load_sound("sfx/missing.wav", None).await,
        Err(EngineError::Load(LoadError::Fetch { .. }))
    ));
    assert!(engine.get_sound("sfx/missing.wav").is_none());
    assert_eq!(engine.context().unwrap().node_count(), count);

    assert!(matches!(
        engine.load_sound("sfx/hit.wav", Some("nope")).await,
        Err(EngineError::BusNotFound(_))
    ));
}

#[tokio::test]
async fn music_streams_after_a_gesture() {
    let mut engine = engine(AutoplayPolicy::RequireGesture);
    engine.load_music("music/theme.wav", None).unwrap();
    assert!(matches!(
        engine.play_music("music/theme.wav").await,
        Err(EngineError::Playback(PlaybackError::NotAllowed))
    ));
    assert!(!engine.loader().is_cached("music/theme.wav"));

    assert!(engine.handle_interaction(Interaction::PointerDown));
    engine.play_music("music/theme.wav").await.unwrap();
    let mut frames = [StereoSample::SILENCE; 32];
    engine.render(&mut frames);
    assert!(frames.iter().all(|f| approx_eq!(f64, f.0 .0, 0.25, epsilon = 1e-9)));

    engine.stop_music("music/theme.wav").unwrap();
    engine.render(&mut frames);
    assert!(frames.iter().all(|f| f.is_silent()));
    assert!(engine.get_music("music/theme.wav").is_some());
}

#[test]
fn bus_controls_shape_the_mix() {
    let mut engine = engine(AutoplayPolicy::Allowed);
    engine.create_bus("synths", None).unwrap();
    assert!(matches!(
        engine.create_bus("synths", None),
        Err(EngineError::Routing(_))
    ));
    engine
        .load_synth("lead", "synths", &SynthOptions::default())
        .unwrap();
    engine.set_bus_volume("synths", Normal::minimum()).unwrap();
    engine.play_synth("lead", Seconds::zero()).unwrap();

    let mut frames = vec![StereoSample::SILENCE; 4410];
    engine.render(&mut frames);
    assert!(frames.iter().all(|f| f.is_silent()));

    engine.set_bus_volume("synths", Normal::maximum()).unwrap();
    engine.set_bus_pan("synths", BipolarNormal::minimum()).unwrap();
    engine.play_synth("lead", Seconds::zero()).unwrap();
    engine.render(&mut frames);
    assert!(frames.iter().any(|f| f.0 .0 != 0.0));
    assert!(frames.iter().all(|f| approx_eq!(f64, f.1 .0, 0.0, epsilon = 1e-9)));
}
