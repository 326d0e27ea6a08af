// Copyright (c) 2024 Mike Tsao

use crate::{AudioSampleType, AudioStereoSampleType, CpalAudioServiceInput};
use ensnare_routing::{types::StereoSample, AudioEngine};
use std::sync::Arc;

/// Turns [CpalAudioServiceEvent::FramesNeeded](crate::CpalAudioServiceEvent)
/// requests into frames rendered by an [AudioEngine].
#[derive(Debug, Default)]
pub struct EngineRenderer {
    buffer: Vec<StereoSample>,
}
impl EngineRenderer {
    /// Renders `frame_count` frames and packages them for the service.
    pub fn render(&mut self, engine: &mut AudioEngine, frame_count: usize) -> CpalAudioServiceInput {
        self.buffer.clear();
        self.buffer.resize(frame_count, StereoSample::SILENCE);
        engine.render(&mut self.buffer);
        CpalAudioServiceInput::Frames(Arc::new(
            self.buffer.iter().map(|frame| Self::convert(*frame)).collect(),
        ))
    }

    fn convert(frame: StereoSample) -> AudioStereoSampleType {
        (
            frame.0 .0 as AudioSampleType,
            frame.1 .0 as AudioSampleType,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensnare_routing::{
        engine::OfflinePlatform,
        sound::SynthOptions,
        types::Seconds,
        util::{AutoplayPolicy, EngineSettings},
    };

    #[test]
    fn renders_the_requested_frame_count() {
        let mut settings = EngineSettings::default();
        settings.set_autoplay_policy(AutoplayPolicy::Allowed);
        let mut engine = AudioEngine::new_with(Box::<OfflinePlatform>::default(), settings);
        assert!(engine.init());
        engine
            .load_synth("beep", "master", &SynthOptions::default())
            .unwrap();
        engine.play_synth("beep", Seconds::zero()).unwrap();

        let mut renderer = EngineRenderer::default();
        let CpalAudioServiceInput::Frames(frames) = renderer.render(&mut engine, 2048) else {
            panic!("expected frames");
        };
        assert_eq!(frames.len(), 2048);
        assert!(frames.iter().any(|(l, r)| *l != 0.0 && *r != 0.0));
    }
}
