// Copyright (c) 2024 Mike Tsao

//! Plays a short arpeggio on a synth through the default output device.

use clap::Parser;
use ensnare_routing::{
    cores::{ReverbCore, Waveform},
    prelude::*,
    routing::Buses,
    sound::{EnvelopeUpdate, SynthOptions},
    util::{AutoplayPolicy, EngineSettings},
    AudioEngine,
};
use ensnare_routing_services::prelude::*;

#[derive(clap::Parser, Debug)]
#[clap(author, about, long_about = None)]
struct Args {
    /// The root note's frequency
    #[clap(short = 'f', long, value_parser, default_value_t = 440.0)]
    frequency: f64,

    /// Add reverb to the master bus
    #[clap(short = 'r', long, value_parser)]
    reverb: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = EngineSettings::default();
    settings.set_autoplay_policy(AutoplayPolicy::Allowed);
    let mut engine = AudioEngine::new_with(Box::<CpalPlatform>::default(), settings);
    if !engine.init() {
        return Err(anyhow::anyhow!("No audio output is available"));
    }

    if args.reverb {
        engine.add_bus_effect(Buses::MASTER, ReverbCore::default().into())?;
    }

    let ratios = [1.0, 1.25, 1.5, 2.0];
    for (i, ratio) in ratios.iter().enumerate() {
        let synth = engine.load_synth(
            &format!("voice-{i}"),
            "master",
            &SynthOptions {
                waveform: Waveform::Triangle,
                frequency: FrequencyHz(args.frequency * ratio),
                ..Default::default()
            },
        )?;
        synth.envelope_mut().set(&EnvelopeUpdate {
            attack_time: Some(Seconds(0.01)),
            sustain_level: Some(0.2),
            release_time: Some(Seconds(1.0)),
            ..Default::default()
        });
        engine.play_synth(&format!("voice-{i}"), Seconds(0.25 * i as f64))?;
    }

    let service = CpalAudioService::new_with(None)?;
    let sender = service.sender().clone();
    let receiver = service.receiver().clone();
    let mut renderer = EngineRenderer::default();
    let mut frames_sent = 0;

    while let Ok(event) = receiver.recv() {
        match event {
            CpalAudioServiceEvent::Reset(sample_rate, channel_count) => {
                println!("Playing {channel_count} channels at {sample_rate}Hz");
            }
            CpalAudioServiceEvent::FramesNeeded(count) => {
                let _ = sender.send(renderer.render(&mut engine, count));
                frames_sent += count;
                if frames_sent > service.sample_rate() * 3 {
                    break;
                }
            }
            CpalAudioServiceEvent::Underrun => log::debug!("buffer underrun"),
            CpalAudioServiceEvent::Failed(e) => return Err(anyhow::anyhow!(e)),
        }
    }
    engine.dispose();
    Ok(())
}
