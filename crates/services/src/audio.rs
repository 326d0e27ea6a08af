// Copyright (c) 2024 Mike Tsao

//! [CpalAudioService] feeds the [cpal](https://crates.io/crates/cpal) output
//! stream from a ring buffer and asks its client for more frames over a
//! crossbeam channel.

use crate::ProvidesService;
use core::fmt::Debug;
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, FromSample, Sample as CpalSample, SizedSample, Stream, StreamConfig,
    SupportedStreamConfig,
};
use crossbeam::{
    channel::{Receiver, Sender},
    queue::ArrayQueue,
};
use delegate::delegate;
use ensnare_routing::util::CrossbeamChannel;
use std::sync::Arc;

/// The sample type the service hands to cpal.
pub type AudioSampleType = f32;
/// (left channel, right channel)
pub type AudioStereoSampleType = (AudioSampleType, AudioSampleType);

// Frames waiting for the output stream.
#[derive(Clone, Debug)]
struct FrameQueue(Arc<ArrayQueue<AudioStereoSampleType>>);
impl FrameQueue {
    fn new_with(capacity: usize) -> Self {
        Self(Arc::new(ArrayQueue::new(capacity.max(1))))
    }

    delegate! {
        to self.0 {
            fn len(&self) -> usize;
            fn capacity(&self) -> usize;
            fn pop(&self) -> Option<AudioStereoSampleType>;
            fn force_push(&self, frame: AudioStereoSampleType) -> Option<AudioStereoSampleType>;
        }
    }

    // How many frames to ask for after a callback that needed `needed`. Asks
    // for extra when running low and for less when far ahead, but never for
    // more than a period or more than there's room for.
    fn request_size(&self, needed: usize, period_size: usize) -> usize {
        let have = self.len();
        let wanted = if have < needed {
            needed * 2
        } else if have > needed * 2 {
            needed / 2
        } else {
            needed
        }
        .min(period_size);
        (self.capacity() - self.len()).min(wanted)
    }
}

/// Tells [CpalAudioService] what to do.
#[derive(Debug)]
pub enum CpalAudioServiceInput {
    /// Asks the service to exit.
    Quit,
    /// Frames for the output stream. They join the back of the ring buffer.
    Frames(Arc<Vec<AudioStereoSampleType>>),
    /// Resumes the output stream. A new service is already playing.
    Play,
    /// Pauses the output stream.
    Pause,
}

/// Tells clients what the service is doing.
#[derive(Debug, PartialEq)]
pub enum CpalAudioServiceEvent {
    /// The stream started. Provides its sample rate and channel count.
    Reset(usize, u8),
    /// The stream needs this many more frames. Send them with
    /// [CpalAudioServiceInput::Frames].
    FramesNeeded(usize),
    /// The stream asked for frames that the ring buffer didn't have.
    Underrun,
    /// The stream couldn't be built or has failed.
    Failed(String),
}

// The cpal stream isn't `Send`, so it lives on its own thread. This holds
// what the rest of the service needs to know about it.
struct StreamHandle {
    sample_rate: usize,
    channel_count: u8,
}
impl Debug for StreamHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("sample_rate", &self.sample_rate)
            .field("channel_count", &self.channel_count)
            .finish()
    }
}
impl StreamHandle {
    // period_size is the number of frames the device reads at once.
    // <https://www.alsa-project.org/wiki/FramesPeriods>
    fn new_with(
        period_size: usize,
        sender: &Sender<CpalAudioServiceEvent>,
        receiver: &Receiver<CpalAudioServiceInput>,
    ) -> anyhow::Result<Self> {
        let (device, config) = Self::default_device()?;

        // Three periods: one being played, one being filled, and one of slack.
        let queue = FrameQueue::new_with(period_size * 3);

        let receiver = receiver.clone();
        let sender = sender.clone();
        let thread_config = config.clone();
        std::thread::spawn(move || {
            let stream = match Self::build_stream(
                &device,
                thread_config,
                period_size,
                queue.clone(),
                sender.clone(),
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    log::error!("Failed while setting up the audio stream: {e:?}");
                    let _ = sender.send(CpalAudioServiceEvent::Failed(e.to_string()));
                    return;
                }
            };
            while let Ok(input) = receiver.recv() {
                match input {
                    CpalAudioServiceInput::Frames(frames) => {
                        for frame in frames.iter() {
                            if queue.force_push(*frame).is_some() {
                                log::warn!("Audio buffer overrun");
                            }
                        }
                    }
                    CpalAudioServiceInput::Play => {
                        if let Err(e) = stream.play() {
                            log::warn!("Couldn't resume the audio stream: {e}");
                        }
                    }
                    CpalAudioServiceInput::Pause => {
                        if let Err(e) = stream.pause() {
                            log::warn!("Couldn't pause the audio stream: {e}");
                        }
                    }
                    CpalAudioServiceInput::Quit => break,
                }
            }
            log::debug!("Audio stream thread exiting");
        });
        Ok(Self {
            sample_rate: config.sample_rate().0 as usize,
            channel_count: config.channels() as u8,
        })
    }

    pub(crate) fn default_device() -> anyhow::Result<(cpal::Device, SupportedStreamConfig)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::Error::msg("Default output device is not available"))?;
        let config = device.default_output_config()?;
        Ok((device, config))
    }

    fn build_stream(
        device: &cpal::Device,
        config: SupportedStreamConfig,
        period_size: usize,
        queue: FrameQueue,
        sender: Sender<CpalAudioServiceEvent>,
    ) -> anyhow::Result<Stream> {
        let sample_format = config.sample_format();
        let mut config: StreamConfig = config.into();
        config.buffer_size = BufferSize::Fixed(period_size as u32);

        match sample_format {
            cpal::SampleFormat::I8 => Self::make::<i8>(&config, device, period_size, queue, sender),
            cpal::SampleFormat::I16 => {
                Self::make::<i16>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::I32 => {
                Self::make::<i32>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::I64 => {
                Self::make::<i64>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::U8 => Self::make::<u8>(&config, device, period_size, queue, sender),
            cpal::SampleFormat::U16 => {
                Self::make::<u16>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::U32 => {
                Self::make::<u32>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::U64 => {
                Self::make::<u64>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::F32 => {
                Self::make::<f32>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::F64 => {
                Self::make::<f64>(&config, device, period_size, queue, sender)
            }
            _ => Err(anyhow::anyhow!("Unexpected sample format {sample_format:?}")),
        }
    }

    fn make<T>(
        config: &cpal::StreamConfig,
        device: &cpal::Device,
        period_size: usize,
        queue: FrameQueue,
        sender: Sender<CpalAudioServiceEvent>,
    ) -> anyhow::Result<Stream>
    where
        T: SizedSample + FromSample<AudioSampleType>,
    {
        let channel_count = config.channels as usize;
        let error_sender = sender.clone();
        let stream = device.build_output_stream(
            config,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                Self::fill(output, channel_count, period_size, &queue, &sender)
            },
            move |e| {
                log::error!("Audio output stream error: {e}");
                let _ = error_sender.send(CpalAudioServiceEvent::Failed(e.to_string()));
            },
            None,
        )?;
        Ok(stream)
    }

    // The cpal callback. Copies frames out of the queue, converting them to
    // the device's sample type, and then asks for replacements.
    fn fill<T>(
        output: &mut [T],
        channel_count: usize,
        period_size: usize,
        queue: &FrameQueue,
        sender: &Sender<CpalAudioServiceEvent>,
    ) where
        T: CpalSample + FromSample<AudioSampleType>,
    {
        let needed = output.len() / channel_count.max(1);
        for frame in output.chunks_exact_mut(channel_count) {
            let Some((left, right)) = queue.pop() else {
                let _ = sender.send(CpalAudioServiceEvent::Underrun);
                break;
            };
            frame[0] = T::from_sample(left);
            if channel_count > 1 {
                frame[1] = T::from_sample(right);
            }
        }
        let request = queue.request_size(needed, period_size);
        if request > 0 {
            let _ = sender.send(CpalAudioServiceEvent::FramesNeeded(request));
        }
    }
}

/// Plays frames through the default output device. Create one, wait for
/// [CpalAudioServiceEvent::Reset], and then answer each
/// [CpalAudioServiceEvent::FramesNeeded] with
/// [CpalAudioServiceInput::Frames].
///
/// The service must stay alive for as long as audio should play.
#[derive(Debug)]
pub struct CpalAudioService {
    inputs: CrossbeamChannel<CpalAudioServiceInput>,
    events: CrossbeamChannel<CpalAudioServiceEvent>,
    stream: StreamHandle,
}
impl ProvidesService<CpalAudioServiceInput, CpalAudioServiceEvent> for CpalAudioService {
    fn receiver(&self) -> &Receiver<CpalAudioServiceEvent> {
        &self.events.receiver
    }

    fn sender(&self) -> &Sender<CpalAudioServiceInput> {
        &self.inputs.sender
    }
}
impl CpalAudioService {
    /// 512 frames is about 11.6 milliseconds at 44.1KHz, on the edge of
    /// perceptible latency.
    pub const SUGGESTED_PERIOD_SIZE: usize = 512;

    /// Opens the default output device. `period_size` is how many frames the
    /// device consumes at a time; the ring buffer holds three periods.
    pub fn new_with(period_size: Option<usize>) -> anyhow::Result<Self> {
        let inputs: CrossbeamChannel<CpalAudioServiceInput> = Default::default();
        let events: CrossbeamChannel<CpalAudioServiceEvent> = Default::default();
        let period_size = period_size.unwrap_or(Self::SUGGESTED_PERIOD_SIZE);
        let stream = StreamHandle::new_with(period_size, &events.sender, &inputs.receiver)?;
        log::info!(
            "Opened audio output: {} Hz, {} channels, {period_size}-frame periods",
            stream.sample_rate,
            stream.channel_count
        );
        let _ = events.sender.send(CpalAudioServiceEvent::Reset(
            stream.sample_rate,
            stream.channel_count,
        ));
        Ok(Self {
            inputs,
            events,
            stream,
        })
    }

    #[allow(missing_docs)]
    pub fn sample_rate(&self) -> usize {
        self.stream.sample_rate
    }

    #[allow(missing_docs)]
    pub fn channel_count(&self) -> u8 {
        self.stream.channel_count
    }
}
impl Drop for CpalAudioService {
    fn drop(&mut self) {
        let _ = self.inputs.sender.send(CpalAudioServiceInput::Quit);
    }
}
