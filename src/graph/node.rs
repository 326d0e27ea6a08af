// Copyright (c) 2024 Mike Tsao

use super::{AudioBuffer, MediaElement};
use crate::{
    cores::{Effect, Oscillator, Waveform},
    types::{FrequencyHz, NodeId, ParamId, SampleRate, Seconds, StereoSample},
};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::Display;

/// Where a connection lands: the input of another node, or one of its
/// parameters. Signals arriving at a parameter are mixed to mono and added to
/// its automated value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    #[allow(missing_docs)]
    Node(NodeId),
    #[allow(missing_docs)]
    Param(ParamId),
}
impl From<NodeId> for Target {
    fn from(value: NodeId) -> Self {
        Target::Node(value)
    }
}
impl From<ParamId> for Target {
    fn from(value: ParamId) -> Self {
        Target::Param(value)
    }
}

/// What a node is, without its contents.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum NodeType {
    Destination,
    Gain,
    StereoPanner,
    Effect,
    BufferSource,
    Oscillator,
    MediaElementSource,
}

/// Names the automatable parameters that nodes expose.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ParamKind {
    Gain,
    Pan,
    Frequency,
    Detune,
    PlaybackRate,
}

/// How a one-shot buffer source plays its buffer. A sound keeps one of these
/// as the template for every source it creates.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct BufferSourceOptions {
    /// Whether playback wraps around between the loop points.
    pub looping: bool,
    /// Where the loop begins. Ignored unless it's before `loop_end`.
    pub loop_start: Seconds,
    /// Where the loop ends. Zero (or anything past the end of the buffer)
    /// means the end of the buffer.
    pub loop_end: Seconds,
    /// 1.0 is the recorded speed.
    #[derivative(Default(value = "1.0"))]
    pub playback_rate: f64,
    /// In cents. 1200 is an octave up.
    pub detune: f64,
}

/// How a tone generator starts out.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct OscillatorOptions {
    #[allow(missing_docs)]
    pub waveform: Waveform,
    #[allow(missing_docs)]
    #[derivative(Default(value = "FrequencyHz(440.0)"))]
    pub frequency: FrequencyHz,
    /// In cents.
    pub detune: f64,
}

// Converts cents to a frequency ratio.
pub(crate) fn cents_to_ratio(cents: f64) -> f64 {
    2.0f64.powf(cents / 1200.0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Schedule {
    pub(crate) when: Seconds,
    pub(crate) offset: Seconds,
    pub(crate) duration: Option<Seconds>,
}

#[derive(Debug)]
pub(crate) struct BufferSourceState {
    pub(crate) buffer: Arc<AudioBuffer>,
    pub(crate) looping: bool,
    pub(crate) loop_start: Seconds,
    pub(crate) loop_end: Seconds,
    pub(crate) playback_rate: ParamId,
    pub(crate) detune: ParamId,

    pub(crate) schedule: Option<Schedule>,
    pub(crate) stop_at: Option<Seconds>,

    // In frames of the buffer's own sample rate.
    position: f64,
    // Seconds of buffer time consumed so far.
    elapsed: f64,
    has_begun: bool,
    pub(crate) is_finished: bool,
}
impl BufferSourceState {
    pub(crate) fn new_with(
        buffer: Arc<AudioBuffer>,
        options: &BufferSourceOptions,
        playback_rate: ParamId,
        detune: ParamId,
    ) -> Self {
        Self {
            buffer,
            looping: options.looping,
            loop_start: options.loop_start,
            loop_end: options.loop_end,
            playback_rate,
            detune,
            schedule: None,
            stop_at: None,
            position: 0.0,
            elapsed: 0.0,
            has_begun: false,
            is_finished: false,
        }
    }

    // The loop region in buffer frames.
    fn loop_bounds(&self) -> (f64, f64) {
        let buffer_rate = f64::from(self.buffer.sample_rate());
        let length = self.buffer.length() as f64;
        let start = self.loop_start.0 * buffer_rate;
        let end = self.loop_end.0 * buffer_rate;
        if self.loop_end.0 > self.loop_start.0 && start >= 0.0 && end <= length {
            (start, end)
        } else {
            (0.0, length)
        }
    }

    /// `rate` is the effective playback rate, detune already applied.
    pub(crate) fn next_frame(
        &mut self,
        now: Seconds,
        output_rate: SampleRate,
        rate: f64,
    ) -> StereoSample {
        let Some(schedule) = self.schedule else {
            return StereoSample::SILENCE;
        };
        if self.is_finished || now < schedule.when {
            return StereoSample::SILENCE;
        }
        if self.stop_at.is_some_and(|stop_at| now >= stop_at) {
            self.is_finished = true;
            return StereoSample::SILENCE;
        }
        let buffer_rate = f64::from(self.buffer.sample_rate());
        if !self.has_begun {
            self.has_begun = true;
            self.position = schedule.offset.0.max(0.0) * buffer_rate;
        }
        if schedule.duration.is_some_and(|d| self.elapsed >= d.0) {
            self.is_finished = true;
            return StereoSample::SILENCE;
        }

        let length = self.buffer.length() as f64;
        if self.looping {
            let (start, end) = self.loop_bounds();
            let span = end - start;
            if span <= 0.0 {
                self.is_finished = true;
                return StereoSample::SILENCE;
            }
            if self.position >= end {
                self.position = start + (self.position - end) % span;
            } else if self.position < start && rate < 0.0 {
                self.position = end - (start - self.position) % span;
            }
        } else if self.position >= length || self.position < 0.0 {
            self.is_finished = true;
            return StereoSample::SILENCE;
        }

        let frame = self.buffer.frame_at(self.position);
        self.position += rate * buffer_rate / f64::from(output_rate);
        self.elapsed += rate.abs() / f64::from(output_rate);
        frame
    }
}

#[derive(Debug)]
pub(crate) struct OscillatorState {
    pub(crate) core: Oscillator,
    pub(crate) frequency: ParamId,
    pub(crate) detune: ParamId,
    pub(crate) start_at: Option<Seconds>,
    pub(crate) stop_at: Option<Seconds>,
    pub(crate) is_finished: bool,
}
impl OscillatorState {
    pub(crate) fn next_frame(&mut self, now: Seconds, frequency: f64, detune: f64) -> StereoSample {
        match self.start_at {
            Some(start_at) if now >= start_at => {}
            _ => return StereoSample::SILENCE,
        }
        if self.stop_at.is_some_and(|stop_at| now >= stop_at) {
            self.is_finished = true;
            return StereoSample::SILENCE;
        }
        self.core
            .set_frequency(FrequencyHz(frequency * cents_to_ratio(detune)));
        StereoSample::from(self.core.tick())
    }
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    Destination,
    Gain { gain: ParamId },
    StereoPanner { pan: ParamId },
    Effect(Effect),
    BufferSource(BufferSourceState),
    Oscillator(OscillatorState),
    MediaElementSource(MediaElement),
}
impl NodeKind {
    pub(crate) fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Destination => NodeType::Destination,
            NodeKind::Gain { .. } => NodeType::Gain,
            NodeKind::StereoPanner { .. } => NodeType::StereoPanner,
            NodeKind::Effect(_) => NodeType::Effect,
            NodeKind::BufferSource(_) => NodeType::BufferSource,
            NodeKind::Oscillator(_) => NodeType::Oscillator,
            NodeKind::MediaElementSource(_) => NodeType::MediaElementSource,
        }
    }

    pub(crate) fn param(&self, kind: ParamKind) -> Option<ParamId> {
        match (self, kind) {
            (NodeKind::Gain { gain }, ParamKind::Gain) => Some(*gain),
            (NodeKind::StereoPanner { pan }, ParamKind::Pan) => Some(*pan),
            (NodeKind::BufferSource(s), ParamKind::PlaybackRate) => Some(s.playback_rate),
            (NodeKind::BufferSource(s), ParamKind::Detune) => Some(s.detune),
            (NodeKind::Oscillator(s), ParamKind::Frequency) => Some(s.frequency),
            (NodeKind::Oscillator(s), ParamKind::Detune) => Some(s.detune),
            _ => None,
        }
    }

    pub(crate) fn params(&self) -> Vec<ParamId> {
        match self {
            NodeKind::Gain { gain } => vec![*gain],
            NodeKind::StereoPanner { pan } => vec![*pan],
            NodeKind::BufferSource(s) => vec![s.playback_rate, s.detune],
            NodeKind::Oscillator(s) => vec![s.frequency, s.detune],
            NodeKind::Destination | NodeKind::Effect(_) | NodeKind::MediaElementSource(_) => {
                Vec::default()
            }
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        match self {
            NodeKind::BufferSource(s) => s.is_finished,
            NodeKind::Oscillator(s) => s.is_finished,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) outputs: Vec<Target>,
}
impl Node {
    pub(crate) fn new_with(kind: NodeKind) -> Self {
        Self {
            kind,
            outputs: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(frames: Vec<f64>, options: &BufferSourceOptions) -> BufferSourceState {
        BufferSourceState::new_with(
            Arc::new(AudioBuffer::new_with(SampleRate::new(4), vec![frames])),
            options,
            ParamId(1),
            ParamId(2),
        )
    }

    fn start(state: &mut BufferSourceState, offset: f64, duration: Option<f64>) {
        state.schedule = Some(Schedule {
            when: Seconds::zero(),
            offset: Seconds(offset),
            duration: duration.map(Seconds),
        });
    }

    fn play(state: &mut BufferSourceState, frames: usize) -> Vec<f64> {
        (0..frames)
            .map(|i| {
                state
                    .next_frame(Seconds(i as f64 / 4.0), SampleRate::new(4), 1.0)
                    .0 .0
            })
            .collect()
    }

    #[test]
    fn unstarted_source_is_silent() {
        let mut state = source(vec![1.0; 4], &BufferSourceOptions::default());
        assert_eq!(play(&mut state, 4), vec![0.0; 4]);
        assert!(!state.is_finished);
    }

    #[test]
    fn one_shot_finishes_at_end() {
        let mut state = source(vec![0.1, 0.2, 0.3], &BufferSourceOptions::default());
        start(&mut state, 0.0, None);
        assert_eq!(play(&mut state, 4), vec![0.1, 0.2, 0.3, 0.0]);
        assert!(state.is_finished);
    }

    #[test]
    fn offset_and_duration_select_a_slice() {
        let mut state = source(vec![0.1, 0.2, 0.3, 0.4], &BufferSourceOptions::default());
        start(&mut state, 0.25, Some(0.5));
        assert_eq!(play(&mut state, 3), vec![0.2, 0.3, 0.0]);
        assert!(state.is_finished);
    }

    #[test]
    fn looping_wraps_between_loop_points() {
        let options = BufferSourceOptions {
            looping: true,
            loop_start: Seconds(0.25),
            loop_end: Seconds(0.75),
            ..Default::default()
        };
        let mut state = source(vec![0.1, 0.2, 0.3, 0.4], &options);
        start(&mut state, 0.0, None);
        assert_eq!(play(&mut state, 6), vec![0.1, 0.2, 0.3, 0.2, 0.3, 0.2]);
        assert!(!state.is_finished);
    }

    #[test]
    fn cents_convert_to_ratios() {
        assert_eq!(cents_to_ratio(0.0), 1.0);
        assert_eq!(cents_to_ratio(1200.0), 2.0);
        assert_eq!(cents_to_ratio(-1200.0), 0.5);
    }
}
