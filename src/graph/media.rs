// Copyright (c) 2024 Mike Tsao

use super::AudioBuffer;
use crate::types::{SampleRate, Seconds, StereoSample};
use std::sync::Arc;

/// A streamed, long-form media player: the thing a music track plays
/// through. It remembers where its media lives, fetches lazily, and keeps
/// its own play head independent of the context clock.
#[derive(Clone, Debug)]
pub struct MediaElement {
    src: Option<String>,
    media: Option<Arc<AudioBuffer>>,
    paused: bool,
    looping: bool,
    // In frames of the media's own sample rate.
    position: f64,
}
impl Default for MediaElement {
    fn default() -> Self {
        Self {
            src: None,
            media: None,
            paused: true,
            looping: false,
            position: 0.0,
        }
    }
}
impl MediaElement {
    /// An element pointed at `src`, not yet fetched.
    pub fn new_with(src: Option<String>) -> Self {
        Self {
            src,
            ..Default::default()
        }
    }

    /// Points the element at a new URL. Any previously fetched media is
    /// dropped and the play head rewinds.
    pub fn set_src(&mut self, src: &str) {
        if src.is_empty() {
            self.clear_src();
            return;
        }
        if self.src.as_deref() != Some(src) {
            self.media = None;
        }
        self.src = Some(src.to_string());
        self.position = 0.0;
    }

    /// Forgets the URL and the media.
    pub fn clear_src(&mut self) {
        self.src = None;
        self.media = None;
        self.paused = true;
        self.position = 0.0;
    }

    #[allow(missing_docs)]
    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    /// Whether media has been fetched for the current URL.
    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }

    /// Supplies the fetched media for the current URL.
    pub fn set_media(&mut self, media: Arc<AudioBuffer>) {
        self.media = Some(media);
    }

    /// Starts (or continues) playback. Does nothing without media.
    pub fn play(&mut self) -> bool {
        if self.media.is_some() {
            self.paused = false;
        }
        !self.paused
    }

    #[allow(missing_docs)]
    pub fn pause(&mut self) {
        self.paused = true;
    }

    #[allow(missing_docs)]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[allow(missing_docs)]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    #[allow(missing_docs)]
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// The play head, in seconds from the start of the media.
    pub fn current_time(&self) -> Seconds {
        match &self.media {
            Some(media) => Seconds(self.position / f64::from(media.sample_rate())),
            None => Seconds::zero(),
        }
    }

    /// Moves the play head.
    pub fn set_current_time(&mut self, time: Seconds) {
        self.position = match &self.media {
            Some(media) => time.0.max(0.0) * f64::from(media.sample_rate()),
            None => 0.0,
        };
    }

    /// Produces the next frame at the given output rate, or silence while
    /// paused. Reaching the end pauses (or wraps, when looping).
    pub(crate) fn next_frame(&mut self, output_rate: SampleRate) -> StereoSample {
        if self.paused {
            return StereoSample::SILENCE;
        }
        let Some(media) = &self.media else {
            return StereoSample::SILENCE;
        };
        let length = media.length() as f64;
        if self.position >= length {
            if self.looping && length > 0.0 {
                self.position %= length;
            } else {
                self.paused = true;
                self.position = length;
                return StereoSample::SILENCE;
            }
        }
        let frame = media.frame_at(self.position);
        self.position += f64::from(media.sample_rate()) / f64::from(output_rate);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media() -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::new_with(
            SampleRate::new(4),
            vec![vec![0.25, 0.5, 0.75, 1.0]],
        ))
    }

    #[test]
    fn plays_then_pauses_at_end() {
        let mut element = MediaElement::new_with(Some("song.ogg".to_string()));
        assert!(!element.play(), "nothing to play before fetching");
        element.set_media(media());
        assert!(element.play());
        let rate = SampleRate::new(4);
        let frames: Vec<_> = (0..5).map(|_| element.next_frame(rate)).collect();
        assert_eq!(frames[0], StereoSample::from(0.25));
        assert_eq!(frames[3], StereoSample::from(1.0));
        assert_eq!(frames[4], StereoSample::SILENCE);
        assert!(element.is_paused());
    }

    #[test]
    fn rewind_and_retarget() {
        let mut element = MediaElement::new_with(Some("a.ogg".to_string()));
        element.set_media(media());
        element.set_current_time(Seconds(0.5));
        assert_eq!(element.current_time(), Seconds(0.5));
        element.set_src("a.ogg");
        assert!(element.has_media(), "same URL keeps the fetched media");
        assert_eq!(element.current_time(), Seconds::zero());
        element.set_src("b.ogg");
        assert!(!element.has_media());
        element.set_src("");
        assert_eq!(element.src(), None);
    }
}
