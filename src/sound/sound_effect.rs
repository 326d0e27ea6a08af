// Copyright (c) 2024 Mike Tsao

use super::Sound;
use crate::{
    error::{GraphError, LoadError, PlaybackError},
    graph::{AudioBuffer, BufferSourceOptions, ProcessingContext, Target},
    loading::AssetLoader,
    prelude::*,
    routing::EffectChain,
};
use std::sync::Arc;

/// A decoded sample that can be played any number of times, overlapping
/// itself. Every [SoundEffect::play()] creates a new single-use source.
#[derive(Debug)]
pub struct SoundEffect {
    options: BufferSourceOptions,
    url: Option<String>,
    buffer: Option<Arc<AudioBuffer>>,
    effects: EffectChain,
    voices: Vec<NodeId>,
}
impl SoundEffect {
    #[allow(missing_docs)]
    pub fn new_with(
        ctx: &mut ProcessingContext,
        target: Option<Target>,
        options: BufferSourceOptions,
    ) -> Result<Self, GraphError> {
        Ok(Self {
            options,
            url: None,
            buffer: None,
            effects: EffectChain::new_with(ctx, target)?,
            voices: Default::default(),
        })
    }

    /// Fetches and decodes `url`. Loading through a shared [AssetLoader]
    /// means sounds using the same file share one buffer.
    pub async fn load(&mut self, loader: &AssetLoader, url: &str) -> Result<(), LoadError> {
        let buffer = loader.load(url).await?;
        self.url = Some(url.to_string());
        self.buffer = Some(buffer);
        Ok(())
    }

    /// Supplies an already decoded buffer.
    pub fn set_buffer(&mut self, buffer: Arc<AudioBuffer>) {
        self.url = None;
        self.buffer = Some(buffer);
    }

    #[allow(missing_docs)]
    pub fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        self.buffer.as_ref()
    }

    /// Where the buffer came from, if it was loaded by URL.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The template every new source is created from.
    pub fn options(&self) -> &BufferSourceOptions {
        &self.options
    }

    #[allow(missing_docs)]
    pub fn options_mut(&mut self) -> &mut BufferSourceOptions {
        &mut self.options
    }

    /// Starts a new voice `when` from now, `offset` into the buffer, playing
    /// at most `duration` of it. Earlier voices keep playing.
    pub fn play(
        &mut self,
        ctx: &mut ProcessingContext,
        when: Seconds,
        offset: Seconds,
        duration: Option<Seconds>,
    ) -> Result<NodeId, PlaybackError> {
        let buffer = self.buffer.as_ref().ok_or(PlaybackError::NotLoaded)?;
        let source = ctx.create_buffer_source(Arc::clone(buffer), &self.options);
        let start = ctx.current_time() + when;
        let started = ctx
            .connect(source, self.effects.input())
            .and_then(|_| ctx.start_source(source, start, offset, duration));
        if let Err(e) = started {
            ctx.dispose_node(source);
            return Err(e.into());
        }

        // Finished voices have already removed themselves from the graph.
        self.voices.retain(|id| ctx.contains(*id));
        self.voices.push(source);
        Ok(source)
    }

    /// The voices that were still sounding as of the last [SoundEffect::play()].
    pub fn voices(&self) -> &[NodeId] {
        &self.voices
    }

    /// Silences every voice that hasn't finished yet.
    pub fn stop(&mut self, ctx: &mut ProcessingContext) {
        for id in self.voices.drain(..) {
            if ctx.contains(id) {
                ctx.dispose_node(id);
            }
        }
    }
}
impl Sound for SoundEffect {
    fn effects(&self) -> &EffectChain {
        &self.effects
    }

    fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    fn is_loaded(&self, _ctx: &ProcessingContext) -> bool {
        self.buffer.is_some()
    }

    /// Drops this sound's reference to the buffer. Voices already playing
    /// keep theirs.
    fn unload(&mut self, _ctx: &mut ProcessingContext) {
        self.buffer = None;
        self.url = None;
    }

    fn dispose(mut self, ctx: &mut ProcessingContext) {
        self.stop(ctx);
        self.effects.dispose(ctx);
    }
}
