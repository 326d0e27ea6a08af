// Copyright (c) 2024 Mike Tsao

use super::Sound;
use crate::{
    error::{GraphError, PlaybackError},
    graph::{ContextState, MediaElement, ProcessingContext, Target},
    loading::AssetLoader,
    prelude::*,
    routing::EffectChain,
};

/// A long-form track streamed through a [MediaElement]. Loading only points
/// the element at a URL; the media itself is fetched on the first
/// [Music::play()].
#[derive(Debug)]
pub struct Music {
    source: NodeId,
    effects: EffectChain,
}
impl Music {
    #[allow(missing_docs)]
    pub fn new_with(
        ctx: &mut ProcessingContext,
        target: Option<Target>,
    ) -> Result<Self, GraphError> {
        let effects = EffectChain::new_with(ctx, target)?;
        let source = ctx.create_media_element_source(MediaElement::default());
        if let Err(e) = ctx.connect(source, effects.input()) {
            ctx.dispose_node(source);
            effects.dispose(ctx);
            return Err(e);
        }
        Ok(Self { source, effects })
    }

    /// The media element source node.
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Points the element at `url`. Returns false if the element is gone.
    pub fn load(&mut self, ctx: &mut ProcessingContext, url: &str) -> bool {
        match ctx.media_element_mut(self.source) {
            Some(element) => {
                element.set_src(url);
                true
            }
            None => false,
        }
    }

    #[allow(missing_docs)]
    pub fn src<'a>(&self, ctx: &'a ProcessingContext) -> Option<&'a str> {
        ctx.media_element(self.source).and_then(|e| e.src())
    }

    /// Starts playback, fetching the media first if it hasn't been yet.
    /// Resolves once the element is actually playing. A context that isn't
    /// running refuses with [PlaybackError::NotAllowed].
    pub async fn play(
        &mut self,
        ctx: &mut ProcessingContext,
        loader: &AssetLoader,
    ) -> Result<NodeId, PlaybackError> {
        if ctx.state() != ContextState::Running {
            return Err(PlaybackError::NotAllowed);
        }
        let element = ctx
            .media_element(self.source)
            .ok_or(GraphError::UnknownNode(self.source))?;
        let src = element.src().ok_or(PlaybackError::NoSource)?.to_string();
        if !element.has_media() {
            let media = loader.load(&src).await?;
            if let Some(element) = ctx.media_element_mut(self.source) {
                element.set_media(media);
            }
        }
        match ctx.media_element_mut(self.source) {
            Some(element) => {
                if element.play() {
                    Ok(self.source)
                } else {
                    Err(PlaybackError::NotAllowed)
                }
            }
            None => Err(GraphError::UnknownNode(self.source).into()),
        }
    }

    /// Pauses and rewinds to the start.
    pub fn stop(&mut self, ctx: &mut ProcessingContext) {
        if let Some(element) = ctx.media_element_mut(self.source) {
            element.pause();
            element.set_current_time(Seconds::zero());
        }
    }

    /// Pauses (keeping the position) or continues. Continuing does nothing
    /// until media has been fetched by [Music::play()].
    pub fn set_paused(&mut self, ctx: &mut ProcessingContext, paused: bool) {
        if let Some(element) = ctx.media_element_mut(self.source) {
            if paused {
                element.pause();
            } else {
                element.play();
            }
        }
    }

    #[allow(missing_docs)]
    pub fn is_paused(&self, ctx: &ProcessingContext) -> bool {
        ctx.media_element(self.source)
            .map(|e| e.is_paused())
            .unwrap_or(true)
    }

    #[allow(missing_docs)]
    pub fn set_looping(&mut self, ctx: &mut ProcessingContext, looping: bool) {
        if let Some(element) = ctx.media_element_mut(self.source) {
            element.set_looping(looping);
        }
    }

    /// The play head.
    pub fn current_time(&self, ctx: &ProcessingContext) -> Seconds {
        ctx.media_element(self.source)
            .map(|e| e.current_time())
            .unwrap_or_default()
    }
}
impl Sound for Music {
    fn effects(&self) -> &EffectChain {
        &self.effects
    }

    fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    /// Whether there's a URL to play. The media may not have been fetched yet.
    fn is_loaded(&self, ctx: &ProcessingContext) -> bool {
        self.src(ctx).is_some()
    }

    fn unload(&mut self, ctx: &mut ProcessingContext) {
        if let Some(element) = ctx.media_element_mut(self.source) {
            element.clear_src();
        }
    }

    fn dispose(mut self, ctx: &mut ProcessingContext) {
        ctx.disconnect(self.source);
        self.unload(ctx);
        self.effects.dispose(ctx);
        ctx.dispose_node(self.source);
    }
}
