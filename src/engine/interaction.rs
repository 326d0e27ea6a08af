// Copyright (c) 2024 Mike Tsao

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// A user gesture that the host forwards to
/// [AudioEngine::handle_interaction()](super::AudioEngine::handle_interaction).
/// Platforms that start audio suspended allow it to resume only in response
/// to one of these.
#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Interaction {
    /// A mouse button, pen, or finger went down.
    #[default]
    PointerDown,
    #[allow(missing_docs)]
    PointerUp,
    #[allow(missing_docs)]
    KeyDown,
    #[allow(missing_docs)]
    TouchStart,
}
