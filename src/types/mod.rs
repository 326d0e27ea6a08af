// Copyright (c) 2024 Mike Tsao

//! Common data types used throughout the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        BipolarNormal, FrequencyHz, IsUid, NodeId, Normal, ParamId, ParameterType, Sample,
        SampleRate, SampleType, Seconds, SendId, StereoSample, UidFactory,
    };
}

pub use {
    numbers::{FrequencyHz, ParameterType, Sample, SampleType, StereoSample},
    ranges::{BipolarNormal, Normal, RangedF64},
    time::{SampleRate, Seconds},
    uid::{IsUid, NodeId, ParamId, SendId, UidFactory},
};

mod numbers;
mod ranges;
mod time;
mod uid;
