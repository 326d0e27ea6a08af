// Copyright (c) 2024 Mike Tsao

use crate::{error::LoadError, graph::AudioBuffer, types::SampleRate};
use core::fmt::Debug;
use std::io::Cursor;
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

/// Turns encoded bytes into an [AudioBuffer]. Like fetching, decoding runs on
/// a blocking worker thread.
pub trait DecodesAudio: Debug + Send + Sync {
    /// `url` is for error messages and format hints.
    fn decode(&self, url: &str, bytes: Vec<u8>) -> Result<AudioBuffer, LoadError>;
}

fn decode_error(url: &str, reason: impl ToString) -> LoadError {
    LoadError::Decode {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Decodes whatever symphonia can: WAV, AIFF, FLAC, MP3, and Ogg Vorbis.
#[derive(Debug, Default)]
pub struct SymphoniaDecoder {}
impl DecodesAudio for SymphoniaDecoder {
    fn decode(&self, url: &str, bytes: Vec<u8>) -> Result<AudioBuffer, LoadError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some((_, extension)) = url.rsplit_once('.') {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| decode_error(url, e))?;
        let mut format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| decode_error(url, "no decodable audio track"))?;
        let track_id = track.id;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| decode_error(url, e))?;

        let mut sample_rate = track.codec_params.sample_rate.unwrap_or_default() as usize;
        let mut channel_count = track
            .codec_params
            .channels
            .map(|c| c.count())
            .unwrap_or(1);
        let mut interleaved: Vec<f32> = Vec::default();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                // End of stream, or a chained stream we don't follow.
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(decode_error(url, e)),
            };
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate as usize;
                    channel_count = spec.channels.count();
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buffer.samples());
                }
                // A corrupt packet. Skip it and keep going.
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(decode_error(url, e)),
            }
        }
        if sample_rate == 0 {
            return Err(decode_error(url, "unknown sample rate"));
        }
        Ok(AudioBuffer::from_interleaved(
            SampleRate::new(sample_rate),
            channel_count,
            &interleaved,
        ))
    }
}

/// Decodes WAV files only, with hound.
#[derive(Debug, Default)]
pub struct WavDecoder {}
impl WavDecoder {
    fn read_samples<T>(
        reader: &mut hound::WavReader<Cursor<Vec<u8>>>,
        scale: f64,
    ) -> Result<Vec<f64>, hound::Error>
    where
        T: hound::Sample + Into<f64>,
    {
        reader
            .samples::<T>()
            .map(|s| s.map(|s| s.into() / scale))
            .collect()
    }
}
impl DecodesAudio for WavDecoder {
    fn decode(&self, url: &str, bytes: Vec<u8>) -> Result<AudioBuffer, LoadError> {
        let mut reader =
            hound::WavReader::new(Cursor::new(bytes)).map_err(|e| decode_error(url, e))?;
        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => Self::read_samples::<f32>(&mut reader, 1.0),
            hound::SampleFormat::Int => {
                let scale = 2.0f64.powi(spec.bits_per_sample as i32 - 1);
                Self::read_samples::<i32>(&mut reader, scale)
            }
        }
        .map_err(|e| decode_error(url, e))?;
        Ok(AudioBuffer::from_interleaved(
            SampleRate::new(spec.sample_rate as usize),
            spec.channels as usize,
            &samples,
        ))
    }
}
