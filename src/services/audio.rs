//! Audio asset loading for the simulated audio endpoint.
//!
//! An [`AssetSource`] supplies the transcript text and pre-chunked PCM
//! bytes the endpoint replays. The shipped implementation reads static
//! files from disk; when those are missing the handler substitutes the
//! fallback helpers below so the endpoint keeps working out of the box.

use crate::core::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use std::path::PathBuf;
use thiserror::Error;

/// Number of filler chunks generated when no PCM asset is available
const FALLBACK_CHUNK_COUNT: usize = 5;

/// Size bounds in bytes for randomly generated filler chunks
const FALLBACK_CHUNK_MIN_LEN: usize = 320;
const FALLBACK_CHUNK_MAX_LEN: usize = 3200;

/// Transcript substituted when the transcript asset is missing
pub const FALLBACK_TRANSCRIPT: &str =
    "This is a simulated transcript of the generated audio response.";

/// Failure modes of an asset source.
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset file does not exist; callers recover with simulated data
    #[error("asset not found: {0}")]
    NotFound(String),

    /// Asset exists but could not be read, or the chunk parameters are
    /// unusable
    #[error("{0}")]
    Io(String),
}

impl From<AssetError> for AppError {
    fn from(err: AssetError) -> Self {
        AppError::Asset(err.to_string())
    }
}

/// Pluggable source of the transcript and audio payload.
///
/// A real text-to-speech integration can replace [`FileAssetSource`]
/// behind this trait without touching the endpoint.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Load the transcript text for the simulated response.
    async fn load_transcript(&self) -> Result<String, AssetError>;

    /// Load the PCM audio split into chunks of
    /// `sample_rate * 2 * chunk_duration_ms / 1000` bytes. The final
    /// chunk carries the remainder and may be shorter.
    async fn load_audio_chunks(
        &self,
        sample_rate: u32,
        chunk_duration_ms: u32,
    ) -> Result<Vec<Bytes>, AssetError>;
}

/// Asset source reading a transcript file and a raw PCM file from disk.
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    transcript_path: PathBuf,
    pcm_path: PathBuf,
}

impl FileAssetSource {
    /// Create a source for the given file paths.
    pub fn new(transcript_path: impl Into<PathBuf>, pcm_path: impl Into<PathBuf>) -> Self {
        Self {
            transcript_path: transcript_path.into(),
            pcm_path: pcm_path.into(),
        }
    }
}

#[async_trait]
impl AssetSource for FileAssetSource {
    async fn load_transcript(&self) -> Result<String, AssetError> {
        match tokio::fs::read_to_string(&self.transcript_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AssetError::NotFound(
                self.transcript_path.display().to_string(),
            )),
            Err(e) => Err(AssetError::Io(format!("failed to read text file: {}", e))),
        }
    }

    async fn load_audio_chunks(
        &self,
        sample_rate: u32,
        chunk_duration_ms: u32,
    ) -> Result<Vec<Bytes>, AssetError> {
        let chunk_size = pcm_chunk_size(sample_rate, chunk_duration_ms);
        if chunk_size == 0 {
            return Err(AssetError::Io(format!(
                "invalid chunk size: sample rate {}, duration {}ms",
                sample_rate, chunk_duration_ms
            )));
        }

        let data = match tokio::fs::read(&self.pcm_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssetError::NotFound(self.pcm_path.display().to_string()))
            }
            Err(e) => return Err(AssetError::Io(format!("failed to read PCM file: {}", e))),
        };

        Ok(chunk_pcm(&data, chunk_size))
    }
}

/// Byte length of one PCM chunk: 16-bit mono samples covering
/// `chunk_duration_ms` at `sample_rate`.
pub fn pcm_chunk_size(sample_rate: u32, chunk_duration_ms: u32) -> usize {
    (sample_rate as u64 * 2 * chunk_duration_ms as u64 / 1000) as usize
}

/// Split raw PCM bytes into chunks of `chunk_size` bytes.
///
/// The final chunk carries the remainder. `chunk_size` must be non-zero.
pub fn chunk_pcm(data: &[u8], chunk_size: usize) -> Vec<Bytes> {
    data.chunks(chunk_size)
        .map(Bytes::copy_from_slice)
        .collect()
}

/// Simulated transcript used when the transcript asset is missing.
pub fn fallback_transcript() -> String {
    FALLBACK_TRANSCRIPT.to_string()
}

/// Randomly sized filler chunks used when the PCM asset is missing.
pub fn fallback_audio_chunks() -> Vec<Bytes> {
    let mut rng = rand::thread_rng();
    (0..FALLBACK_CHUNK_COUNT)
        .map(|_| {
            let len = rng.gen_range(FALLBACK_CHUNK_MIN_LEN..=FALLBACK_CHUNK_MAX_LEN);
            let mut chunk = vec![0u8; len];
            rng.fill(chunk.as_mut_slice());
            Bytes::from(chunk)
        })
        .collect()
}
