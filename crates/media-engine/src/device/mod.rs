// FILE: crates/media-engine/src/device/mod.rs
//! Playback on a real audio device
//!
//! Downloads the resolved file, decodes it with symphonia and plays it through
//! cpal on a dedicated thread per session.

mod decoder;
mod output;
mod playback_thread;

pub use decoder::{AudioDecoder, DecodedAudio};
pub use output::AudioOutput;
pub use playback_thread::{PlaybackCommand, PlaybackThread};

use crate::backend::{AudioBackend, AudioHandle, SignalSender};
use crate::error::{EngineError, EngineResult};
use crate::session::Generation;
use async_trait::async_trait;
use tilawa_network::Client;

pub struct DeviceBackend {
    client: Client,
}

impl DeviceBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AudioBackend for DeviceBackend {
    async fn load(
        &self,
        uri: &str,
        generation: Generation,
        signals: SignalSender,
    ) -> EngineResult<Box<dyn AudioHandle>> {
        let data = self.client.download(uri).await?;
        log::debug!("Downloaded {} bytes from {}", data.len(), uri);

        let extension = extension_hint(uri);
        let thread = tokio::task::spawn_blocking(move || {
            PlaybackThread::start(data.to_vec(), extension, generation, signals)
        })
        .await
        .map_err(|e| EngineError::OutputError(format!("Playback setup task failed: {}", e)))??;

        Ok(Box::new(thread))
    }
}

/// File extension of the URI's last path segment, if it has one
fn extension_hint(uri: &str) -> Option<String> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let segment = path.rsplit('/').next()?;
    let (_, extension) = segment.rsplit_once('.')?;
    if extension.is_empty()
        || extension.len() > 4
        || !extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}
