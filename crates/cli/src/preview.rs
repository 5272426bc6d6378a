// FILE: crates/cli/src/preview.rs
//! Timed playback stand-in for hosts without an audio device
//!
//! Loading checks that the URI is reachable; "playing" waits a fixed time
//! and then reports the natural end.

use async_trait::async_trait;
use media_engine::{
    AudioBackend, AudioHandle, EngineResult, Generation, SessionSignal, SignalSender,
};
use std::time::Duration;
use tilawa_network::Client;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub struct PreviewBackend {
    client: Client,
    duration: Duration,
}

impl PreviewBackend {
    pub fn new(client: Client, duration: Duration) -> Self {
        Self { client, duration }
    }
}

#[async_trait]
impl AudioBackend for PreviewBackend {
    async fn load(
        &self,
        uri: &str,
        generation: Generation,
        signals: SignalSender,
    ) -> EngineResult<Box<dyn AudioHandle>> {
        self.client.check(uri).await?;
        Ok(Box::new(PreviewHandle::new(generation, signals, self.duration)))
    }
}

struct PreviewHandle {
    generation: Generation,
    signals: SignalSender,
    remaining: Duration,
    started: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

impl PreviewHandle {
    fn new(generation: Generation, signals: SignalSender, duration: Duration) -> Self {
        Self {
            generation,
            signals,
            remaining: duration,
            started: None,
            timer: None,
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(started) = self.started.take() {
            self.remaining = self.remaining.saturating_sub(started.elapsed());
        }
    }
}

impl AudioHandle for PreviewHandle {
    fn play(&mut self) -> EngineResult<()> {
        if self.timer.is_some() {
            return Ok(());
        }
        let generation = self.generation;
        let signals = self.signals.clone();
        let remaining = self.remaining;

        self.started = Some(Instant::now());
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            let _ = signals.send(SessionSignal::Finished { generation });
        }));
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.cancel_timer();
        Ok(())
    }

    fn resume(&mut self) -> EngineResult<()> {
        self.play()
    }

    fn release(&mut self) {
        self.cancel_timer();
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
