// FILE: crates/media-engine/src/device/output.rs
//! Audio output on the host's default device

use crate::error::{EngineError, EngineResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct AudioOutput {
    device: Device,
    device_name: String,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl AudioOutput {
    /// Opens the default output device with the given format
    pub fn open(sample_rate: u32, channels: u16) -> EngineResult<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| EngineError::OutputError("No default output device".to_string()))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            device,
            device_name,
            config,
            stream: None,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Starts the stream, pulling interleaved samples from `rx`
    ///
    /// `drained` is set once `rx` is disconnected and every buffered sample
    /// has been played.
    pub fn play(&mut self, rx: Receiver<Vec<f32>>, drained: Arc<AtomicBool>) -> EngineResult<()> {
        let mut buffer: Vec<f32> = Vec::new();
        let mut position = 0;

        let device_name = self.device_name.clone();

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        if position >= buffer.len() {
                            match rx.try_recv() {
                                Ok(next) => {
                                    buffer = next;
                                    position = 0;
                                }
                                Err(TryRecvError::Empty) => {}
                                Err(TryRecvError::Disconnected) => {
                                    drained.store(true, Ordering::Relaxed);
                                }
                            }
                        }

                        *sample = match buffer.get(position) {
                            Some(value) => {
                                position += 1;
                                *value
                            }
                            None => 0.0,
                        };
                    }
                },
                move |err| {
                    log::error!("Audio output error on device '{}': {}", device_name, err);
                },
                None,
            )
            .map_err(|e| EngineError::OutputError(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| EngineError::OutputError(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        log::debug!("Audio stream started on device: {}", self.device_name);
        Ok(())
    }

    pub fn pause(&self) -> EngineResult<()> {
        match &self.stream {
            Some(stream) => stream
                .pause()
                .map_err(|e| EngineError::OutputError(format!("Failed to pause stream: {}", e))),
            None => Ok(()),
        }
    }

    pub fn resume(&self) -> EngineResult<()> {
        match &self.stream {
            Some(stream) => stream
                .play()
                .map_err(|e| EngineError::OutputError(format!("Failed to resume stream: {}", e))),
            None => Ok(()),
        }
    }

    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("Audio stream stopped on device: {}", self.device_name);
        }
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
