// FILE: crates/media-engine/src/device/playback_thread.rs

use super::decoder::AudioDecoder;
use super::output::AudioOutput;
use crate::backend::{AudioHandle, SessionSignal, SignalSender};
use crate::error::{EngineError, EngineResult};
use crate::session::Generation;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

const IDLE_WAIT: StdDuration = StdDuration::from_millis(10);
const SEND_WAIT: StdDuration = StdDuration::from_millis(20);

/// Commands sent to the playback thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Stop,
}

enum LoopEnd {
    Finished,
    Stopped,
}

/// Owns the thread that decodes and feeds one piece of audio
///
/// The thread starts paused and reports natural end or stream errors as
/// [`SessionSignal`]s tagged with its generation.
pub struct PlaybackThread {
    handle: Option<thread::JoinHandle<()>>,
    command_tx: Sender<PlaybackCommand>,
    running: Arc<AtomicBool>,
}

impl PlaybackThread {
    /// Starts a playback thread and waits until its decoder and output are ready
    pub fn start(
        data: Vec<u8>,
        extension: Option<String>,
        generation: Generation,
        signals: SignalSender,
    ) -> EngineResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let (command_tx, command_rx) = bounded(10);
        let (ready_tx, ready_rx) = bounded::<EngineResult<()>>(1);

        let running_clone = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name(format!("tilawa-playback-{}", generation))
            .spawn(move || {
                let setup = AudioDecoder::from_bytes(data, extension.as_deref()).and_then(|decoder| {
                    let spec = *decoder.spec();
                    let output = AudioOutput::open(spec.rate, spec.channels.count() as u16)?;
                    Ok((decoder, output))
                });

                let (decoder, output) = match setup {
                    Ok(parts) => {
                        let _ = ready_tx.send(Ok(()));
                        parts
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                match playback_loop(decoder, output, command_rx, running_clone) {
                    Ok(LoopEnd::Finished) => {
                        let _ = signals.send(SessionSignal::Finished { generation });
                    }
                    Ok(LoopEnd::Stopped) => {}
                    Err(e) => {
                        log::error!("Playback thread error: {}", e);
                        let _ = signals.send(SessionSignal::Errored {
                            generation,
                            reason: e.to_string(),
                        });
                    }
                }
            })
            .map_err(|e| EngineError::OutputError(format!("Failed to spawn playback thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                handle: Some(handle),
                command_tx,
                running,
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(EngineError::OutputError(
                    "Playback thread exited during setup".to_string(),
                ))
            }
        }
    }

    /// Send a command to the playback thread
    pub fn send_command(&self, cmd: PlaybackCommand) -> EngineResult<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| EngineError::InvalidState(format!("Failed to send command: {}", e)))
    }

    /// Check if the thread is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the playback thread and wait for it
    pub fn stop(&mut self) {
        let _ = self.command_tx.try_send(PlaybackCommand::Stop);
        self.running.store(false, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl AudioHandle for PlaybackThread {
    fn play(&mut self) -> EngineResult<()> {
        self.send_command(PlaybackCommand::Play)
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.send_command(PlaybackCommand::Pause)
    }

    fn resume(&mut self) -> EngineResult<()> {
        self.send_command(PlaybackCommand::Play)
    }

    fn release(&mut self) {
        self.stop();
    }
}

impl Drop for PlaybackThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn playback_loop(
    mut decoder: AudioDecoder,
    mut output: AudioOutput,
    command_rx: Receiver<PlaybackCommand>,
    running: Arc<AtomicBool>,
) -> EngineResult<LoopEnd> {
    let (audio_tx, audio_rx) = bounded::<Vec<f32>>(4);
    let drained = Arc::new(AtomicBool::new(false));
    output.play(audio_rx, Arc::clone(&drained))?;

    let mut audio_tx = Some(audio_tx);
    let mut pending: Option<Vec<f32>> = None;
    let mut playing = false;

    while running.load(Ordering::Relaxed) {
        match command_rx.try_recv() {
            Ok(PlaybackCommand::Play) => {
                playing = true;
                output.resume()?;
            }
            Ok(PlaybackCommand::Pause) => {
                playing = false;
                if let Err(e) = output.pause() {
                    log::warn!("Output cannot pause, buffered audio will drain: {}", e);
                }
            }
            Ok(PlaybackCommand::Stop) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        if !playing {
            thread::sleep(IDLE_WAIT);
            continue;
        }

        // Decoder exhausted: wait for the device to play what is buffered
        let Some(tx) = audio_tx.as_ref() else {
            if drained.load(Ordering::Relaxed) {
                output.stop();
                return Ok(LoopEnd::Finished);
            }
            thread::sleep(IDLE_WAIT);
            continue;
        };

        if pending.is_none() {
            pending = decoder.decode_next()?.map(|decoded| decoded.samples);
            if pending.is_none() {
                log::debug!("End of stream reached");
                audio_tx = None;
                continue;
            }
        }

        if let Some(samples) = pending.take() {
            match tx.send_timeout(samples, SEND_WAIT) {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(samples)) => pending = Some(samples),
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Err(EngineError::OutputError("Audio output closed".to_string()));
                }
            }
        }
    }

    output.stop();
    Ok(LoopEnd::Stopped)
}
