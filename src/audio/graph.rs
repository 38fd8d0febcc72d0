//! In-process stand-in for the host audio graph.
//!
//! An [`AudioContext`] owns processing state (suspended until a play gesture
//! resumes it), a [`MediaElement`] owns decoded audio plus its transport, and
//! a [`MediaSourceNode`] is the exclusive capture of one element by one
//! context. An element can be captured at most once, which is where
//! `SourceAlreadyCaptured` comes from.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::analyser::AnalyserNode;
use super::decode::AudioData;
use crate::config::{AnalyserConfig, AudioConfig};
use crate::error::{AudioGraphError, GraphResult};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// Result of probing the host for analysis support.
#[derive(Debug, Clone)]
pub enum Capability {
    Supported(AudioContext),
    Unsupported(AudioGraphError),
}

#[derive(Clone)]
pub struct AudioContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: ContextId,
    state: Mutex<ContextState>,
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioContext")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl AudioContext {
    /// Browsers hold a new context suspended until a user gesture; `autoplay`
    /// models hosts that do not.
    pub fn new(autoplay: bool) -> Self {
        let state = if autoplay { ContextState::Running } else { ContextState::Suspended };
        Self {
            inner: Arc::new(ContextInner {
                id: ContextId(next_id()),
                state: Mutex::new(state),
            }),
        }
    }

    pub fn probe(audio: &AudioConfig, analyser: &AnalyserConfig) -> Capability {
        if !audio.enabled {
            return Capability::Unsupported(AudioGraphError::AnalysisDisabled);
        }
        match AnalyserNode::validate(analyser) {
            Ok(()) => Capability::Supported(Self::new(audio.autoplay)),
            Err(err) => Capability::Unsupported(err),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn state(&self) -> ContextState {
        *self.inner.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ContextState::Running
    }

    pub fn resume(&self) -> GraphResult<()> {
        let mut state = self.inner.state.lock();
        match *state {
            ContextState::Closed => Err(AudioGraphError::ContextClosed),
            _ => {
                *state = ContextState::Running;
                Ok(())
            }
        }
    }

    pub fn suspend(&self) -> GraphResult<()> {
        let mut state = self.inner.state.lock();
        match *state {
            ContextState::Closed => Err(AudioGraphError::ContextClosed),
            _ => {
                *state = ContextState::Suspended;
                Ok(())
            }
        }
    }

    pub fn close(&self) {
        *self.inner.state.lock() = ContextState::Closed;
    }

    pub fn create_media_element_source(&self, element: &MediaElement) -> GraphResult<MediaSourceNode> {
        if self.state() == ContextState::Closed {
            return Err(AudioGraphError::ContextClosed);
        }
        element.capture(self.id())?;
        Ok(MediaSourceNode {
            context: self.id(),
            element: element.clone(),
        })
    }
}

/// Exclusive capture of a media element's output by one context.
#[derive(Debug, Clone)]
pub struct MediaSourceNode {
    context: ContextId,
    element: MediaElement,
}

impl MediaSourceNode {
    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn element(&self) -> &MediaElement {
        &self.element
    }
}

/// Decoded audio plus a transport. Cloning shares the same element.
#[derive(Clone)]
pub struct MediaElement {
    inner: Arc<ElementInner>,
}

struct ElementInner {
    id: ElementId,
    audio: AudioData,
    playback: Mutex<Playback>,
}

struct Playback {
    position: f64,
    paused: bool,
    captured_by: Option<ContextId>,
    resume_on_play: Vec<AudioContext>,
}

impl fmt::Debug for MediaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaElement")
            .field("id", &self.inner.id)
            .field("sample_rate", &self.inner.audio.sample_rate)
            .field("duration", &self.duration())
            .finish()
    }
}

impl MediaElement {
    pub fn new(audio: AudioData) -> Self {
        Self {
            inner: Arc::new(ElementInner {
                id: ElementId(next_id()),
                audio,
                playback: Mutex::new(Playback {
                    position: 0.0,
                    paused: true,
                    captured_by: None,
                    resume_on_play: Vec::new(),
                }),
            }),
        }
    }

    pub fn id(&self) -> ElementId {
        self.inner.id
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.audio.sample_rate
    }

    pub fn duration(&self) -> f64 {
        self.inner.audio.duration()
    }

    pub fn current_time(&self) -> f64 {
        self.inner.playback.lock().position
    }

    pub fn paused(&self) -> bool {
        self.inner.playback.lock().paused
    }

    pub fn ended(&self) -> bool {
        self.current_time() >= self.duration()
    }

    /// Starts playback. This is the user gesture: pending resume hooks fire
    /// here, and a hook whose resume fails stays armed for the next call.
    pub fn play(&self) {
        let hooks = {
            let mut playback = self.inner.playback.lock();
            if playback.position >= self.duration() {
                playback.position = 0.0;
            }
            playback.paused = false;
            std::mem::take(&mut playback.resume_on_play)
        };

        let mut failed = Vec::new();
        for context in hooks {
            if context.is_running() {
                continue;
            }
            match context.resume() {
                Ok(()) => log::info!("Audio context resumed on play of element {}", self.id()),
                Err(err) => {
                    log::warn!("Failed to resume audio context on play: {}", err);
                    failed.push(context);
                }
            }
        }

        if !failed.is_empty() {
            self.inner.playback.lock().resume_on_play.extend(failed);
        }
    }

    pub fn pause(&self) {
        self.inner.playback.lock().paused = true;
    }

    pub fn seek(&self, seconds: f64) {
        let duration = self.duration();
        self.inner.playback.lock().position = seconds.clamp(0.0, duration);
    }

    /// Moves the playhead by `dt` seconds of host time. Playback pauses at the end.
    pub fn advance(&self, dt: f64) {
        let duration = self.duration();
        let mut playback = self.inner.playback.lock();
        if playback.paused || dt <= 0.0 {
            return;
        }
        playback.position += dt;
        if playback.position >= duration {
            playback.position = duration;
            playback.paused = true;
        }
    }

    pub fn pending_resume_hooks(&self) -> usize {
        self.inner.playback.lock().resume_on_play.len()
    }

    pub(crate) fn arm_resume_on_play(&self, context: AudioContext) {
        self.inner.playback.lock().resume_on_play.push(context);
    }

    fn capture(&self, context: ContextId) -> GraphResult<()> {
        let mut playback = self.inner.playback.lock();
        if playback.captured_by.is_some() {
            return Err(AudioGraphError::SourceAlreadyCaptured(self.id()));
        }
        playback.captured_by = Some(context);
        Ok(())
    }

    /// Copies the `out.len()` samples that end at the playhead, zero padded
    /// before the start of the track. Returns false (and writes silence)
    /// while paused.
    pub(crate) fn read_window(&self, out: &mut [f32]) -> bool {
        let playback = self.inner.playback.lock();
        if playback.paused {
            out.fill(0.0);
            return false;
        }

        let samples = &self.inner.audio.samples;
        let end = ((playback.position * self.sample_rate() as f64) as usize).min(samples.len());
        let start = end.saturating_sub(out.len());
        let available = end - start;
        let pad = out.len() - available;
        out[..pad].fill(0.0);
        out[pad..].copy_from_slice(&samples[start..end]);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(len: usize, rate: u32) -> MediaElement {
        let samples = (0..len).map(|i| i as f32).collect();
        MediaElement::new(AudioData::new(samples, rate))
    }

    #[test]
    fn new_context_is_suspended_without_autoplay() {
        assert_eq!(AudioContext::new(false).state(), ContextState::Suspended);
        assert_eq!(AudioContext::new(true).state(), ContextState::Running);
    }

    #[test]
    fn closed_context_cannot_resume() {
        let ctx = AudioContext::new(false);
        ctx.close();
        assert_eq!(ctx.resume(), Err(AudioGraphError::ContextClosed));
        assert_eq!(ctx.suspend(), Err(AudioGraphError::ContextClosed));
    }

    #[test]
    fn element_can_only_be_captured_once() {
        let el = element(100, 100);
        let first = AudioContext::new(false);
        let second = AudioContext::new(false);

        let node = first.create_media_element_source(&el).unwrap();
        assert_eq!(node.element().id(), el.id());
        assert_eq!(
            first.create_media_element_source(&el).unwrap_err(),
            AudioGraphError::SourceAlreadyCaptured(el.id())
        );
        assert!(second.create_media_element_source(&el).is_err());
    }

    #[test]
    fn probe_rejects_disabled_and_invalid_settings() {
        let disabled = AudioConfig { enabled: false, autoplay: false };
        assert!(matches!(
            AudioContext::probe(&disabled, &AnalyserConfig::default()),
            Capability::Unsupported(AudioGraphError::AnalysisDisabled)
        ));

        let bad_fft = AnalyserConfig { fft_size: 1000, ..AnalyserConfig::default() };
        assert!(matches!(
            AudioContext::probe(&AudioConfig::default(), &bad_fft),
            Capability::Unsupported(AudioGraphError::InvalidFftSize(1000))
        ));

        assert!(matches!(
            AudioContext::probe(&AudioConfig::default(), &AnalyserConfig::default()),
            Capability::Supported(_)
        ));
    }

    #[test]
    fn play_fires_resume_hook_once() {
        let el = element(100, 100);
        let ctx = AudioContext::new(false);
        el.arm_resume_on_play(ctx.clone());

        el.play();
        assert!(ctx.is_running());
        assert_eq!(el.pending_resume_hooks(), 0);

        ctx.suspend().unwrap();
        el.play();
        assert_eq!(ctx.state(), ContextState::Suspended);
    }

    #[test]
    fn failed_resume_stays_armed() {
        let el = element(100, 100);
        let ctx = AudioContext::new(false);
        ctx.close();
        el.arm_resume_on_play(ctx);

        el.play();
        assert_eq!(el.pending_resume_hooks(), 1);
        el.play();
        assert_eq!(el.pending_resume_hooks(), 1);
    }

    #[test]
    fn advance_stops_at_end() {
        let el = element(100, 100);
        el.advance(0.5);
        assert_eq!(el.current_time(), 0.0);

        el.play();
        el.advance(0.25);
        assert!((el.current_time() - 0.25).abs() < 1e-9);
        el.advance(5.0);
        assert!(el.ended());
        assert!(el.paused());

        el.play();
        assert_eq!(el.current_time(), 0.0);
    }

    #[test]
    fn read_window_pads_before_track_start() {
        let el = element(100, 100);
        let mut out = [9.0f32; 4];
        assert!(!el.read_window(&mut out));
        assert_eq!(out, [0.0; 4]);

        el.play();
        el.seek(0.02);
        assert!(el.read_window(&mut out));
        assert_eq!(out, [0.0, 0.0, 0.0, 1.0]);

        el.seek(0.5);
        el.read_window(&mut out);
        assert_eq!(out, [46.0, 47.0, 48.0, 49.0]);
    }
}
