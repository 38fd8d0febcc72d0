//! Real-time audio features for music visualizers.
//!
//! An [`AnalyzerSession`] wraps an analysis node fed by a [`MediaElement`]
//! and, once per display frame, reduces its raw byte buffers to a
//! [`FeatureSnapshot`]: smoothed low/mid/high/energy, a 96-band max-pooled
//! spectrum, a 256-point waveform and a best-effort tempo.
//!
//! ```no_run
//! use wao::{AnalyzerSession, AudioData, Config, MediaElement};
//!
//! let config = Config::default();
//! let mut session = AnalyzerSession::new(&config);
//! let element = MediaElement::new(AudioData::new(vec![0.0; 44_100], 44_100));
//! session.connect(&element);
//! element.play();
//!
//! let snapshot = session.poll();
//! println!("low={:.2} bpm={:?}", snapshot.low, snapshot.bpm);
//! ```

pub mod audio;
pub mod config;
pub mod error;

pub use audio::analyser::AnalyserNode;
pub use audio::analysis::{AnalyzerSession, FeaturePipeline};
pub use audio::decode::{decode_audio, AudioData};
pub use audio::features::{BandIntensities, FeatureSnapshot};
pub use audio::graph::{AudioContext, Capability, ContextState, ElementId, MediaElement};
pub use audio::source::{ConnectOutcome, RawFrame, SampleSourceAdapter};
pub use audio::tempo::{TempoEstimator, TempoPhase};
pub use config::Config;
pub use error::AudioGraphError;
