use std::time::Instant;

use super::analyser::AnalyserNode;
use super::bands::extract_bands;
use super::clipping::ClippingDetector;
use super::features::FeatureSnapshot;
use super::graph::{AudioContext, ElementId, MediaElement};
use super::smoothing::BandSmoother;
use super::source::{ConnectOutcome, RawFrame, SampleSourceAdapter};
use super::spectrum::reduce_spectrum;
use super::tempo::TempoEstimator;
use super::waveform::reduce_waveform;
use crate::config::Config;

/// Bands, spectrum, waveform, tempo and clipping for one raw frame per poll.
///
/// Display buffers are allocated once and rewritten in place.
pub struct FeaturePipeline {
    smoother: BandSmoother,
    spectrum: Vec<f32>,
    waveform: Vec<f32>,
    tempo: TempoEstimator,
    clipping: ClippingDetector,
}

impl FeaturePipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            smoother: BandSmoother::new(config.features.band_smoothing),
            spectrum: vec![0.0; config.features.spectrum_bands],
            waveform: vec![0.0; config.features.waveform_len],
            tempo: TempoEstimator::new(&config.tempo),
            clipping: ClippingDetector::new(&config.clipping),
        }
    }

    pub fn process(&mut self, frame: RawFrame<'_>, now_ms: f64) -> FeatureSnapshot<'_> {
        let bands = self.smoother.update(extract_bands(frame.frequency));
        reduce_spectrum(frame.frequency, &mut self.spectrum);
        reduce_waveform(frame.time, &mut self.waveform);

        self.tempo.update(bands.energy, now_ms);
        let clipping = self.clipping.update(frame.time);

        FeatureSnapshot {
            low: bands.low,
            mid: bands.mid,
            high: bands.high,
            energy: bands.energy,
            bpm: self.tempo.bpm(),
            bpm_confidence: self.tempo.confidence(),
            clipping,
            spectrum: Some(self.spectrum.as_slice()),
            waveform: Some(self.waveform.as_slice()),
        }
    }

    pub fn tempo(&self) -> &TempoEstimator {
        &self.tempo
    }

    pub fn reset_tempo(&mut self) {
        self.tempo.reset();
    }
}

/// Caller-owned analysis session: one source adapter plus one pipeline.
///
/// Construct once, connect a media element when playback is set up, and call
/// [`poll`](Self::poll) once per rendered frame. Polling never fails; without
/// a usable source it returns [`FeatureSnapshot::default`].
pub struct AnalyzerSession {
    source: SampleSourceAdapter,
    pipeline: FeaturePipeline,
    epoch: Instant,
}

impl AnalyzerSession {
    pub fn new(config: &Config) -> Self {
        Self {
            source: SampleSourceAdapter::new(&config.audio, &config.analyser),
            pipeline: FeaturePipeline::new(config),
            epoch: Instant::now(),
        }
    }

    /// Session on a context shared with another consumer.
    pub fn with_context(config: &Config, context: AudioContext) -> Self {
        Self {
            source: SampleSourceAdapter::with_context(context, &config.analyser),
            pipeline: FeaturePipeline::new(config),
            epoch: Instant::now(),
        }
    }

    /// Links `element` into analysis. A new source starts tempo tracking over;
    /// band smoothing carries on.
    pub fn connect(&mut self, element: &MediaElement) -> ConnectOutcome {
        let previous = self.source.connected_element();
        let outcome = self.source.connect(element);
        if outcome == ConnectOutcome::Connected && previous != Some(element.id()) {
            self.pipeline.reset_tempo();
        }
        outcome
    }

    pub fn disconnect(&mut self) {
        self.source.disconnect();
    }

    /// Disconnects and closes the audio context; later polls return defaults.
    pub fn teardown(&mut self) {
        self.source.teardown();
        self.pipeline.reset_tempo();
    }

    /// Polls using the session's own monotonic clock.
    pub fn poll(&mut self) -> FeatureSnapshot<'_> {
        let now_ms = self.epoch.elapsed().as_secs_f64() * 1000.0;
        self.poll_at(now_ms)
    }

    /// Polls with a caller-supplied monotonic timestamp in milliseconds.
    pub fn poll_at(&mut self, now_ms: f64) -> FeatureSnapshot<'_> {
        match self.source.pull() {
            Some(frame) => self.pipeline.process(frame, now_ms),
            None => FeatureSnapshot::default(),
        }
    }

    /// Live analysis node for consumers that want unreduced data.
    pub fn raw_analysis_handle(&self) -> Option<&AnalyserNode> {
        self.source.raw_analysis_handle()
    }

    pub fn connected_element(&self) -> Option<ElementId> {
        self.source.connected_element()
    }

    pub fn source(&self) -> &SampleSourceAdapter {
        &self.source
    }

    pub fn tempo(&self) -> &TempoEstimator {
        self.pipeline.tempo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::AudioData;
    use crate::audio::tempo::TempoPhase;
    use crate::config::{AudioConfig, ClippingConfig};

    fn pipeline() -> FeaturePipeline {
        FeaturePipeline::new(&Config::default())
    }

    fn running_session() -> AnalyzerSession {
        let config = Config {
            audio: AudioConfig { enabled: true, autoplay: true },
            ..Config::default()
        };
        AnalyzerSession::new(&config)
    }

    fn tone(freq: f32, amplitude: f32, seconds: u32) -> MediaElement {
        let rate = 44_100u32;
        let samples = (0..rate * seconds)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect();
        MediaElement::new(AudioData::new(samples, rate))
    }

    fn noise(amplitude: f32, seconds: u32) -> MediaElement {
        let mut state = 0x2545_f491u32;
        let samples = (0..44_100 * seconds)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                amplitude * ((state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0)
            })
            .collect();
        MediaElement::new(AudioData::new(samples, 44_100))
    }

    fn silence(seconds: u32) -> MediaElement {
        MediaElement::new(AudioData::new(vec![0.0; 44_100 * seconds as usize], 44_100))
    }

    #[test]
    fn full_scale_bins_converge_to_one() {
        let mut pipeline = pipeline();
        let freq = vec![255u8; 1024];
        let time = vec![128u8; 2048];
        let mut last = FeatureSnapshot::default().bands();
        for i in 0..20 {
            let snap = pipeline.process(RawFrame { frequency: &freq, time: &time }, i as f64 * 16.0);
            last = snap.bands();
        }
        for v in [last.low, last.mid, last.high, last.energy] {
            assert!(v > 0.99 && v <= 1.0, "v={v}");
        }
    }

    #[test]
    fn snapshot_buffers_have_fixed_sizes() {
        let mut pipeline = pipeline();
        let freq = vec![10u8; 1024];
        let time = vec![128u8; 2048];
        let snap = pipeline.process(RawFrame { frequency: &freq, time: &time }, 0.0);
        assert_eq!(snap.spectrum.unwrap().len(), 96);
        assert_eq!(snap.waveform.unwrap().len(), 256);
        assert!(!snap.clipping);
        assert_eq!(snap.bpm, None);
    }

    #[test]
    fn pipeline_tracks_tempo_from_energy_pulses() {
        let mut pipeline = pipeline();
        let loud = vec![255u8; 1024];
        let quiet = vec![0u8; 1024];
        let time = vec![128u8; 2048];

        // 60 Hz polling, a loud frame every 30 polls (500 ms)
        let mut bpm = None;
        for i in 0..600u32 {
            let freq = if i % 30 == 0 { &loud } else { &quiet };
            let now = i as f64 * 1000.0 / 60.0;
            bpm = pipeline.process(RawFrame { frequency: freq, time: &time }, now).bpm;
        }
        let bpm = bpm.unwrap();
        assert!((bpm - 120.0).abs() < 1.0, "bpm={bpm}");
    }

    #[test]
    fn clipping_extension_follows_config() {
        let config = Config {
            clipping: ClippingConfig { enabled: true, consecutive_polls: 2 },
            ..Config::default()
        };
        let mut pipeline = FeaturePipeline::new(&config);
        let freq = vec![0u8; 1024];
        let mut time = vec![128u8; 2048];
        time[100] = 255;
        assert!(!pipeline.process(RawFrame { frequency: &freq, time: &time }, 0.0).clipping);
        assert!(pipeline.process(RawFrame { frequency: &freq, time: &time }, 16.0).clipping);
    }

    #[test]
    fn poll_without_source_returns_default_exactly() {
        let mut session = AnalyzerSession::new(&Config::default());
        assert_eq!(session.poll(), FeatureSnapshot::default());
        assert_eq!(session.poll_at(1000.0), FeatureSnapshot::default());
    }

    #[test]
    fn unsupported_platform_returns_default() {
        let config = Config {
            audio: AudioConfig { enabled: false, autoplay: false },
            ..Config::default()
        };
        let mut session = AnalyzerSession::new(&config);
        let el = tone(440.0, 0.5, 1);
        assert_eq!(session.connect(&el), ConnectOutcome::Unsupported);
        el.play();
        el.advance(0.5);
        assert_eq!(session.poll(), FeatureSnapshot::default());
        assert!(session.raw_analysis_handle().is_none());
    }

    #[test]
    fn polls_follow_the_connected_source() {
        let mut session = running_session();
        let loud = noise(0.9, 2);
        let quiet = silence(2);
        loud.play();
        quiet.play();
        loud.seek(1.0);
        quiet.seek(1.0);

        assert_eq!(session.connect(&loud), ConnectOutcome::Connected);
        let mut energy = 0.0;
        for i in 0..10 {
            energy = session.poll_at(i as f64 * 16.0).energy;
        }
        assert!(energy > 0.05, "energy={energy}");

        assert_eq!(session.connect(&quiet), ConnectOutcome::Connected);
        assert_eq!(session.source().live_connections(), 1);
        assert_eq!(session.connected_element(), Some(quiet.id()));

        // analyser magnitudes and band smoothing both decay towards silence
        for i in 10..200 {
            energy = session.poll_at(i as f64 * 16.0).energy;
        }
        assert!(energy < 1e-3, "energy={energy}");
    }

    #[test]
    fn new_source_resets_tempo() {
        let mut session = running_session();
        let a = silence(1);
        let b = silence(1);
        session.connect(&a);

        let loud = vec![255u8; 1024];
        let quiet = vec![0u8; 1024];
        let time = vec![128u8; 2048];
        for i in 0..200u32 {
            let freq = if i % 50 == 0 { &loud } else { &quiet };
            session.pipeline.process(RawFrame { frequency: freq, time: &time }, i as f64 * 10.0);
        }
        assert_eq!(session.tempo().phase(), TempoPhase::TrackingTempo);

        session.connect(&a);
        assert_eq!(session.tempo().phase(), TempoPhase::TrackingTempo);

        session.connect(&b);
        assert_eq!(session.tempo().phase(), TempoPhase::NoOnsetYet);
        assert_eq!(session.tempo().bpm(), None);
    }

    #[test]
    fn teardown_falls_back_to_default() {
        let mut session = running_session();
        let el = tone(440.0, 0.5, 1);
        el.play();
        session.connect(&el);
        assert!(session.poll().has_data());
        session.teardown();
        assert_eq!(session.poll(), FeatureSnapshot::default());

        assert_eq!(session.connect(&el), ConnectOutcome::Unsupported);
        assert_eq!(session.connect(&tone(220.0, 0.5, 1)), ConnectOutcome::Unsupported);
        assert_eq!(session.poll(), FeatureSnapshot::default());
    }
}
