//! Sample source adapter: owns the analysis node and the single live link
//! from a media element into it, and hands out raw byte buffers per poll.

use std::collections::{HashMap, HashSet};

use super::analyser::AnalyserNode;
use super::graph::{AudioContext, Capability, ContextState, ElementId, MediaElement, MediaSourceNode};
use crate::config::{AnalyserConfig, AudioConfig};
use crate::error::AudioGraphError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// The element is captured by someone else; the previous link is kept.
    AlreadyConnectedElsewhere,
    Unsupported,
}

/// Raw analysis output for one poll. Both slices are overwritten next poll.
#[derive(Clone, Copy, Debug)]
pub struct RawFrame<'a> {
    /// One byte per frequency bin, `fft_size / 2` long.
    pub frequency: &'a [u8],
    /// Byte waveform centred on 128, `fft_size` long.
    pub time: &'a [u8],
}

pub struct SampleSourceAdapter {
    probe: Probe,
}

enum Probe {
    Supported(Box<Backend>),
    Unsupported(AudioGraphError),
}

struct Backend {
    context: AudioContext,
    analyser: AnalyserNode,
    /// Capture is permanent, so nodes (and the audio they share with their
    /// element) stay cached until teardown to allow switching back.
    sources: HashMap<ElementId, MediaSourceNode>,
    link: Option<ElementId>,
    hooked: HashSet<ElementId>,
    frequency: Vec<u8>,
    time: Vec<u8>,
}

impl SampleSourceAdapter {
    /// Probes the host once; every later call branches on the result.
    pub fn new(audio: &AudioConfig, analyser: &AnalyserConfig) -> Self {
        match AudioContext::probe(audio, analyser) {
            Capability::Supported(context) => Self::with_context(context, analyser),
            Capability::Unsupported(reason) => {
                log::warn!("Audio analysis unsupported ({}), features fall back to silence", reason);
                Self { probe: Probe::Unsupported(reason) }
            }
        }
    }

    /// Builds on an existing context, e.g. one shared with another consumer.
    pub fn with_context(context: AudioContext, analyser: &AnalyserConfig) -> Self {
        let probe = match AnalyserNode::new(analyser) {
            Ok(node) => {
                let bins = node.frequency_bin_count();
                let window = node.fft_size();
                Probe::Supported(Box::new(Backend {
                    context,
                    analyser: node,
                    sources: HashMap::new(),
                    link: None,
                    hooked: HashSet::new(),
                    frequency: vec![0; bins],
                    time: vec![128; window],
                }))
            }
            Err(reason) => {
                log::warn!("Cannot create analyser ({}), features fall back to silence", reason);
                Probe::Unsupported(reason)
            }
        };
        Self { probe }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self.probe, Probe::Supported(_))
    }

    pub fn unsupported_reason(&self) -> Option<&AudioGraphError> {
        match &self.probe {
            Probe::Supported(_) => None,
            Probe::Unsupported(reason) => Some(reason),
        }
    }

    pub fn context(&self) -> Option<&AudioContext> {
        match &self.probe {
            Probe::Supported(backend) => Some(&backend.context),
            Probe::Unsupported(_) => None,
        }
    }

    /// Routes `element` into the analyser, replacing the current link.
    ///
    /// The old link is only severed once the new element has a source node,
    /// so a capture conflict leaves analysis running on the previous source.
    pub fn connect(&mut self, element: &MediaElement) -> ConnectOutcome {
        let backend = match &mut self.probe {
            Probe::Supported(backend) => backend,
            Probe::Unsupported(reason) => {
                log::warn!("Ignoring connect of element {}: {}", element.id(), reason);
                return ConnectOutcome::Unsupported;
            }
        };

        let id = element.id();
        if backend.context.state() == ContextState::Closed {
            log::warn!("Ignoring connect of element {}: audio context is closed", id);
            return ConnectOutcome::Unsupported;
        }
        if backend.link == Some(id) {
            return ConnectOutcome::Connected;
        }

        if !backend.sources.contains_key(&id) {
            match backend.context.create_media_element_source(element) {
                Ok(node) => {
                    backend.sources.insert(id, node);
                }
                Err(err @ AudioGraphError::SourceAlreadyCaptured(_)) => {
                    log::warn!("{}; keeping the current connection", err);
                    return ConnectOutcome::AlreadyConnectedElsewhere;
                }
                Err(err) => {
                    log::warn!("Could not attach analysis to element {}: {}", id, err);
                    return ConnectOutcome::Unsupported;
                }
            }
        }

        if let Some(previous) = backend.link.replace(id) {
            log::debug!("Disconnected element {} from analyser", previous);
        }
        backend.analyser.set_sample_rate(element.sample_rate());

        if backend.hooked.insert(id) {
            element.arm_resume_on_play(backend.context.clone());
        }

        log::info!(
            "Connected element {} ({}Hz, {:.1}s) to analyser",
            id,
            element.sample_rate(),
            element.duration()
        );
        ConnectOutcome::Connected
    }

    pub fn disconnect(&mut self) {
        if let Probe::Supported(backend) = &mut self.probe {
            if let Some(previous) = backend.link.take() {
                log::debug!("Disconnected element {} from analyser", previous);
            }
        }
    }

    pub fn connected_element(&self) -> Option<ElementId> {
        match &self.probe {
            Probe::Supported(backend) => backend.link,
            Probe::Unsupported(_) => None,
        }
    }

    pub fn live_connections(&self) -> usize {
        usize::from(self.connected_element().is_some())
    }

    /// Runs one analysis step and returns the raw buffers, or `None` when
    /// unsupported, torn down, or nothing is linked.
    pub fn pull(&mut self) -> Option<RawFrame<'_>> {
        let Probe::Supported(backend) = &mut self.probe else {
            return None;
        };
        if backend.context.state() == ContextState::Closed {
            return None;
        }
        let Backend {
            context,
            analyser,
            sources,
            link,
            frequency,
            time,
            ..
        } = &mut **backend;

        let node = sources.get(&(*link)?)?;
        let element = context.is_running().then(|| node.element());
        analyser.render(element);
        analyser.byte_frequency_data(frequency);
        analyser.byte_time_domain_data(time);

        Some(RawFrame {
            frequency: &frequency[..],
            time: &time[..],
        })
    }

    /// The live analysis node, for consumers that want full-resolution data.
    pub fn raw_analysis_handle(&self) -> Option<&AnalyserNode> {
        match &self.probe {
            Probe::Supported(backend) => Some(&backend.analyser),
            Probe::Unsupported(_) => None,
        }
    }

    /// Drops the link and cached source nodes, then closes the context.
    /// Connects after this report `Unsupported`.
    pub fn teardown(&mut self) {
        self.disconnect();
        if let Probe::Supported(backend) = &mut self.probe {
            backend.sources.clear();
            backend.context.close();
        }
    }

    /// Source nodes held by this adapter, linked or not.
    pub fn cached_sources(&self) -> usize {
        match &self.probe {
            Probe::Supported(backend) => backend.sources.len(),
            Probe::Unsupported(_) => 0,
        }
    }
}
