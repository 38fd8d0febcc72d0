pub mod analyser;
pub mod analysis;
pub mod bands;
pub mod clipping;
pub mod decode;
pub mod features;
pub mod graph;
pub mod smoothing;
pub mod source;
pub mod spectrum;
pub mod tempo;
pub mod waveform;
