mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::{Duration, Instant};

use cli::Cli;
use wao::config::{self, Config};
use wao::{decode_audio, AnalyzerSession, ConnectOutcome, FeatureSnapshot, MediaElement};

/// Minimum gap between tempo label refreshes.
const BPM_LABEL_INTERVAL_MS: f64 = 100.0;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameRecord<'a> {
    frame: u64,
    time_ms: f64,
    #[serde(flatten)]
    features: FeatureSnapshot<'a>,
}

/// Rounded "BPM n" text, refreshed at most every 100 ms.
#[derive(Default)]
struct BpmLabel {
    last_update_ms: Option<f64>,
}

impl BpmLabel {
    fn update(&mut self, bpm: Option<f32>, now_ms: f64) -> Option<String> {
        let bpm = bpm.filter(|b| b.is_finite())?;
        if self
            .last_update_ms
            .is_some_and(|last| now_ms - last <= BPM_LABEL_INTERVAL_MS)
        {
            return None;
        }
        self.last_update_ms = Some(now_ms);
        Some(format!("BPM {}", bpm.round() as u32))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli);

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    log::info!("wao - visualizer feature extraction");
    log::info!("Input: {}", cli.input.display());
    log::info!(
        "Analyser: fft={} smoothing={:.2} @ {}fps{}",
        config.analyser.fft_size,
        config.features.band_smoothing,
        config.output.fps,
        if cli.realtime { " (realtime)" } else { "" }
    );

    let audio = decode_audio(&cli.input)?;
    let element = MediaElement::new(audio);

    let mut session = AnalyzerSession::new(&config);
    match session.connect(&element) {
        ConnectOutcome::Connected => {}
        other => log::warn!("Analysis not attached ({:?}), output will be silent", other),
    }
    // The play gesture resumes the suspended context.
    element.play();

    let mut writer: Option<Box<dyn Write>> = if cli.bpm_only {
        None
    } else if cli.output.as_os_str() == "-" {
        Some(Box::new(BufWriter::new(std::io::stdout().lock())))
    } else {
        let file = File::create(&cli.output)
            .with_context(|| format!("Failed to create output: {}", cli.output.display()))?;
        Some(Box::new(BufWriter::new(file)))
    };

    let fps = config.output.fps.max(1);
    let dt = 1.0 / fps as f64;
    let total_frames = (element.duration() * fps as f64).ceil() as u64;

    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} polls {msg}")?
            .progress_chars("=>-"),
    );

    let mut raw = vec![0u8; session.raw_analysis_handle().map_or(0, |n| n.frequency_bin_count())];
    let mut label = BpmLabel::default();
    let started = Instant::now();
    let mut last_tick = started;

    for frame in 0..total_frames {
        let now_ms = if cli.realtime {
            let due = started + Duration::from_secs_f64(frame as f64 * dt);
            if let Some(wait) = due.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
            let now = Instant::now();
            element.advance(now.duration_since(last_tick).as_secs_f64());
            last_tick = now;
            None
        } else {
            element.advance(dt);
            Some(frame as f64 * dt * 1000.0)
        };

        let snapshot = match now_ms {
            Some(ms) => session.poll_at(ms),
            None => session.poll(),
        };
        let bpm = snapshot.bpm;
        let time_ms = now_ms.unwrap_or_else(|| started.elapsed().as_secs_f64() * 1000.0);

        if let Some(out) = writer.as_mut() {
            let mut line = serde_json::to_value(FrameRecord {
                frame,
                time_ms,
                features: snapshot,
            })?;
            if cli.raw_tap {
                if let Some(node) = session.raw_analysis_handle() {
                    node.byte_frequency_data(&mut raw);
                    line["rawFrequency"] = serde_json::to_value(&raw)?;
                }
            }
            serde_json::to_writer(&mut *out, &line)?;
            out.write_all(b"\n")?;
        }

        if let Some(text) = label.update(bpm, time_ms) {
            pb.set_message(text);
        }
        pb.set_position(frame + 1);
    }

    pb.finish();
    if let Some(mut out) = writer.take() {
        out.flush().context("Failed to flush feature output")?;
        log::info!("Wrote {} snapshots to {}", total_frames, cli.output.display());
    }

    let tempo = session.tempo();
    match tempo.bpm() {
        Some(bpm) => log::info!(
            "Estimated tempo: {:.1} BPM (confidence {:.2})",
            bpm,
            tempo.confidence()
        ),
        None => log::info!("No stable tempo found"),
    }

    session.teardown();
    Ok(())
}

/// File config, then CLI flags that differ from their defaults.
fn resolve_config(cli: &Cli) -> Config {
    let mut config = match cli.config.clone().or_else(config::discover_config) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) => {
                log::warn!("{:#}; using defaults", err);
                Config::default()
            }
        },
        None => Config::default(),
    };

    if cli.fps != 60 {
        config.output.fps = cli.fps;
    }
    if cli.fft_size != 2048 {
        config.analyser.fft_size = cli.fft_size;
    }
    if cli.smoothing != 0.35 {
        config.features.band_smoothing = cli.smoothing;
    }
    if cli.clip_detect {
        config.clipping.enabled = true;
    }
    config
}
