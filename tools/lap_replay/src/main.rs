//! Replays a recorded GPS session through the lap timing engine
//!
//! Reads a track configuration (JSON) and a session log (one JSON fix per
//! line) and prints the launch, every lap and every sector split.
//!
//! ```text
//! lap-replay --track monza.json --samples session.jsonl
//! RUST_LOG=debug lap-replay --track monza.json --samples session.jsonl
//! ```
//!
//! Session log line:
//!
//! ```json
//! {"lat": 45.6156, "lon": 9.2811, "speed": 41.2, "millis": 12400, "quality": "Fix"}
//! ```
//!
//! `millis` is time since the first reliable fix; leave it out (or null) for
//! fixes logged before that.

mod reference;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use lap_timing::{
    DefaultSignalClassifier, FixedTrack, GeoPoint, GpsQuality, GpsSample, LapContext, LapStats,
    TrackConfig, LAP_STARTED, NEW_LAP, SECTOR_CROSSED, SECTOR_REFINED, START_FINISH_REFINED,
};
use log::{info, warn};
use serde::Deserialize;

use reference::{CrossingLog, Odometer, StartLineLaunch};

#[derive(Parser)]
#[command(name = "lap-replay")]
#[command(about = "Replay a recorded GPS session through the lap timer", long_about = None)]
struct Cli {
    /// Track configuration (JSON)
    #[arg(short, long)]
    track: PathBuf,

    /// Session log, one JSON fix per line
    #[arg(short, long)]
    samples: PathBuf,

    /// Minimum speed (m/s) through the start line for the launch to count
    #[arg(long, default_value_t = 5.0)]
    launch_speed: f32,

    /// Ignore sector waypoints even if the track defines them
    #[arg(long)]
    no_sectors: bool,
}

/// One line of the session log
#[derive(Debug, Deserialize)]
struct FixRecord {
    lat: f64,
    lon: f64,
    #[serde(default)]
    speed: f32,
    #[serde(default)]
    millis: Option<u32>,
    #[serde(default = "default_quality")]
    quality: GpsQuality,
}

fn default_quality() -> GpsQuality {
    GpsQuality::Fix
}

impl From<FixRecord> for GpsSample {
    fn from(r: FixRecord) -> Self {
        GpsSample {
            point: GeoPoint::new(r.lat, r.lon),
            quality: r.quality,
            speed: r.speed,
            millis_since_first_fix: r.millis,
        }
    }
}

fn load_track(path: &Path) -> Result<TrackConfig> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open track config: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse track config: {}", path.display()))
}

fn format_ms(ms: u32) -> String {
    format!("{}:{:06.3}", ms / 60_000, (ms % 60_000) as f32 / 1000.0)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = load_track(&cli.track)?;
    if cli.no_sectors {
        config.sector_timing = false;
    }
    info!(
        "Track {}: {} sectors, geofence {:.1}m",
        cli.track.display(),
        config.track.sector_count(),
        config.radius_meters()
    );

    let samples = File::open(&cli.samples)
        .with_context(|| format!("Failed to open session log: {}", cli.samples.display()))?;

    let mut launch = StartLineLaunch::new(cli.launch_speed);
    let mut auto_track = FixedTrack;
    let mut timer = CrossingLog::default();
    let mut odometer = Odometer::default();

    let mut stats = LapStats::new();
    stats.start_session(&mut timer);

    let mut laps: Vec<u32> = Vec::new();
    let mut best: Option<u32> = None;
    let mut fixes = 0usize;

    for (index, line) in BufReader::new(samples).lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_no))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: FixRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping line {}: {}", line_no, e);
                continue;
            }
        };
        let sample = GpsSample::from(record);
        fixes += 1;

        if !sample.is_cold() {
            odometer.advance(&sample.point);
        }

        let mut ctx = LapContext {
            config: &config,
            launch_control: &mut launch,
            auto_track: &mut auto_track,
            classifier: &DefaultSignalClassifier,
            predictive_timer: &mut timer,
            distance: &mut odometer,
        };
        let flags = stats.process_update(&sample, &mut ctx);

        if flags & LAP_STARTED != 0 {
            println!(
                "Launch  at {}  (odometer {:.0} m)",
                format_ms(stats.last_start_finish_ms()),
                odometer.km * 1000.0
            );
        }

        if flags & SECTOR_CROSSED != 0 {
            println!(
                "  S{:<2}   {}",
                stats.last_sector().map(|s| s + 1).unwrap_or(0),
                format_ms(stats.last_sector_ms())
            );
        }

        if flags & NEW_LAP != 0 {
            let lap_ms = stats.last_lap_ms();
            let is_best = best.map_or(true, |b| lap_ms < b);
            if is_best {
                best = Some(lap_ms);
            }
            laps.push(lap_ms);
            println!(
                "Lap {:<3} {}{}",
                stats.lap_count(),
                format_ms(lap_ms),
                if is_best { "  *" } else { "" }
            );
        }

        if flags & START_FINISH_REFINED != 0 {
            if let Some(c) = stats.refined_start_finish_crossing() {
                info!("Start/finish crossing refined to {}ms", c.millis);
            }
        }

        if flags & SECTOR_REFINED != 0 {
            if let Some(c) = stats.refined_sector_crossing() {
                info!("Sector crossing refined to {}ms", c.millis);
            }
        }
    }

    println!();
    println!("Fixes:  {}", fixes);
    println!("State:  {:?}", stats.state());
    println!("Laps:   {}", laps.len());
    if let Some(first) = timer.crossings.first() {
        println!(
            "Start:  ({:.6}, {:.6}) at {}",
            first.point.latitude,
            first.point.longitude,
            format_ms(first.millis)
        );
    }
    if let Some(b) = best {
        println!("Best:   {}", format_ms(b));
    }

    Ok(())
}
