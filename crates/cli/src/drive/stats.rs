//! Drive run statistics.

use std::time::Duration;

use observability::DriveMetricsAggregator;
use session::SessionSummary;

/// Per-camera totals across every session of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraTotals {
    pub camera_id: String,
    pub frames_delivered: u64,
    pub decode_errors: u64,
    pub frames_encoded: u64,
    pub frames_failed: u64,
}

/// Statistics from a drive run
#[derive(Debug, Clone, Default)]
pub struct DriveStats {
    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Sessions built (initial load plus every town change)
    pub sessions: u64,

    /// Successful town changes
    pub town_changes: u64,

    pub weather_changes: u64,

    /// Drive-log rows written
    pub drive_rows: u64,

    /// Collision rows written
    pub collisions: u64,

    /// Collision events dropped (no ego alive or no location)
    pub collisions_dropped: u64,

    /// Frames handed to the display surface
    pub frames_presented: u64,

    /// Times the horn sounded
    pub horns_sounded: u64,

    /// Actors that survived a teardown
    pub leaked: usize,

    /// Per-camera capture totals, in rig order
    pub cameras: Vec<CameraTotals>,

    /// Tick-level metrics
    pub drive_metrics: DriveMetricsAggregator,
}

impl DriveStats {
    /// Fold torn-down session summaries into the totals
    pub fn absorb(&mut self, summaries: &[SessionSummary]) {
        for summary in summaries {
            self.drive_rows += summary.logs.drive_rows;
            self.collisions += summary.logs.collision_rows;
            self.collisions_dropped += summary.logs.collisions_dropped;
            self.leaked += summary.leaked;

            for report in &summary.capture.cameras {
                let totals = match self
                    .cameras
                    .iter_mut()
                    .position(|c| c.camera_id == report.camera_id)
                {
                    Some(i) => &mut self.cameras[i],
                    None => {
                        self.cameras.push(CameraTotals {
                            camera_id: report.camera_id.clone(),
                            ..Default::default()
                        });
                        let last = self.cameras.len() - 1;
                        &mut self.cameras[last]
                    }
                };
                totals.frames_delivered += report.stats.frames_delivered;
                totals.decode_errors += report.stats.decode_errors;
                if let Some(encoder) = report.encoder {
                    totals.frames_encoded += encoder.frames_written;
                    totals.frames_failed += encoder.frames_failed;
                }
            }
        }
    }

    /// Ticks processed
    pub fn ticks(&self) -> u64 {
        self.drive_metrics.ticks
    }

    /// Achieved control-loop rate
    pub fn tick_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Drive Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {}", self.ticks());
        println!("   ├─ Tick rate: {:.2} Hz", self.tick_rate());
        println!("   ├─ Sessions: {}", self.sessions);
        println!("   ├─ Town changes: {}", self.town_changes);
        println!("   ├─ Weather changes: {}", self.weather_changes);
        println!("   ├─ HUD frames presented: {}", self.frames_presented);
        println!("   └─ Horn sounded: {}", self.horns_sounded);

        println!("\n📝 Logs");
        println!("   ├─ Drive rows: {}", self.drive_rows);
        println!("   ├─ Collisions: {}", self.collisions);
        println!("   └─ Collisions dropped: {}", self.collisions_dropped);

        if !self.cameras.is_empty() {
            println!("\n📷 Cameras");
            for (i, camera) in self.cameras.iter().enumerate() {
                let prefix = if i == self.cameras.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: delivered={}, encoded={}, decode_errors={}, encode_failed={}",
                    prefix,
                    camera.camera_id,
                    camera.frames_delivered,
                    camera.frames_encoded,
                    camera.decode_errors,
                    camera.frames_failed
                );
            }
        }

        let summary = self.drive_metrics.summary();
        println!("\n📈 Drive Metrics");
        println!("   ├─ Speed (km/h): {}", summary.speed_kmh);
        println!("   ├─ Tick duration (ms): {}", summary.tick_ms);
        println!(
            "   ├─ Overruns: {} ({:.2}%)",
            summary.overruns, summary.overrun_rate
        );
        println!("   ├─ Gear changes: {}", summary.gear_changes);
        println!("   └─ Horn presses: {}", summary.horn_presses);

        if self.leaked > 0 {
            println!("\n⚠️  Leaked actors: {}", self.leaked);
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use capture::{CameraReport, CameraStatsSnapshot, CaptureReport, EncoderStats};
    use session::TrafficReport;
    use telemetry::LogSummary;

    fn summary(delivered: u64, encoded: Option<u64>, collisions: u64) -> SessionSummary {
        SessionSummary {
            map: "Town02".to_string(),
            town_index: 1,
            dir: PathBuf::from("recordings/20260101_120000"),
            traffic: TrafficReport::default(),
            capture: CaptureReport {
                cameras: vec![CameraReport {
                    index: 0,
                    camera_id: "front".to_string(),
                    video_path: None,
                    stats: CameraStatsSnapshot {
                        frames_delivered: delivered,
                        ..Default::default()
                    },
                    encoder: encoded.map(|frames_written| EncoderStats {
                        frames_written,
                        frames_failed: 0,
                    }),
                }],
            },
            logs: LogSummary {
                drive_rows: 10,
                collision_rows: collisions,
                collisions_dropped: 0,
            },
            teardown: Default::default(),
            leaked: 0,
        }
    }

    #[test]
    fn test_absorb_merges_cameras_across_sessions() {
        let mut stats = DriveStats::default();
        stats.absorb(&[summary(40, Some(40), 1), summary(25, None, 2)]);

        assert_eq!(stats.drive_rows, 20);
        assert_eq!(stats.collisions, 3);
        assert_eq!(stats.cameras.len(), 1);
        assert_eq!(stats.cameras[0].frames_delivered, 65);
        assert_eq!(stats.cameras[0].frames_encoded, 40);
    }

    #[test]
    fn test_tick_rate_without_duration() {
        let stats = DriveStats::default();
        assert_eq!(stats.tick_rate(), 0.0);
    }
}
