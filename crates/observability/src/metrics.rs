//! Drive loop metrics
//!
//! Recording helpers for the per-tick control loop plus an in-memory
//! aggregator used for the end-of-run summary.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::{Gear, VehicleControl};
use metrics::{counter, gauge, histogram};

/// Record one control tick.
///
/// Called once per loop iteration after the control has been applied.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_tick;
///
/// let sample = manager.tick(input.control).await?;
/// record_tick(&sample.control, sample.speed_kmh, started.elapsed());
/// ```
pub fn record_tick(control: &VehicleControl, speed_kmh: f64, duration: Duration) {
    counter!("carla_cockpit_ticks_total").increment(1);
    histogram!("carla_cockpit_tick_duration_ms").record(duration.as_secs_f64() * 1000.0);

    gauge!("carla_cockpit_speed_kmh").set(speed_kmh);
    histogram!("carla_cockpit_speed_kmh_hist").record(speed_kmh);

    gauge!("carla_cockpit_steer").set(control.steer);
    gauge!("carla_cockpit_throttle").set(control.throttle);
    gauge!("carla_cockpit_brake").set(control.brake);
}

/// Record a tick that overran its period
pub fn record_tick_overrun(overrun: Duration) {
    counter!("carla_cockpit_tick_overruns_total").increment(1);
    histogram!("carla_cockpit_tick_overrun_ms").record(overrun.as_secs_f64() * 1000.0);
}

/// Record a gear toggle
pub fn record_gear_change(gear: Gear) {
    counter!(
        "carla_cockpit_gear_changes_total",
        "gear" => gear.label()
    )
    .increment(1);
}

pub fn record_horn() {
    counter!("carla_cockpit_horn_total").increment(1);
}

/// Record a town change, successful or not
pub fn record_town_change(map: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "carla_cockpit_town_changes_total",
        "map" => map.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a frame presented to the display surface
pub fn record_frame_presented(cameras_drawn: usize) {
    counter!("carla_cockpit_hud_frames_total").increment(1);
    gauge!("carla_cockpit_hud_cameras_drawn").set(cameras_drawn as f64);
}

/// In-memory drive statistics
///
/// Kept alongside the Prometheus recorder so the CLI can print a summary
/// without scraping its own endpoint.
#[derive(Debug, Clone, Default)]
pub struct DriveMetricsAggregator {
    /// Ticks processed
    pub ticks: u64,

    /// Ticks that exceeded the loop period
    pub overruns: u64,

    /// Ticks driven in reverse
    pub reverse_ticks: u64,

    pub gear_changes: u64,

    pub horn_presses: u64,

    /// Speed statistics (km/h)
    pub speed_stats: RunningStats,

    /// Tick duration statistics (ms)
    pub tick_stats: RunningStats,

    /// Town changes per map name
    pub town_changes: BTreeMap<String, u64>,
}

impl DriveMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one processed tick
    pub fn update(&mut self, control: &VehicleControl, speed_kmh: f64, duration: Duration) {
        self.ticks += 1;
        if control.reverse {
            self.reverse_ticks += 1;
        }
        self.speed_stats.push(speed_kmh);
        self.tick_stats.push(duration.as_secs_f64() * 1000.0);
    }

    pub fn record_overrun(&mut self) {
        self.overruns += 1;
    }

    pub fn record_gear_change(&mut self) {
        self.gear_changes += 1;
    }

    pub fn record_horn(&mut self) {
        self.horn_presses += 1;
    }

    pub fn record_town_change(&mut self, map: &str) {
        *self.town_changes.entry(map.to_string()).or_insert(0) += 1;
    }

    /// Build a summary report
    pub fn summary(&self) -> DriveSummary {
        DriveSummary {
            ticks: self.ticks,
            overruns: self.overruns,
            overrun_rate: percent(self.overruns, self.ticks),
            reverse_rate: percent(self.reverse_ticks, self.ticks),
            gear_changes: self.gear_changes,
            horn_presses: self.horn_presses,
            speed_kmh: StatsSummary::from(&self.speed_stats),
            tick_ms: StatsSummary::from(&self.tick_stats),
            town_changes: self.town_changes.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Drive metrics summary
#[derive(Debug, Clone, Default)]
pub struct DriveSummary {
    pub ticks: u64,
    pub overruns: u64,
    pub overrun_rate: f64,
    pub reverse_rate: f64,
    pub gear_changes: u64,
    pub horn_presses: u64,
    pub speed_kmh: StatsSummary,
    pub tick_ms: StatsSummary,
    pub town_changes: BTreeMap<String, u64>,
}

impl std::fmt::Display for DriveSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Drive Metrics Summary ===")?;
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(f, "Overruns: {} ({:.2}%)", self.overruns, self.overrun_rate)?;
        writeln!(f, "Reverse: {:.2}% of ticks", self.reverse_rate)?;
        writeln!(f, "Gear changes: {}", self.gear_changes)?;
        writeln!(f, "Horn presses: {}", self.horn_presses)?;
        writeln!(f, "Speed (km/h): {}", self.speed_kmh)?;
        writeln!(f, "Tick duration (ms): {}", self.tick_ms)?;

        if !self.town_changes.is_empty() {
            writeln!(f, "Town changes:")?;
            for (map, count) in &self.town_changes {
                writeln!(f, "  {}: {}", map, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = DriveMetricsAggregator::new();

        let forward = VehicleControl {
            throttle: 0.5,
            ..Default::default()
        };
        let reverse = VehicleControl {
            reverse: true,
            ..forward
        };

        aggregator.update(&forward, 30.0, Duration::from_millis(4));
        aggregator.update(&reverse, 10.0, Duration::from_millis(6));
        aggregator.record_gear_change();
        aggregator.record_town_change("Town03");
        aggregator.record_town_change("Town03");

        let summary = aggregator.summary();
        assert_eq!(summary.ticks, 2);
        assert!((summary.reverse_rate - 50.0).abs() < 1e-10);
        assert_eq!(summary.gear_changes, 1);
        assert!((summary.speed_kmh.mean - 20.0).abs() < 1e-10);
        assert!((summary.tick_ms.max - 6.0).abs() < 1e-10);
        assert_eq!(summary.town_changes.get("Town03"), Some(&2));
    }

    #[test]
    fn test_empty_summary() {
        let summary = DriveMetricsAggregator::new().summary();
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.overrun_rate, 0.0);
        assert_eq!(format!("{}", summary.speed_kmh), "N/A");
    }

    #[test]
    fn test_summary_display() {
        let summary = DriveSummary {
            ticks: 600,
            overruns: 6,
            overrun_rate: 1.0,
            speed_kmh: StatsSummary {
                count: 600,
                min: 0.0,
                max: 48.5,
                mean: 22.0,
                std_dev: 9.0,
            },
            ..Default::default()
        };

        let output = format!("{}", summary);
        assert!(output.contains("Ticks: 600"));
        assert!(output.contains("1.00%"));
        assert!(output.contains("max=48.500"));
    }
}
