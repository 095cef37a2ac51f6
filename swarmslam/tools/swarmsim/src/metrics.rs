//! Run metrics and post-run analysis
//!
//! Collects the per-tick [`StepStats`] of a run, derives summary figures and
//! turns them into tuning recommendations. Results export to CSV (a summary
//! section followed by the tick series) or JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use swarmslam::config::SimulationConfig;
use swarmslam::simulation::StepStats;

/// Collisions at which the efficiency penalty saturates
pub const COLLISION_PENALTY_SATURATION: f64 = 50.0;

/// Exploration below this fraction is considered poor
pub const LOW_EXPLORATION: f64 = 0.5;

/// Tolerated collisions per agent over a whole run
pub const COLLISIONS_PER_AGENT: u64 = 10;

/// Run-mean agent speed below this is considered sluggish
pub const LOW_AVERAGE_SPEED: f64 = 1.0;

/// Efficiency below this calls for retuning
pub const LOW_EFFICIENCY: f64 = 0.5;

/// Suggested parameter change after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    IncreaseCoverage,
    ReduceCollisions,
    RaiseSpeed,
    Rebalance,
    KeepSettings,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Recommendation::IncreaseCoverage => {
                "Exploration is low: increase the sensor range or add agents"
            }
            Recommendation::ReduceCollisions => {
                "Many collisions: increase the safety distance or adjust turn sensitivity"
            }
            Recommendation::RaiseSpeed => {
                "Average speed is low: raise the agent speed or reduce obstacles"
            }
            Recommendation::Rebalance => "Overall efficiency is low: rebalance the parameters",
            Recommendation::KeepSettings => "Good performance: keep the current settings",
        };
        f.write_str(text)
    }
}

/// Metrics for one simulation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    // Run metadata
    pub run_name: String,
    pub run_description: String,
    pub seed: Option<u64>,
    pub agent_count: usize,
    pub grid_size: usize,
    pub layout: String,

    // Latest values
    pub ticks: u64,
    pub exploration_rate: f64,
    pub map_coverage: f64,
    pub total_collisions: u64,
    pub stuck_agents: usize,
    pub average_distance: f64,
    pub average_speed: f64,

    // Extremes over the run
    pub peak_stuck_agents: usize,
    pub peak_map_coverage: f64,

    // Historical data
    pub history: Vec<StepStats>,
}

impl RunMetrics {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            run_name: name.into(),
            run_description: description.into(),
            ..Default::default()
        }
    }

    /// Copy the run parameters the analysis depends on
    pub fn with_config(mut self, config: &SimulationConfig, seed: u64) -> Self {
        self.seed = Some(seed);
        self.agent_count = config.agents.count;
        self.grid_size = config.environment.size;
        self.layout = config.environment.layout.to_string();
        self
    }

    /// Drop recorded ticks, keeping the run metadata
    pub fn reset(&mut self) {
        let name = std::mem::take(&mut self.run_name);
        let description = std::mem::take(&mut self.run_description);
        *self = Self {
            run_name: name,
            run_description: description,
            seed: self.seed,
            agent_count: self.agent_count,
            grid_size: self.grid_size,
            layout: std::mem::take(&mut self.layout),
            ..Default::default()
        };
    }

    /// Fold one tick into the metrics
    pub fn record(&mut self, stats: &StepStats) {
        self.ticks = stats.tick;
        self.exploration_rate = stats.exploration_rate;
        self.map_coverage = stats.map_coverage;
        self.total_collisions = stats.total_collisions;
        self.stuck_agents = stats.stuck_agents;
        self.average_distance = stats.average_distance;
        self.average_speed = stats.average_speed;

        self.peak_stuck_agents = self.peak_stuck_agents.max(stats.stuck_agents);
        self.peak_map_coverage = self.peak_map_coverage.max(stats.map_coverage);

        self.history.push(stats.clone());
    }

    /// Exploration discounted by collisions, in [0, 1]
    pub fn efficiency(&self) -> f64 {
        let penalty = (self.total_collisions as f64 / COLLISION_PENALTY_SATURATION).min(1.0);
        self.exploration_rate * (1.0 - penalty)
    }

    /// Mean agent speed over all recorded ticks
    pub fn mean_speed(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().map(|s| s.average_speed).sum::<f64>() / self.history.len() as f64
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        let mut out = Vec::new();

        if self.exploration_rate < LOW_EXPLORATION {
            out.push(Recommendation::IncreaseCoverage);
        }
        if self.total_collisions > self.agent_count as u64 * COLLISIONS_PER_AGENT {
            out.push(Recommendation::ReduceCollisions);
        }
        // Whole-run mean; the last tick alone can catch a momentary stall
        if self.mean_speed() < LOW_AVERAGE_SPEED {
            out.push(Recommendation::RaiseSpeed);
        }
        if self.efficiency() < LOW_EFFICIENCY {
            out.push(Recommendation::Rebalance);
        }

        if out.is_empty() {
            out.push(Recommendation::KeepSettings);
        }
        out
    }

    /// Export metrics to CSV format
    pub fn export_to_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to create CSV file at {:?}", path))?;

        // Summary section
        wtr.write_record(["Metric", "Value"])?;
        wtr.write_record(["Run Name", &self.run_name])?;
        wtr.write_record(["Run Description", &self.run_description])?;
        let seed = self.seed.map(|s| s.to_string()).unwrap_or_default();
        wtr.write_record(["Seed", &seed])?;
        wtr.write_record(["Layout", &self.layout])?;
        wtr.write_record(["Grid Size", &self.grid_size.to_string()])?;
        wtr.write_record(["Agents", &self.agent_count.to_string()])?;
        wtr.write_record(["Ticks", &self.ticks.to_string()])?;
        wtr.write_record(["Exploration Rate", &self.exploration_rate.to_string()])?;
        wtr.write_record(["Map Coverage", &self.map_coverage.to_string()])?;
        wtr.write_record(["Total Collisions", &self.total_collisions.to_string()])?;
        wtr.write_record(["Stuck Agents", &self.stuck_agents.to_string()])?;
        wtr.write_record(["Peak Stuck Agents", &self.peak_stuck_agents.to_string()])?;
        wtr.write_record(["Average Distance", &self.average_distance.to_string()])?;
        wtr.write_record(["Average Speed", &self.average_speed.to_string()])?;
        wtr.write_record(["Efficiency", &self.efficiency().to_string()])?;

        // Tick series
        wtr.write_record([
            "Tick",
            "Exploration Rate",
            "Map Coverage",
            "Collisions",
            "Total Collisions",
            "Stuck Agents",
            "Average Distance",
            "Average Speed",
        ])?;

        for stats in &self.history {
            wtr.write_record(&[
                stats.tick.to_string(),
                format!("{:.4}", stats.exploration_rate),
                format!("{:.4}", stats.map_coverage),
                stats.collisions.to_string(),
                stats.total_collisions.to_string(),
                stats.stuck_agents.to_string(),
                format!("{:.3}", stats.average_distance),
                format!("{:.3}", stats.average_speed),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Export metrics to JSON format
    pub fn export_to_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize metrics")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write metrics to {:?}", path))?;
        Ok(())
    }

    /// Load metrics from JSON file
    pub fn load_from_json(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read metrics from {:?}", path))?;
        let metrics: Self = serde_json::from_str(&json).context("Failed to parse metrics JSON")?;
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(tick: u64, exploration: f64, total_collisions: u64, speed: f64) -> StepStats {
        StepStats {
            tick,
            exploration_rate: exploration,
            collisions: 0,
            total_collisions,
            stuck_agents: (tick % 2) as usize,
            average_distance: tick as f64,
            average_speed: speed,
            map_coverage: exploration / 2.0,
        }
    }

    fn healthy(agents: usize) -> RunMetrics {
        let mut metrics = RunMetrics::new("healthy", "");
        metrics.agent_count = agents;
        metrics.record(&stats(1, 0.8, 0, 2.5));
        metrics
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = RunMetrics::new("Test Run", "Testing metrics");
        assert_eq!(metrics.run_name, "Test Run");
        assert_eq!(metrics.run_description, "Testing metrics");
        assert_eq!(metrics.ticks, 0);
        assert!(metrics.history.is_empty());
    }

    #[test]
    fn test_with_config() {
        let config = SimulationConfig::default();
        let metrics = RunMetrics::new("a", "b").with_config(&config, 17);
        assert_eq!(metrics.seed, Some(17));
        assert_eq!(metrics.agent_count, config.agents.count);
        assert_eq!(metrics.grid_size, config.environment.size);
        assert_eq!(metrics.layout, "random");
    }

    #[test]
    fn test_record_tracks_latest_and_peaks() {
        let mut metrics = RunMetrics::default();
        metrics.record(&stats(1, 0.1, 2, 1.0));
        metrics.record(&stats(2, 0.3, 5, 3.0));

        assert_eq!(metrics.ticks, 2);
        assert_eq!(metrics.exploration_rate, 0.3);
        assert_eq!(metrics.total_collisions, 5);
        assert_eq!(metrics.stuck_agents, 0);
        assert_eq!(metrics.peak_stuck_agents, 1);
        assert_eq!(metrics.peak_map_coverage, 0.15);
        assert_eq!(metrics.history.len(), 2);
        assert_eq!(metrics.mean_speed(), 2.0);
    }

    #[test]
    fn test_reset_keeps_metadata() {
        let mut metrics = RunMetrics::new("keep", "me").with_config(&SimulationConfig::default(), 3);
        metrics.record(&stats(1, 0.5, 1, 1.0));
        metrics.reset();

        assert_eq!(metrics.run_name, "keep");
        assert_eq!(metrics.seed, Some(3));
        assert_eq!(metrics.layout, "random");
        assert_eq!(metrics.ticks, 0);
        assert!(metrics.history.is_empty());
    }

    #[test]
    fn test_efficiency() {
        let mut metrics = RunMetrics::default();
        metrics.exploration_rate = 0.8;
        assert_eq!(metrics.efficiency(), 0.8);

        metrics.total_collisions = 25;
        assert!((metrics.efficiency() - 0.4).abs() < 1e-12);

        // Penalty saturates
        metrics.total_collisions = 500;
        assert_eq!(metrics.efficiency(), 0.0);
    }

    #[test]
    fn test_good_run_keeps_settings() {
        assert_eq!(
            healthy(2).recommendations(),
            vec![Recommendation::KeepSettings]
        );
    }

    #[test]
    fn test_poor_run_recommendations() {
        let mut metrics = RunMetrics::new("poor", "");
        metrics.agent_count = 2;
        metrics.record(&stats(1, 0.2, 30, 0.5));

        let recs = metrics.recommendations();
        assert_eq!(
            recs,
            vec![
                Recommendation::IncreaseCoverage,
                Recommendation::ReduceCollisions,
                Recommendation::RaiseSpeed,
                Recommendation::Rebalance,
            ]
        );
    }

    #[test]
    fn test_final_stall_does_not_lower_speed_verdict() {
        let mut metrics = RunMetrics::new("stall", "");
        metrics.agent_count = 2;
        for tick in 1..=9 {
            metrics.record(&stats(tick, 0.8, 0, 2.5));
        }
        metrics.record(&stats(10, 0.8, 0, 0.0));

        assert_eq!(metrics.average_speed, 0.0);
        assert!((metrics.mean_speed() - 2.25).abs() < 1e-12);
        assert_eq!(metrics.recommendations(), vec![Recommendation::KeepSettings]);
    }

    #[test]
    fn test_sluggish_run_raises_speed() {
        let mut metrics = RunMetrics::new("slow", "");
        metrics.agent_count = 2;
        for tick in 1..=5 {
            metrics.record(&stats(tick, 0.8, 0, 0.4));
        }
        // A fast final tick does not hide a slow run
        metrics.record(&stats(6, 0.8, 0, 3.0));

        assert!(metrics
            .recommendations()
            .contains(&Recommendation::RaiseSpeed));
    }

    #[test]
    fn test_collision_allowance_scales_with_agents() {
        let mut metrics = healthy(2);
        metrics.total_collisions = 25;
        assert!(metrics
            .recommendations()
            .contains(&Recommendation::ReduceCollisions));

        metrics.agent_count = 4;
        assert!(!metrics
            .recommendations()
            .contains(&Recommendation::ReduceCollisions));
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");

        let mut metrics = RunMetrics::new("csv", "export");
        for tick in 1..=3 {
            metrics.record(&stats(tick, 0.1 * tick as f64, tick, 2.0));
        }
        metrics.export_to_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Metric,Value");
        assert!(lines.contains(&"Run Name,csv"));
        assert!(lines.iter().any(|l| l.starts_with("Tick,Exploration Rate")));
        assert_eq!(lines.last().copied(), Some("3,0.3000,0.1500,0,3,1,3.000,2.000"));
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");

        let mut metrics = RunMetrics::new("json", "roundtrip");
        metrics.record(&stats(1, 0.25, 4, 1.5));
        metrics.export_to_json(&path).unwrap();

        let loaded = RunMetrics::load_from_json(&path).unwrap();
        assert_eq!(loaded.run_name, "json");
        assert_eq!(loaded.total_collisions, 4);
        assert_eq!(loaded.history, metrics.history);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RunMetrics::load_from_json(&dir.path().join("absent.json")).is_err());
    }
}
