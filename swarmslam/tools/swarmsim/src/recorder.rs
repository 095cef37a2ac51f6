//! Frame recording for swarmsim
//!
//! Captures agent snapshots every few ticks so a run can be replayed or
//! plotted after the fact. Recordings are written as JSON, or YAML when the
//! file extension asks for it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use swarmslam::agent::AgentSnapshot;
use swarmslam::simulation::{Simulation, StepStats};

/// Agent states after one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub tick: u64,
    pub agents: Vec<AgentSnapshot>,
    pub stats: StepStats,
}

/// Metadata about a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub name: String,
    pub seed: u64,
    pub grid_size: usize,
    pub layout: String,

    /// Ticks between recorded frames
    pub record_every: u64,

    /// Total number of frames
    pub frame_count: u64,

    /// Recording start time (ISO 8601)
    pub recorded_at: String,
}

/// Complete recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub metadata: RecordingMetadata,
    pub frames: Vec<RecordedFrame>,
}

impl Recording {
    /// Create an empty recording for `sim`
    pub fn new(name: impl Into<String>, sim: &Simulation, record_every: u64) -> Self {
        let config = sim.config();
        Self {
            metadata: RecordingMetadata {
                name: name.into(),
                seed: sim.seed(),
                grid_size: config.environment.size,
                layout: config.environment.layout.to_string(),
                record_every,
                frame_count: 0,
                recorded_at: chrono::Utc::now().to_rfc3339(),
            },
            frames: Vec::new(),
        }
    }

    pub fn add_frame(&mut self, frame: RecordedFrame) {
        self.frames.push(frame);
        self.metadata.frame_count = self.frames.len() as u64;
    }

    /// Frame by tick number
    pub fn get_frame(&self, tick: u64) -> Option<&RecordedFrame> {
        self.frames.iter().find(|f| f.tick == tick)
    }

    /// Positions of one agent across all frames
    pub fn trajectory(&self, agent_id: usize) -> Vec<(u64, [f64; 2])> {
        self.frames
            .iter()
            .filter_map(|frame| {
                frame
                    .agents
                    .iter()
                    .find(|a| a.id == agent_id)
                    .map(|a| (frame.tick, [a.position.x, a.position.y]))
            })
            .collect()
    }

    /// Save recording; YAML for `.yaml`/`.yml`, JSON otherwise
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let text = if is_yaml(path) {
            serde_yaml::to_string(self).context("Failed to serialize recording to YAML")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize recording to JSON")?
        };

        std::fs::write(path, text)
            .with_context(|| format!("Failed to write recording to {:?}", path))?;

        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recording from {:?}", path))?;

        let recording: Recording = if is_yaml(path) {
            serde_yaml::from_str(&text).context("Failed to deserialize recording from YAML")?
        } else {
            serde_json::from_str(&text).context("Failed to deserialize recording from JSON")?
        };

        Ok(recording)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Recorder for capturing simulation frames
pub struct Recorder {
    recording: Recording,
    record_every: u64,
}

impl Recorder {
    /// `record_every` of zero is treated as one
    pub fn new(name: impl Into<String>, sim: &Simulation, record_every: u64) -> Self {
        let record_every = record_every.max(1);
        Self {
            recording: Recording::new(name, sim, record_every),
            record_every,
        }
    }

    /// Capture the current agent states if this tick is due
    pub fn capture(&mut self, sim: &Simulation, stats: &StepStats) -> bool {
        if stats.tick % self.record_every != 0 {
            return false;
        }

        self.recording.add_frame(RecordedFrame {
            tick: stats.tick,
            agents: sim.snapshots(),
            stats: stats.clone(),
        });
        true
    }

    pub fn frame_count(&self) -> usize {
        self.recording.frames.len()
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn finish(self) -> Recording {
        self.recording
    }
}
