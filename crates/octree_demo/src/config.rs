//! Configuration parsing for the octree demo.

use anyhow::{Context, Result};
use octree_index::{IndexConfig, OverlapPolicy};
use serde::Deserialize;
use std::path::Path;

/// Root configuration for a demo run.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Index capacity, world region and depth guard.
	pub index: IndexConfig,
	/// Points generated in total, split evenly across producers.
	pub points: usize,
	/// Producer threads feeding the writer queue.
	pub producers: usize,
	/// Base seed; producer `i` uses `seed + i`.
	pub seed: u64,
	/// Cancel producers after this many milliseconds.
	pub time_limit_ms: Option<u64>,
	/// Bound on the writer queue. Unbounded when absent.
	pub queue_capacity: Option<usize>,
	/// How overlapping color bands resolve.
	pub overlap: Overlap,
}

/// Overlap policy as written in config files and on the command line.
#[derive(Debug, Default, Clone, Copy, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Overlap {
	#[default]
	First,
	Last,
	Blend,
}

impl From<Overlap> for OverlapPolicy {
	fn from(overlap: Overlap) -> Self {
		match overlap {
			Overlap::First => OverlapPolicy::First,
			Overlap::Last => OverlapPolicy::Last,
			Overlap::Blend => OverlapPolicy::Blend,
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			index: IndexConfig::default(),
			points: 100_000,
			producers: 4,
			seed: 0,
			time_limit_ms: None,
			queue_capacity: Some(4096),
			overlap: Overlap::default(),
		}
	}
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	/// Parse and validate TOML text.
	pub fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).with_context(|| "Failed to parse config TOML")?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		self.index.validate().context("Invalid index config")?;
		if self.producers == 0 {
			anyhow::bail!("producers must be at least 1");
		}
		if self.queue_capacity == Some(0) {
			anyhow::bail!("queue_capacity must be at least 1 when set");
		}
		Ok(())
	}
}
