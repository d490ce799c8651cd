//! Octree index demo.
//!
//! Producer threads generate random points and push them through a single
//! writer queue into a shared index. Once they finish (or the time limit
//! cancels them) the index is sampled for lookup timings and exported as a
//! height-colored point cloud, optionally written as an ASCII PLY file.

mod config;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use octree_index::metrics::IndexMetrics;
use octree_index::{
	feed, CancellationToken, ColorTable, FeedReport, IndexWriter, PointCloud, PointCloudExporter,
	PointGenerator, SharedIndex, SpatialIndex,
};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{Config, Overlap};

/// Lookups sampled after the run for latency statistics.
const RETRIEVE_SAMPLES: usize = 1_000;

/// Octree spatial index demo.
#[derive(Parser, Debug)]
#[command(name = "octree_demo")]
#[command(about = "Feeds random points through an octree index and exports a point cloud")]
struct Args {
	/// Path to configuration TOML file.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Total points to generate.
	#[arg(short, long)]
	points: Option<usize>,

	/// Producer threads.
	#[arg(long)]
	producers: Option<usize>,

	/// Base random seed.
	#[arg(long)]
	seed: Option<u64>,

	/// Leaf capacity.
	#[arg(long)]
	capacity: Option<usize>,

	/// Cancel producers after this many milliseconds.
	#[arg(long)]
	time_limit_ms: Option<u64>,

	/// Overlap policy for the terrain color table.
	#[arg(long, value_enum)]
	overlap: Option<Overlap>,

	/// Write the exported point cloud as ASCII PLY.
	#[arg(short, long)]
	output: Option<PathBuf>,
}

impl Args {
	fn into_config(self) -> Result<(Config, Option<PathBuf>)> {
		let mut config = match &self.config {
			Some(path) => {
				info!("Loading config from: {}", path.display());
				Config::load(path)?
			}
			None => Config::default(),
		};

		if let Some(points) = self.points {
			config.points = points;
		}
		if let Some(producers) = self.producers {
			config.producers = producers;
		}
		if let Some(seed) = self.seed {
			config.seed = seed;
		}
		if let Some(capacity) = self.capacity {
			config.index.capacity = capacity;
		}
		if let Some(limit) = self.time_limit_ms {
			config.time_limit_ms = Some(limit);
		}
		if let Some(overlap) = self.overlap {
			config.overlap = overlap;
		}
		config.validate()?;

		Ok((config, self.output))
	}
}

fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let (config, output) = Args::parse().into_config()?;
	let index = SharedIndex::new(SpatialIndex::new(config.index.clone()).context("Building index")?);

	info!(
		points = config.points,
		producers = config.producers,
		capacity = config.index.capacity,
		"Populating index"
	);
	let fed = populate(&config, &index)?;
	if fed.cancelled {
		warn!(produced = fed.produced, "Producers cancelled by time limit");
	}

	let stats = index.stats()?;
	index
		.read(|tree| tree.check_invariants())?
		.context("Index failed its structural check")?;
	info!(
		entries = stats.entries,
		leaves = stats.leaves,
		branches = stats.branches,
		max_depth = stats.max_depth,
		oversized_leaves = stats.oversized_leaves,
		mean_leaf_occupancy = stats.mean_leaf_occupancy(),
		"Index built"
	);

	let metrics = sample_retrieves(&config, &index)?;
	if let Some((min, max)) = metrics.retrieve_timings.min_max() {
		info!(
			samples = metrics.total_retrieves,
			avg_us = metrics.avg_retrieve_timing_us(),
			min_us = min,
			max_us = max,
			"Retrieve timings"
		);
	}

	let exporter = PointCloudExporter::new(ColorTable::terrain().with_policy(config.overlap.into()));
	let cloud = index.read(|tree| exporter.export_by_height(tree))?;
	info!(points = cloud.len(), "Exported point cloud");

	if let Some(path) = output {
		write_ply(&cloud, &path).with_context(|| format!("Failed to write: {}", path.display()))?;
		info!("Point cloud written to: {}", path.display());
	}

	Ok(())
}

/// Run the producers against a writer and wait for the queue to drain.
fn populate(config: &Config, index: &SharedIndex<u64>) -> Result<FeedReport> {
	let writer = match config.queue_capacity {
		Some(capacity) => IndexWriter::spawn_bounded(index.clone(), capacity)?,
		None => IndexWriter::spawn(index.clone())?,
	};
	let token = CancellationToken::new();

	if let Some(limit) = config.time_limit_ms {
		let timer = token.clone();
		thread::spawn(move || {
			thread::sleep(Duration::from_millis(limit));
			timer.cancel();
		});
	}

	let world = config.index.world;
	let per_producer = config.points.div_ceil(config.producers);
	let mut handles = Vec::with_capacity(config.producers);

	for producer in 0..config.producers {
		let sender = writer.sender()?;
		let token = token.clone();
		let seed = config.seed.wrapping_add(producer as u64);
		let first_id = (producer * per_producer) as u64;
		let limit = per_producer.min(config.points.saturating_sub(producer * per_producer));

		handles.push(thread::spawn(move || {
			let source = PointGenerator::new(world, seed).zip(first_id..);
			feed(source, limit, &token, |position, id| sender.insert(position, id))
		}));
	}

	let mut total = FeedReport::default();
	for handle in handles {
		let report = handle
			.join()
			.map_err(|_| anyhow!("Producer thread panicked"))?
			.context("Producer failed to submit")?;
		total.produced += report.produced;
		total.cancelled |= report.cancelled;
	}

	let report = writer.shutdown()?;
	info!(applied = report.applied, rejected = report.rejected, "Writer drained");

	Ok(total)
}

/// Time lookups at fresh random positions.
fn sample_retrieves(config: &Config, index: &SharedIndex<u64>) -> Result<IndexMetrics> {
	let mut metrics = IndexMetrics::new();
	let probes = PointGenerator::new(config.index.world, config.seed ^ u64::MAX);

	index.read(|tree| {
		for position in probes.take(RETRIEVE_SAMPLES) {
			metrics.timed_retrieve(tree, position);
		}
	})?;

	Ok(metrics)
}

/// Write positions and RGB colors as an ASCII PLY point cloud.
fn write_ply(cloud: &PointCloud, path: &Path) -> Result<()> {
	let file = std::fs::File::create(path)?;
	let mut out = BufWriter::new(file);

	writeln!(out, "ply")?;
	writeln!(out, "format ascii 1.0")?;
	writeln!(out, "element vertex {}", cloud.len())?;
	for axis in ["x", "y", "z"] {
		writeln!(out, "property float {axis}")?;
	}
	for channel in ["red", "green", "blue"] {
		writeln!(out, "property uchar {channel}")?;
	}
	writeln!(out, "end_header")?;

	for (position, color) in cloud.positions.iter().zip(&cloud.colors) {
		let rgb = (color.truncate().clamp(glam::Vec3::ZERO, glam::Vec3::ONE) * 255.0).round();
		writeln!(
			out,
			"{} {} {} {} {} {}",
			position.x, position.y, position.z, rgb.x as u8, rgb.y as u8, rgb.z as u8
		)?;
	}

	out.flush()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use glam::DVec3;

	fn small_config() -> Config {
		let mut config = Config {
			points: 1_000,
			producers: 3,
			queue_capacity: Some(16),
			..Config::default()
		};
		config.index.capacity = 8;
		config
	}

	#[test]
	fn test_populate_inserts_every_point() {
		let config = small_config();
		let index = SharedIndex::new(SpatialIndex::new(config.index.clone()).unwrap());

		let report = populate(&config, &index).unwrap();

		assert_eq!(report.produced, 1_000);
		assert!(!report.cancelled);
		assert_eq!(index.len().unwrap(), 1_000);
		assert!(index.read(|tree| tree.check_invariants()).unwrap().is_ok());
	}

	#[test]
	fn test_sample_retrieves_records_timings() {
		let config = small_config();
		let index = SharedIndex::new(SpatialIndex::new(config.index.clone()).unwrap());
		index.insert(DVec3::splat(10.0), 1).unwrap();

		let metrics = sample_retrieves(&config, &index).unwrap();

		assert_eq!(metrics.total_retrieves, RETRIEVE_SAMPLES as u64);
	}

	#[test]
	fn test_write_ply() {
		let mut cloud = PointCloud::default();
		cloud.push(glam::Vec3::new(1.0, 2.0, 3.0), glam::Vec4::new(1.0, 0.0, 0.5, 1.0));

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("cloud.ply");
		write_ply(&cloud, &path).unwrap();

		let text = std::fs::read_to_string(&path).unwrap();
		assert!(text.starts_with("ply\nformat ascii 1.0\nelement vertex 1\n"));
		assert!(text.trim_end().ends_with("1 2 3 255 0 128"));
	}
}
