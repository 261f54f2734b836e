//! JSON export of grouping and matching results

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::core::{Cluster, ClusterReport};
use crate::processing::{Match, RunReport};
use crate::ui;

#[derive(Debug, Serialize)]
struct GroupExport<'a> {
	version: &'a str,
	timestamp: &'a str,
	threshold: f32,
	min_cluster_size: usize,
	total_images: usize,
	failed: usize,
	groups: Vec<GroupInfo<'a>>,
	unclustered: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct GroupInfo<'a> {
	id: usize,
	size: usize,
	cohesion: f32,
	representative: &'a str,
	members: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct MatchExport<'a> {
	album: &'a str,
	threshold: f32,
	candidates: usize,
	matches: Vec<MatchInfo<'a>>,
}

#[derive(Debug, Serialize)]
struct MatchInfo<'a> {
	id: &'a str,
	uri: &'a str,
	score: f32,
}

#[derive(Debug, Serialize)]
struct ReindexExport<'a> {
	report: &'a RunReport,
	groups: Vec<ChunkGroup<'a>>,
	matches: Vec<ChunkMatch<'a>>,
}

#[derive(Debug, Serialize)]
struct ChunkGroup<'a> {
	chunk: usize,
	#[serde(flatten)]
	group: GroupInfo<'a>,
}

#[derive(Debug, Serialize)]
struct ChunkMatch<'a> {
	chunk: usize,
	#[serde(flatten)]
	image: MatchInfo<'a>,
}

fn group_info(id: usize, cluster: &Cluster) -> GroupInfo<'_> {
	GroupInfo {
		id,
		size: cluster.size(),
		cohesion: cluster.cohesion,
		representative: &cluster.representative_ref.uri,
		members: cluster.member_refs.iter().map(|r| r.uri.as_str()).collect(),
	}
}

fn match_info(m: &Match) -> MatchInfo<'_> {
	MatchInfo {
		id: &m.image.id,
		uri: &m.image.uri,
		score: m.score,
	}
}

/// Write `value` as pretty JSON to a file, or stdout when `path` is `-`
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
	let json = serde_json::to_string_pretty(value).context("Failed to serialize export")?;

	if path.to_str() == Some("-") || path.as_os_str().is_empty() {
		println!("{}", json);
	} else {
		std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
		ui::success(&format!("Exported to {}", path.display()));
	}

	Ok(())
}

pub fn export_groups(report: &ClusterReport, path: &Path) -> Result<()> {
	let groups = report
		.clusters
		.iter()
		.enumerate()
		.map(|(id, cluster)| group_info(id, cluster))
		.collect();

	write_json(
		&GroupExport {
			version: &report.version,
			timestamp: &report.timestamp,
			threshold: report.params.threshold,
			min_cluster_size: report.params.min_cluster_size,
			total_images: report.total_images,
			failed: report.failed,
			groups,
			unclustered: report.unclustered.iter().map(|r| r.uri.as_str()).collect(),
		},
		path,
	)
}

pub fn export_matches(album: &str, threshold: f32, candidates: usize, matches: &[Match], path: &Path) -> Result<()> {
	write_json(
		&MatchExport {
			album,
			threshold,
			candidates,
			matches: matches.iter().map(match_info).collect(),
		},
		path,
	)
}

/// Export everything a reindex run delivered, tagged with its chunk
pub fn export_reindex(
	report: &RunReport,
	groups: &[(usize, Cluster)],
	matches: &[(usize, Match)],
	path: &Path,
) -> Result<()> {
	write_json(
		&ReindexExport {
			report,
			groups: groups
				.iter()
				.enumerate()
				.map(|(id, (chunk, cluster))| ChunkGroup {
					chunk: *chunk,
					group: group_info(id, cluster),
				})
				.collect(),
			matches: matches
				.iter()
				.map(|(chunk, m)| ChunkMatch {
					chunk: *chunk,
					image: match_info(m),
				})
				.collect(),
		},
		path,
	)
}
