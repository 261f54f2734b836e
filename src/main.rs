//! albumsift - on-device photo grouping and example-based albums
//!
//! Groups visually similar photos and learns albums from a handful of
//! examples, using a local ONNX image model.

use anyhow::Result;
use clap::Parser;

use albumsift::cli::{Cli, Command};
use albumsift::commands;
use albumsift::commands::find::FindOptions;
use albumsift::commands::reindex::ReindexOptions;
use albumsift::core::ClusterParams;
use albumsift::ui;

fn main() {
	if let Err(e) = run() {
		ui::error(&format!("{:#}", e));
		std::process::exit(1);
	}
}

fn run() -> Result<()> {
	let cli = Cli::parse();

	ui::Log::set_verbose(cli.verbose);
	ui::Log::reserve_stdout(cli.command.export_path().is_some_and(|p| p.as_os_str() == "-"));
	ui::print_logo();

	let embed = &cli.embed;
	let provider = cli.provider;

	match cli.command {
		Command::Group {
			directory,
			recursive,
			threshold,
			min_cluster_size,
			preview,
			export,
		} => commands::group::run(
			&directory,
			recursive,
			ClusterParams {
				threshold,
				min_cluster_size,
			},
			preview,
			export.as_deref(),
			embed,
			provider,
		),
		Command::Train {
			directory,
			name,
			recursive,
		} => commands::train::run(&directory, &name, recursive, embed, provider),
		Command::Find {
			directory,
			name,
			from,
			recursive,
			threshold,
			limit,
			export,
			include_training,
			exclude_file,
		} => {
			let options = FindOptions {
				name,
				from,
				threshold,
				limit,
				include_training,
				exclude_file,
				export,
			};
			commands::find::run(&directory, recursive, options, embed, provider)
		}
		Command::Reindex {
			directory,
			recursive,
			chunk,
			no_group,
			album,
			from,
			threshold,
			min_cluster_size,
			match_threshold,
			exclude_file,
			export,
		} => {
			let options = ReindexOptions {
				chunk_size: chunk,
				grouping: (!no_group).then_some(ClusterParams {
					threshold,
					min_cluster_size,
				}),
				album: album.zip(from),
				match_threshold,
				exclude_file,
				export,
			};
			commands::reindex::run(&directory, recursive, options, embed, provider)
		}
	}
}
