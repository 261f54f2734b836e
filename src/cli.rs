use clap::{builder::Styles, Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{
	CropPolicy, EmbedConfig, PixelRange, TensorLayout, DEFAULT_ALBUM_THRESHOLD, DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY,
	DEFAULT_GROUP_THRESHOLD, DEFAULT_INPUT_NAME, DEFAULT_MIN_CLUSTER_SIZE, DEFAULT_PREVIEW, INPUT_SIZE,
};
use crate::runtime::Provider;

fn parse_threshold(s: &str) -> Result<f32, String> {
	let val: f32 = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
	if !(-1.0..=1.0).contains(&val) {
		Err(format!("threshold must be between -1.0 and 1.0, got {}", val))
	} else {
		Ok(val)
	}
}

fn parse_positive(s: &str) -> Result<usize, String> {
	match s.parse::<usize>() {
		Ok(0) => Err("value must be at least 1".to_string()),
		Ok(v) => Ok(v),
		Err(_) => Err(format!("'{}' is not a valid count", s)),
	}
}

fn styles() -> Styles {
	Styles::styled()
		.header(anstyle::Style::new().bold().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Blue))))
		.usage(anstyle::Style::new().bold().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Blue))))
		.literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Blue))))
		.placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))))
		.valid(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Blue))))
		.invalid(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))))
}

#[derive(Parser, Debug)]
#[command(
	name = "albumsift",
	author,
	version,
	about = "Group similar photos and build albums from examples, on device",
	styles = styles(),
	after_help = format!(
		"{title}
  {bin} {group}    {group_args}           {group_desc}
  {bin} {train}    {train_args}   {train_desc}
  {bin} {find}     {find_args}  {find_desc}
  {bin} {reindex}  {reindex_args}  {reindex_desc}",
		title = "Examples:".bright_blue().bold(),
		bin = "albumsift".bright_blue(),
		group = "group".yellow(),
		group_args = "-d ./photos/ -r",
		group_desc = "Group similar photos".dimmed(),
		train = "train".yellow(),
		train_args = "-d ./beach/ -n beach",
		train_desc = "Learn an album from examples".dimmed(),
		find = "find".yellow(),
		find_args = "-d ./photos/ -n beach --from ./beach/",
		find_desc = "Find photos for the album".dimmed(),
		reindex = "reindex".yellow(),
		reindex_args = "-d ./photos/ -r --chunk 500",
		reindex_desc = "Process a whole library in chunks".dimmed(),
	),
)]
pub struct Cli {
	/// Enable verbose debug output
	#[arg(short = 'v', long = "verbose", global = true)]
	pub verbose: bool,

	/// Execution provider: auto, cpu, cuda, tensorrt, coreml, xnnpack
	#[arg(short = 'p', long = "provider", global = true, default_value = "auto")]
	pub provider: Provider,

	#[command(flatten)]
	pub embed: EmbedArgs,

	#[command(subcommand)]
	pub command: Command,
}

/// Model and preprocessing settings shared by every command
#[derive(Args, Debug, Clone)]
pub struct EmbedArgs {
	/// Path to the ONNX vision model
	#[arg(long = "model", global = true, value_name = "PATH")]
	pub model: Option<PathBuf>,

	/// Name of the model's image input
	#[arg(long = "input-name", global = true, default_value = DEFAULT_INPUT_NAME)]
	pub input_name: String,

	/// Square input size in pixels
	#[arg(long = "size", global = true, default_value_t = INPUT_SIZE, value_parser = clap::value_parser!(u32).range(1..=4096))]
	pub size: u32,

	/// Pixel value range fed to the model
	#[arg(long = "range", global = true, default_value = "0_1", allow_hyphen_values = true)]
	pub range: PixelRange,

	/// Resize without keeping aspect ratio instead of center-cropping
	#[arg(long = "stretch", global = true)]
	pub stretch: bool,

	/// Feed channels-first tensors ([1,3,H,W])
	#[arg(long = "nchw", global = true)]
	pub nchw: bool,

	/// Images processed in parallel
	#[arg(short = 'j', long = "concurrency", global = true, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_positive)]
	pub concurrency: usize,
}

impl EmbedArgs {
	pub fn config(&self) -> EmbedConfig {
		EmbedConfig {
			input_size: self.size,
			pixel_range: self.range,
			crop: if self.stretch { CropPolicy::Stretch } else { CropPolicy::CenterCrop },
			layout: self.layout(),
		}
	}

	pub fn layout(&self) -> TensorLayout {
		if self.nchw {
			TensorLayout::Nchw
		} else {
			TensorLayout::Nhwc
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Group visually similar photos
	Group {
		/// Directory to scan
		#[arg(short = 'd', long = "dir", default_value = ".")]
		directory: PathBuf,

		/// Scan directories recursively
		#[arg(short = 'r', long = "recursive")]
		recursive: bool,

		/// Minimum similarity for two photos to be linked
		#[arg(short = 't', long = "threshold", default_value_t = DEFAULT_GROUP_THRESHOLD, value_parser = parse_threshold, allow_hyphen_values = true)]
		threshold: f32,

		/// Minimum photos per group
		#[arg(short = 'm', long = "min-size", default_value_t = DEFAULT_MIN_CLUSTER_SIZE, value_parser = parse_positive)]
		min_cluster_size: usize,

		/// Photos listed per group
		#[arg(long = "preview", default_value_t = DEFAULT_PREVIEW)]
		preview: usize,

		/// Export groups as JSON to a file ('-' for stdout)
		#[arg(long = "export", value_name = "PATH")]
		export: Option<PathBuf>,
	},

	/// Learn an album representative from example photos
	Train {
		/// Directory of example photos
		#[arg(short = 'd', long = "dir")]
		directory: PathBuf,

		/// Album name
		#[arg(short = 'n', long = "name")]
		name: String,

		/// Scan directories recursively
		#[arg(short = 'r', long = "recursive")]
		recursive: bool,
	},

	/// Find photos belonging to a trained album
	Find {
		/// Directory to search
		#[arg(short = 'd', long = "dir", default_value = ".")]
		directory: PathBuf,

		/// Album name
		#[arg(short = 'n', long = "name")]
		name: String,

		/// Directory the album was trained in (default: searched directory)
		#[arg(long = "from", value_name = "DIR")]
		from: Option<PathBuf>,

		/// Scan directories recursively
		#[arg(short = 'r', long = "recursive")]
		recursive: bool,

		/// Minimum similarity to the album
		#[arg(short = 't', long = "threshold", default_value_t = DEFAULT_ALBUM_THRESHOLD, value_parser = parse_threshold, allow_hyphen_values = true)]
		threshold: f32,

		/// Matches listed
		#[arg(long = "limit", default_value_t = 20)]
		limit: usize,

		/// Export matches as JSON to a file ('-' for stdout)
		#[arg(long = "export", value_name = "PATH")]
		export: Option<PathBuf>,

		/// Keep the album's training photos among the candidates
		#[arg(long = "include-training")]
		include_training: bool,

		/// File of ids or paths to leave out of the search
		#[arg(long = "exclude-file", value_name = "FILE")]
		exclude_file: Option<PathBuf>,
	},

	/// Group and/or match a whole library in chunks
	Reindex {
		/// Directory to scan
		#[arg(short = 'd', long = "dir", default_value = ".")]
		directory: PathBuf,

		/// Scan directories recursively
		#[arg(short = 'r', long = "recursive")]
		recursive: bool,

		/// Images per chunk
		#[arg(long = "chunk", default_value_t = DEFAULT_CHUNK_SIZE, value_parser = parse_positive)]
		chunk: usize,

		/// Skip the grouping phase
		#[arg(long = "no-group")]
		no_group: bool,

		/// Also match against this trained album
		#[arg(long = "album", value_name = "NAME", requires = "from")]
		album: Option<String>,

		/// Directory the album was trained in
		#[arg(long = "from", value_name = "DIR")]
		from: Option<PathBuf>,

		/// Grouping threshold
		#[arg(short = 't', long = "threshold", default_value_t = DEFAULT_GROUP_THRESHOLD, value_parser = parse_threshold, allow_hyphen_values = true)]
		threshold: f32,

		/// Minimum photos per group
		#[arg(short = 'm', long = "min-size", default_value_t = DEFAULT_MIN_CLUSTER_SIZE, value_parser = parse_positive)]
		min_cluster_size: usize,

		/// Album matching threshold
		#[arg(long = "match-threshold", default_value_t = DEFAULT_ALBUM_THRESHOLD, value_parser = parse_threshold, allow_hyphen_values = true)]
		match_threshold: f32,

		/// File of ids or paths to skip, re-read before every chunk
		#[arg(long = "exclude-file", value_name = "FILE")]
		exclude_file: Option<PathBuf>,

		/// Export results as JSON to a file ('-' for stdout)
		#[arg(long = "export", value_name = "PATH")]
		export: Option<PathBuf>,
	},
}

impl Command {
	/// JSON export destination, if the command was asked for one
	pub fn export_path(&self) -> Option<&std::path::Path> {
		match self {
			Command::Group { export, .. } | Command::Find { export, .. } | Command::Reindex { export, .. } => {
				export.as_deref()
			}
			Command::Train { .. } => None,
		}
	}
}
