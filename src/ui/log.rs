//! Unified logging system

use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);
/// stdout carries machine-readable output; route status lines to stderr
static STDOUT_RESERVED: AtomicBool = AtomicBool::new(false);

const LOGO: &str = r#"
       _ _                           _  __ _
  __ _| | |__  _   _ _ __ ___    ___(_)/ _| |_
 / _` | | '_ \| | | | '_ ` _ \  / __| | |_| __|
| (_| | | |_) | |_| | | | | | | \__ \ |  _| |_
 \__,_|_|_.__/ \__,_|_| |_| |_| |___/_|_|  \__|"#;

const SLOGANS: &[&str] = &[
	"Seventeen photos of the same sunset? We noticed",
	"Union-find, but for your camera roll",
	"Your cat, grouped",
	"Cosine similarity goes brrr",
	"Burst mode has consequences",
	"One medoid to rule them all",
];

pub fn random_slogan() -> &'static str {
	let idx = rand::random_range(0..SLOGANS.len());
	SLOGANS[idx]
}

pub fn print_logo() {
	out(&LOGO.bright_blue().bold().to_string());
	out(&random_slogan().dimmed().italic().to_string());
}

fn out(line: &str) {
	if Log::is_stdout_reserved() {
		eprintln!("{}", line);
	} else {
		println!("{}", line);
	}
}

pub struct Log;

impl Log {
	pub fn set_verbose(enabled: bool) {
		VERBOSE.store(enabled, Ordering::Relaxed);
	}

	pub fn is_verbose() -> bool {
		VERBOSE.load(Ordering::Relaxed)
	}

	pub fn reserve_stdout(reserved: bool) {
		STDOUT_RESERVED.store(reserved, Ordering::Relaxed);
	}

	pub fn is_stdout_reserved() -> bool {
		STDOUT_RESERVED.load(Ordering::Relaxed)
	}
}

pub fn info(msg: &str) {
	out(&format!("{} {}", "ℹ".bright_blue().bold(), msg.bright_white()));
}

pub fn success(msg: &str) {
	out(&format!("{} {}", "✓".bright_green().bold(), msg.bright_white()));
}

pub fn warn(msg: &str) {
	eprintln!("{} {}", "⚠".bright_yellow().bold(), msg.bright_white());
}

pub fn error(msg: &str) {
	eprintln!("{} {}", "✗".bright_red().bold(), msg.bright_white());
}

pub fn debug(msg: &str) {
	if Log::is_verbose() {
		out(&format!("{} {}", "⚙".bright_black().bold(), msg.dimmed()));
	}
}

pub fn header(text: &str) {
	out(&format!("\n{}", text.bright_blue().bold()));
}

/// Clickable file path (OSC 8 terminal hyperlink)
pub fn path_link(path: &std::path::Path, max_len: usize) -> String {
	let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

	let uri = if cfg!(windows) {
		let path_str = absolute.to_string_lossy();
		let cleaned = path_str.strip_prefix(r"\\?\").unwrap_or(&path_str);
		format!("file:///{}", cleaned.replace('\\', "/"))
	} else {
		format!("file://{}", absolute.display())
	};

	let filename = path
		.file_name()
		.and_then(|n| n.to_str())
		.unwrap_or("unknown");

	format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", uri, shorten(filename, max_len))
}

/// Fixed-width text progress bar, e.g. `[#####-----]  50%`
pub fn progress_bar(value: f32, width: usize) -> String {
	let value = value.clamp(0.0, 1.0);
	let filled = (value * width as f32).round() as usize;
	format!(
		"[{}{}] {:>3.0}%",
		"#".repeat(filled).bright_blue(),
		"-".repeat(width - filled).dimmed(),
		value * 100.0
	)
}

fn shorten(name: &str, max_len: usize) -> String {
	let chars: Vec<char> = name.chars().collect();
	if chars.len() <= max_len || max_len < 8 {
		return name.to_string();
	}
	let head: String = chars[..max_len / 2].iter().collect();
	let tail: String = chars[chars.len() - (max_len / 2 - 3)..].iter().collect();
	format!("{}...{}", head, tail)
}
