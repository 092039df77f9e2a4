use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Turn server-rendered HTML templates into static pages for an embedded runtime.",
	long_about = "transplate converts server templates into static HTML.\n\nDirective-only lines \
	              such as `{% load static %}` are removed, `{% static 'a.png' %}` becomes \
	              `static/a.png`, and regions wrapped in `<!-- key:django:start -->` / `<!-- \
	              key:django:end -->` are replaced by the `<!-- key:tauri ... -->` comment that \
	              follows them.\n\nQuick start:\n  transplate init    Create transplate.toml\n  \
	              transplate build   Regenerate the output directory\n  transplate check   \
	              Verify the output directory is up to date\n  transplate render  Print one \
	              transpiled template"
)]
pub struct TransplateCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create a sample `transplate.toml` in the project root.
	///
	/// If a config file already exists this command leaves it alone and
	/// exits successfully.
	Init,
	/// Transpile every template into the output directory.
	///
	/// All templates are transpiled in memory first. When every template is
	/// well formed the output directory is cleared, the pages are written and
	/// the asset directory is copied next to them.
	Build {
		/// List the files that would be written without touching the output
		/// directory.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Rebuild whenever a template or asset changes.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// Check that the output directory matches the templates.
	///
	/// Exits with a non-zero status code if any generated page is missing or
	/// differs from what `transplate build` would write. Nothing is written.
	Check {
		/// Show a line diff for each stale page.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Output format for check results. Use `text` for human-readable
		/// output, `json` for programmatic consumption, or `github` for
		/// GitHub Actions annotations.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Transpile a single template and print the result to stdout.
	Render {
		/// The template file to transpile.
		file: PathBuf,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
	/// GitHub Actions annotation format.
	Github,
}
