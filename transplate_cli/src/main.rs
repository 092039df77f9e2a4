use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use notify::RecursiveMode;
use notify::Watcher;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;
use transplate_cli::Commands;
use transplate_cli::OutputFormat;
use transplate_cli::TransplateCli;
use transplate_core::SAMPLE_CONFIG;
use transplate_core::TemplateDocument;
use transplate_core::TransplateConfig;
use transplate_core::TranspileWarning;
use transplate_core::Transpiler;
use transplate_core::project::CheckResult;
use transplate_core::project::ProjectContext;
use transplate_core::project::StaleOutput;
use transplate_core::project::build_project;
use transplate_core::project::check_project;
use transplate_core::project::load_project;
use transplate_core::project::plan_build;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
	let args = TransplateCli::parse();

	// Respect NO_COLOR, --no-color and terminals without color support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stderr).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Build { dry_run, watch }) => run_build(&args, *dry_run, *watch),
		Some(Commands::Check { diff, format }) => run_check(&args, *diff, *format),
		Some(Commands::Render { file }) => run_render(&args, file),
		None => {
			eprintln!("No subcommand specified. Run `transplate --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<transplate_core::TransplateError>() {
			Ok(err) => {
				let report: miette::Report = (*err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` takes precedence over `--verbose`.
///
/// Transpile warnings are printed from the collected results, so the
/// library's own warning events stay quiet unless `--verbose` is set.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose {
		"debug"
	} else {
		"warn,transplate_core=error"
	};
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.try_init()
		.ok();
}

fn resolve_root(args: &TransplateCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run_init(args: &TransplateCli) -> CliResult<()> {
	let root = resolve_root(args);

	if let Some(existing) = TransplateConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let config_path = root.join("transplate.toml");
	std::fs::write(&config_path, SAMPLE_CONFIG)?;
	println!("Created {}", config_path.display());
	println!();
	println!("Next steps:");
	println!("  1. Point [paths] at your template and static directories");
	println!("  2. Wrap server-only markup in <!-- key:django:start --> / <!-- key:django:end -->");
	println!("  3. Run `transplate build`");

	Ok(())
}

fn run_build(args: &TransplateCli, dry_run: bool, watch: bool) -> CliResult<()> {
	run_build_once(args, dry_run)?;

	if !watch || dry_run {
		return Ok(());
	}

	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let root = resolve_root(args);
	let root = root.canonicalize().unwrap_or(root);
	let mut ctx = load_project(&root)?;
	let (tx, rx) = mpsc::channel::<Vec<PathBuf>>();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_)
						| notify::EventKind::Create(_)
						| notify::EventKind::Remove(_)
				) {
					let _ = tx.send(event.paths);
				}
			}
		})?;

	// Config files live at the root or in `.config/`. Events from the output
	// directory are filtered out by `is_source_change`.
	watcher.watch(&root, RecursiveMode::NonRecursive)?;
	let config_dir = root.join(".config");
	if config_dir.is_dir() {
		watcher.watch(&config_dir, RecursiveMode::NonRecursive)?;
	}
	let mut watched = watch_sources(&mut watcher, &ctx, &[])?;

	loop {
		let mut changed = rx.recv()?.iter().any(|path| ctx.is_source_change(path));
		// Debounce: drain additional events within 200ms.
		while let Ok(paths) = rx.recv_timeout(Duration::from_millis(200)) {
			changed |= paths.iter().any(|path| ctx.is_source_change(path));
		}
		if !changed {
			continue;
		}

		println!("\nFile change detected, rebuilding...");
		if let Err(e) = run_build_once(args, false) {
			eprintln!("{} {e}", colored!("error:", red));
		}

		// The config may have moved the source directories.
		let reloaded: CliResult<(Vec<PathBuf>, ProjectContext)> = load_project(&root)
			.map_err(Into::into)
			.and_then(|next| Ok((watch_sources(&mut watcher, &next, &watched)?, next)));
		match reloaded {
			Ok((dirs, next)) => {
				watched = dirs;
				ctx = next;
			}
			Err(e) => eprintln!("{} {e}", colored!("error:", red)),
		}
	}
}

/// Watch the template and asset directories of `ctx`, releasing any
/// directory in `current` that is no longer a source. Returns the directories
/// now watched.
fn watch_sources(
	watcher: &mut impl Watcher,
	ctx: &ProjectContext,
	current: &[PathBuf],
) -> CliResult<Vec<PathBuf>> {
	let mut dirs = vec![(ctx.paths.templates.clone(), RecursiveMode::NonRecursive)];
	if ctx.sync_assets && ctx.paths.assets.is_dir() {
		dirs.push((ctx.paths.assets.clone(), RecursiveMode::Recursive));
	}
	// The root is already watched for config changes.
	dirs.retain(|(dir, _)| *dir != ctx.paths.root);

	for dir in current {
		if !dirs.iter().any(|(next, _)| next == dir) {
			watcher.unwatch(dir).ok();
		}
	}

	for (dir, mode) in &dirs {
		if !current.contains(dir) {
			watcher.watch(dir, *mode)?;
			tracing::debug!(dir = %dir.display(), "watching");
		}
	}

	Ok(dirs.into_iter().map(|(dir, _)| dir).collect())
}

fn run_build_once(args: &TransplateCli, dry_run: bool) -> CliResult<()> {
	let root = resolve_root(args);
	let ctx = load_project(&root)?;
	tracing::debug!(
		templates = %ctx.paths.templates.display(),
		output = %ctx.paths.output.display(),
		"loaded project"
	);

	if dry_run {
		let plan = plan_build(&ctx)?;
		print_warnings(&plan.warnings(), &root);
		println!(
			"Dry run: would write {} page(s) to {}:",
			plan.outputs.len(),
			make_relative(&ctx.paths.output, &root)
		);
		for output in &plan.outputs {
			println!("  {}", make_relative(&output.target, &root));
		}
		if ctx.sync_assets {
			println!(
				"  {} (copied from {})",
				make_relative(&ctx.paths.assets_output, &root),
				make_relative(&ctx.paths.assets, &root)
			);
		}
		return Ok(());
	}

	let result = build_project(&ctx)?;
	print_warnings(&result.warnings, &root);
	println!(
		"{} {} page(s) to {}",
		colored!("Built", green),
		result.written.len(),
		make_relative(&ctx.paths.output, &root)
	);
	if ctx.sync_assets {
		println!("Copied {} asset file(s).", result.copied_assets);
	}

	if args.verbose {
		for path in &result.written {
			println!("  {}", make_relative(path, &root));
		}
	}

	Ok(())
}

fn run_check(args: &TransplateCli, show_diff: bool, format: OutputFormat) -> CliResult<()> {
	let root = resolve_root(args);
	let ctx = load_project(&root)?;
	let result = check_project(&ctx)?;

	// Warnings never affect the exit code.
	print_warnings(&result.warnings, &root);

	if result.is_ok() {
		match format {
			OutputFormat::Json => {
				println!("{{\"ok\":true,\"checked\":{},\"stale\":[]}}", result.checked);
			}
			OutputFormat::Github => {
				println!("All generated pages are up to date.");
			}
			OutputFormat::Text => {
				println!(
					"Check passed: {} generated page(s) are up to date.",
					result.checked
				);
			}
		}
		return Ok(());
	}

	let stale = sorted_stale_entries(&result, &root);

	match format {
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = stale
				.iter()
				.map(|entry| {
					serde_json::json!({
						"source": make_relative(&entry.source, &root),
						"target": make_relative(&entry.target, &root),
						"missing": entry.current.is_none(),
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": false,
				"checked": result.checked,
				"stale": entries,
			});
			println!("{output}");
		}
		OutputFormat::Github => {
			for entry in &stale {
				let rel = make_relative(&entry.source, &root);
				println!(
					"::warning file={rel}::Generated page {} is {}",
					make_relative(&entry.target, &root),
					stale_reason(entry)
				);
			}
			eprintln!("{}", check_summary(&result));
		}
		OutputFormat::Text => {
			eprintln!("Check failed.");
			eprintln!();
			eprintln!("Stale pages:");
			for entry in &stale {
				eprintln!(
					"  {} ({}, from {})",
					make_relative(&entry.target, &root),
					stale_reason(entry),
					make_relative(&entry.source, &root)
				);

				if show_diff {
					print_diff(entry.current.as_deref().unwrap_or(""), &entry.expected);
				}
			}
			eprintln!();
			eprintln!("{}", check_summary(&result));
		}
	}

	process::exit(1);
}

fn stale_reason(entry: &StaleOutput) -> &'static str {
	if entry.current.is_some() {
		"out of date"
	} else {
		"missing"
	}
}

fn check_summary(result: &CheckResult) -> String {
	format!(
		"{} of {} generated page(s) are out of date. Run `transplate build` to fix.",
		result.stale.len(),
		result.checked
	)
}

fn sorted_stale_entries<'a>(result: &'a CheckResult, root: &Path) -> Vec<&'a StaleOutput> {
	let mut entries: Vec<_> = result.stale.iter().collect();
	entries.sort_by(|a, b| make_relative(&a.target, root).cmp(&make_relative(&b.target, root)));
	entries
}

fn run_render(args: &TransplateCli, file: &Path) -> CliResult<()> {
	let root = resolve_root(args);
	let config = TransplateConfig::load_or_default(&root)?;
	let transpiler = Transpiler::new(&config)?;
	let document = TemplateDocument::read(file)?;
	let output = transpiler.transpile(&document)?;

	print_warnings(
		&output
			.warnings
			.iter()
			.map(|warning| (file.to_path_buf(), warning.clone()))
			.collect::<Vec<_>>(),
		&root,
	);
	print!("{}", output.content());

	Ok(())
}

/// Print transpile warnings to stderr, grouped by file and ordered by line.
fn print_warnings(warnings: &[(PathBuf, TranspileWarning)], root: &Path) {
	let mut sorted: Vec<_> = warnings.iter().collect();
	sorted.sort_by(|(a_file, a), (b_file, b)| {
		make_relative(a_file, root)
			.cmp(&make_relative(b_file, root))
			.then_with(|| a.line.cmp(&b.line))
	});

	for (file, warning) in sorted {
		eprintln!(
			"{} {}:{}: {}",
			colored!("warning:", yellow),
			make_relative(file, root),
			warning.line,
			warning.message()
		);
	}
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
