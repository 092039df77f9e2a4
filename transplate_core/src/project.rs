use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::TransplateError;
use crate::TransplateResult;
use crate::config::CONFIG_FILE_CANDIDATES;
use crate::config::TransplateConfig;
use crate::transpiler::OutputDocument;
use crate::transpiler::TemplateDocument;
use crate::transpiler::TranspileWarning;
use crate::transpiler::Transpiler;

/// Directories of one project, resolved against the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
	pub root: PathBuf,
	pub templates: PathBuf,
	pub assets: PathBuf,
	pub output: PathBuf,
	pub assets_output: PathBuf,
}

impl ProjectPaths {
	pub fn from_config(root: &Path, config: &TransplateConfig) -> Self {
		let output = root.join(&config.paths.output);

		Self {
			root: root.to_path_buf(),
			templates: root.join(&config.paths.templates),
			assets: root.join(&config.paths.assets),
			assets_output: output.join(&config.paths.assets_output),
			output,
		}
	}

	/// The output directory is wiped on every build, so it must not contain
	/// any of the source directories. The asset tree is copied into the
	/// output, so it must not contain the output either.
	pub fn validate(&self) -> TransplateResult<()> {
		for (name, source) in [("templates", &self.templates), ("assets", &self.assets)] {
			if source.starts_with(&self.output) {
				return Err(TransplateError::InvalidConfig(format!(
					"`paths.output` ({}) must not contain `paths.{name}` ({})",
					self.output.display(),
					source.display()
				)));
			}
		}

		for (name, target) in [
			("output", &self.output),
			("assets_output", &self.assets_output),
		] {
			if target.starts_with(&self.assets) {
				return Err(TransplateError::InvalidConfig(format!(
					"`paths.assets` ({}) must not contain `paths.{name}` ({})",
					self.assets.display(),
					target.display()
				)));
			}
		}

		Ok(())
	}
}

/// Selects which files of the template directory are transpiled.
#[derive(Debug, Clone)]
pub struct TemplateFilter {
	include: GlobSet,
	exclude: Gitignore,
}

impl TemplateFilter {
	pub fn new(dir: &Path, patterns: &[String], exclude: &[String]) -> TransplateResult<Self> {
		Ok(Self {
			include: build_glob_set(patterns)?,
			exclude: build_exclude_matcher(dir, exclude)?,
		})
	}

	/// True when `path` is a template that should be transpiled.
	pub fn matches(&self, path: &Path) -> bool {
		let Some(name) = path.file_name() else {
			return false;
		};

		self.include.is_match(name) && !self.exclude.matched(path, false).is_ignore()
	}
}

/// A project ready to be built or checked.
#[derive(Debug, Clone)]
pub struct ProjectContext {
	pub paths: ProjectPaths,
	pub transpiler: Transpiler,
	pub filter: TemplateFilter,
	/// Whether the asset directory is copied during a build.
	pub sync_assets: bool,
}

impl ProjectContext {
	pub fn new(root: &Path, config: &TransplateConfig) -> TransplateResult<Self> {
		let paths = ProjectPaths::from_config(root, config);
		paths.validate()?;
		let transpiler = Transpiler::new(config)?;
		let filter = TemplateFilter::new(
			&paths.templates,
			&config.templates.patterns,
			&config.templates.exclude,
		)?;

		Ok(Self {
			paths,
			transpiler,
			filter,
			sync_assets: config.assets.sync,
		})
	}

	/// True when a change at `path` can affect the build: a template, an
	/// asset or one of the config file candidates.
	pub fn is_source_change(&self, path: &Path) -> bool {
		path.starts_with(&self.paths.templates)
			|| (self.sync_assets && path.starts_with(&self.paths.assets))
			|| CONFIG_FILE_CANDIDATES
				.iter()
				.any(|candidate| path == self.paths.root.join(candidate))
	}

	/// Where the output of `source` is written.
	pub fn target_path(&self, source: &Path) -> PathBuf {
		match source.file_name() {
			Some(name) => self.paths.output.join(name),
			None => self.paths.output.clone(),
		}
	}
}

/// Load the project config at `root` (or defaults) and build its context.
pub fn load_project(root: &Path) -> TransplateResult<ProjectContext> {
	let config = TransplateConfig::load_or_default(root)?;
	ProjectContext::new(root, &config)
}

/// A transpiled template and the path it will be written to.
#[derive(Debug, Clone)]
pub struct PlannedOutput {
	pub source: PathBuf,
	pub target: PathBuf,
	pub document: OutputDocument,
}

/// Every output of a build, computed in memory.
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
	pub outputs: Vec<PlannedOutput>,
}

impl BuildPlan {
	/// All warnings paired with the template they came from.
	pub fn warnings(&self) -> Vec<(PathBuf, TranspileWarning)> {
		self.outputs
			.iter()
			.flat_map(|output| {
				output
					.document
					.warnings
					.iter()
					.map(|warning| (output.source.clone(), warning.clone()))
			})
			.collect()
	}
}

/// Result of a completed build.
#[derive(Debug, Clone, Default)]
pub struct BuildResult {
	/// Output files that were written.
	pub written: Vec<PathBuf>,
	/// Number of asset files copied.
	pub copied_assets: usize,
	pub warnings: Vec<(PathBuf, TranspileWarning)>,
}

/// An output file that does not match what a build would write.
#[derive(Debug, Clone)]
pub struct StaleOutput {
	pub source: PathBuf,
	pub target: PathBuf,
	/// Current file content, `None` when the file is missing.
	pub current: Option<String>,
	pub expected: String,
}

/// Result of checking the output directory against the templates.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
	pub stale: Vec<StaleOutput>,
	/// Number of templates compared.
	pub checked: usize,
	pub warnings: Vec<(PathBuf, TranspileWarning)>,
}

impl CheckResult {
	/// Returns true if every output is up to date.
	pub fn is_ok(&self) -> bool {
		self.stale.is_empty()
	}
}

/// List the templates to transpile, sorted by path. Only the top level of
/// the template directory is considered.
pub fn collect_templates(ctx: &ProjectContext) -> TransplateResult<Vec<PathBuf>> {
	let dir = &ctx.paths.templates;
	if !dir.is_dir() {
		return Err(TransplateError::MissingDirectory {
			path: dir.display().to_string(),
		});
	}

	let mut files = Vec::new();
	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && ctx.filter.matches(&path) {
			files.push(path);
		}
	}
	files.sort();

	Ok(files)
}

/// Read and transpile every template without touching the output directory.
pub fn plan_build(ctx: &ProjectContext) -> TransplateResult<BuildPlan> {
	let mut outputs = Vec::new();

	for source in collect_templates(ctx)? {
		let document = TemplateDocument::read(&source)?;
		let document = ctx.transpiler.transpile(&document)?;
		let target = ctx.target_path(&source);
		outputs.push(PlannedOutput {
			source,
			target,
			document,
		});
	}

	Ok(BuildPlan { outputs })
}

/// Transpile all templates, then replace the output directory with the
/// results and a fresh copy of the assets.
///
/// Nothing is removed unless every template transpiles. After that point
/// the run is not transactional: an I/O failure can leave the output
/// directory partially populated.
pub fn build_project(ctx: &ProjectContext) -> TransplateResult<BuildResult> {
	let plan = plan_build(ctx)?;

	if ctx.sync_assets && !ctx.paths.assets.is_dir() {
		return Err(TransplateError::MissingDirectory {
			path: ctx.paths.assets.display().to_string(),
		});
	}

	clear_directory(&ctx.paths.output)?;
	let written = write_outputs(&plan)?;
	let copied_assets = if ctx.sync_assets {
		sync_assets(&ctx.paths.assets, &ctx.paths.assets_output)?
	} else {
		0
	};

	Ok(BuildResult {
		written,
		copied_assets,
		warnings: plan.warnings(),
	})
}

/// Compare the output directory against a fresh build plan.
pub fn check_project(ctx: &ProjectContext) -> TransplateResult<CheckResult> {
	let plan = plan_build(ctx)?;
	let mut stale = Vec::new();

	for output in &plan.outputs {
		let expected = output.document.content();
		let current = match std::fs::read_to_string(&output.target) {
			Ok(content) => Some(content),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
			Err(e) => return Err(e.into()),
		};

		if current.as_deref() != Some(expected.as_str()) {
			stale.push(StaleOutput {
				source: output.source.clone(),
				target: output.target.clone(),
				current,
				expected,
			});
		}
	}

	Ok(CheckResult {
		stale,
		checked: plan.outputs.len(),
		warnings: plan.warnings(),
	})
}

/// Write every planned output, creating parent directories as needed.
pub fn write_outputs(plan: &BuildPlan) -> TransplateResult<Vec<PathBuf>> {
	let mut written = Vec::with_capacity(plan.outputs.len());

	for output in &plan.outputs {
		if let Some(parent) = output.target.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&output.target, output.document.content())?;
		tracing::debug!(path = %output.target.display(), "wrote output");
		written.push(output.target.clone());
	}

	Ok(written)
}

/// Remove everything inside `dir`, creating it when missing. Symlinks are
/// removed, not followed.
pub fn clear_directory(dir: &Path) -> TransplateResult<()> {
	std::fs::create_dir_all(dir)?;

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		let metadata = std::fs::symlink_metadata(&path)?;
		if metadata.is_dir() {
			std::fs::remove_dir_all(&path)?;
		} else {
			std::fs::remove_file(&path)?;
		}
	}

	tracing::debug!(dir = %dir.display(), "cleared output directory");
	Ok(())
}

/// Replace `destination` with a recursive copy of `source`. Returns the
/// number of files copied.
pub fn sync_assets(source: &Path, destination: &Path) -> TransplateResult<usize> {
	if !source.is_dir() {
		return Err(TransplateError::MissingDirectory {
			path: source.display().to_string(),
		});
	}

	if destination.exists() {
		std::fs::remove_dir_all(destination)?;
	}

	let mut visited_dirs = HashSet::new();
	let copied = copy_tree(source, destination, &mut visited_dirs)?;
	tracing::debug!(
		source = %source.display(),
		destination = %destination.display(),
		copied,
		"synchronized assets"
	);

	Ok(copied)
}

fn copy_tree(
	source: &Path,
	destination: &Path,
	visited_dirs: &mut HashSet<PathBuf>,
) -> TransplateResult<usize> {
	// Detect symlink cycles by tracking canonical paths.
	let canonical = source
		.canonicalize()
		.unwrap_or_else(|_| source.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Err(TransplateError::SymlinkCycle {
			path: source.display().to_string(),
		});
	}

	std::fs::create_dir_all(destination)?;
	let mut copied = 0;

	for entry in std::fs::read_dir(source)? {
		let path = entry?.path();
		let Some(name) = path.file_name() else {
			continue;
		};
		let target = destination.join(name);

		if path.is_dir() {
			copied += copy_tree(&path, &target, visited_dirs)?;
		} else {
			std::fs::copy(&path, &target)?;
			copied += 1;
		}
	}

	Ok(copied)
}

/// Build a `GlobSet` from a list of glob pattern strings.
fn build_glob_set(patterns: &[String]) -> TransplateResult<GlobSet> {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		let glob = Glob::new(pattern).map_err(|e| {
			TransplateError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
		builder.add(glob);
	}
	builder.build().map_err(|e| {
		TransplateError::InvalidPattern {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

fn build_exclude_matcher(root: &Path, patterns: &[String]) -> TransplateResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			TransplateError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
	}
	builder.build().map_err(|e| {
		TransplateError::InvalidPattern {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}
