use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::TransplateError;
use crate::TransplateResult;

/// Default number of lines searched after a block's end marker for a
/// matching override block.
pub const DEFAULT_LOOKAHEAD: usize = 10;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"transplate.toml",
	".transplate.toml",
	".config/transplate.toml",
];

/// Configuration loaded from a `transplate.toml` file.
///
/// ```toml
/// [paths]
/// templates = "docker/app/ivaprime/templates/ivaprime"
/// assets = "docker/app/ivaprime/static"
/// output = "tauri/iva-prime/src"
/// assets_output = "static"
///
/// [templates]
/// patterns = ["*.html"]
/// exclude = ["_*.html"]
///
/// [markers]
/// source = "django"
/// target = "tauri"
/// lookahead = 10
///
/// [assets]
/// prefix = "static/"
/// sync = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransplateConfig {
	/// Source and destination directories, relative to the project root.
	#[serde(default)]
	pub paths: PathsConfig,
	/// Which files in the template directory are transpiled.
	#[serde(default)]
	pub templates: TemplatesConfig,
	/// Marker vocabulary for block pairs and overrides.
	#[serde(default)]
	pub markers: MarkersConfig,
	/// Asset path rewriting and synchronization.
	#[serde(default)]
	pub assets: AssetsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
	/// Directory holding the server templates.
	#[serde(default = "default_templates_dir")]
	pub templates: PathBuf,
	/// Directory holding the server's static assets.
	#[serde(default = "default_assets_dir")]
	pub assets: PathBuf,
	/// Destination root. Cleared before every build.
	#[serde(default = "default_output_dir")]
	pub output: PathBuf,
	/// Destination for assets, relative to `output`.
	#[serde(default = "default_assets_output_dir")]
	pub assets_output: PathBuf,
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			templates: default_templates_dir(),
			assets: default_assets_dir(),
			output: default_output_dir(),
			assets_output: default_assets_output_dir(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatesConfig {
	/// Glob patterns matched against template file names.
	#[serde(default = "default_template_patterns")]
	pub patterns: Vec<String>,
	/// Gitignore-style patterns for template files to skip.
	#[serde(default)]
	pub exclude: Vec<String>,
}

impl Default for TemplatesConfig {
	fn default() -> Self {
		Self {
			patterns: default_template_patterns(),
			exclude: Vec::new(),
		}
	}
}

/// Environment names used inside block markers.
///
/// With the defaults a block pair is written as
/// `<!-- key:django:start -->` ... `<!-- key:django:end -->` and its override
/// as `<!-- key:tauri`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkersConfig {
	#[serde(default = "default_source_marker")]
	pub source: String,
	#[serde(default = "default_target_marker")]
	pub target: String,
	/// Number of lines after an end marker searched for the override.
	#[serde(default = "default_lookahead")]
	pub lookahead: usize,
}

impl Default for MarkersConfig {
	fn default() -> Self {
		Self {
			source: default_source_marker(),
			target: default_target_marker(),
			lookahead: DEFAULT_LOOKAHEAD,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetsConfig {
	/// Prefix substituted for `{% static '...' %}` directives.
	#[serde(default = "default_asset_prefix")]
	pub prefix: String,
	/// When false the asset directory is not copied during a build.
	#[serde(default = "default_true")]
	pub sync: bool,
}

impl Default for AssetsConfig {
	fn default() -> Self {
		Self {
			prefix: default_asset_prefix(),
			sync: true,
		}
	}
}

fn default_templates_dir() -> PathBuf {
	PathBuf::from("templates")
}

fn default_assets_dir() -> PathBuf {
	PathBuf::from("static")
}

fn default_output_dir() -> PathBuf {
	PathBuf::from("dist")
}

fn default_assets_output_dir() -> PathBuf {
	PathBuf::from("static")
}

fn default_template_patterns() -> Vec<String> {
	vec!["*.html".to_string()]
}

fn default_source_marker() -> String {
	"django".to_string()
}

fn default_target_marker() -> String {
	"tauri".to_string()
}

fn default_lookahead() -> usize {
	DEFAULT_LOOKAHEAD
}

fn default_asset_prefix() -> String {
	"static/".to_string()
}

fn default_true() -> bool {
	true
}

impl TransplateConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> TransplateResult<Option<TransplateConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;

		Ok(Some(config))
	}

	/// Load the discovered config, falling back to defaults when no config
	/// file exists.
	pub fn load_or_default(root: &Path) -> TransplateResult<TransplateConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	/// Parse and validate config file content.
	pub fn parse(content: &str) -> TransplateResult<TransplateConfig> {
		let config: TransplateConfig =
			toml::from_str(content).map_err(|e| TransplateError::ConfigParse(e.to_string()))?;
		config.validate()?;

		Ok(config)
	}

	/// Reject values the transpiler cannot work with.
	pub fn validate(&self) -> TransplateResult<()> {
		if self.markers.lookahead == 0 {
			return Err(TransplateError::InvalidConfig(
				"`markers.lookahead` must be at least 1".to_string(),
			));
		}

		for (field, value) in [
			("markers.source", &self.markers.source),
			("markers.target", &self.markers.target),
		] {
			if value.is_empty() || !value.chars().all(is_marker_char) {
				return Err(TransplateError::InvalidConfig(format!(
					"`{field}` must be a non-empty name made of letters, digits, `-` or `_`, got \
					 `{value}`"
				)));
			}
		}

		if self.markers.source == self.markers.target {
			return Err(TransplateError::InvalidConfig(
				"`markers.source` and `markers.target` must differ".to_string(),
			));
		}

		// The asset destination is deleted before every copy, so it must name a
		// directory strictly below `paths.output`.
		let assets_output = &self.paths.assets_output;
		if assets_output.as_os_str().is_empty()
			|| !assets_output
				.components()
				.all(|component| matches!(component, Component::Normal(_)))
		{
			return Err(TransplateError::InvalidConfig(format!(
				"`paths.assets_output` must be a subdirectory of `paths.output` without `.` or 				 `..`, got `{}`",
				assets_output.display()
			)));
		}

		Ok(())
	}
}

/// Characters allowed in block keys and environment names.
pub fn is_marker_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// The sample configuration written by `transplate init`.
pub const SAMPLE_CONFIG: &str = r#"# transplate configuration

[paths]
# Server templates to transpile.
templates = "templates"
# Static assets copied next to the generated pages.
assets = "static"
# Destination root. Everything inside is removed before each build.
output = "dist"
# Asset destination, relative to `output`.
assets_output = "static"

[templates]
patterns = ["*.html"]
# exclude = ["_*.html"]

[markers]
# <!-- key:django:start --> ... <!-- key:django:end -->
source = "django"
# <!-- key:tauri ... -->
target = "tauri"
lookahead = 10

[assets]
prefix = "static/"
sync = true
"#;
