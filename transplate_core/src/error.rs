use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TransplateError {
	#[error(transparent)]
	#[diagnostic(code(transplate::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(transplate::config_parse),
		help("check that transplate.toml is valid TOML with [paths], [templates], [markers] and/or [assets] sections")
	)]
	ConfigParse(String),

	#[error("invalid configuration: {0}")]
	#[diagnostic(code(transplate::invalid_config))]
	InvalidConfig(String),

	#[error("invalid pattern `{pattern}`: {reason}")]
	#[diagnostic(code(transplate::invalid_pattern))]
	InvalidPattern { pattern: String, reason: String },

	#[error("missing end marker for block `{key}` opened at {file}:{line}")]
	#[diagnostic(
		code(transplate::missing_end_marker),
		help("add `<!-- {key}:<source>:end -->` after the block body")
	)]
	MissingEndMarker {
		file: String,
		key: String,
		line: usize,
	},

	#[error("override block `{key}` opened at {file}:{line} is never closed")]
	#[diagnostic(
		code(transplate::unclosed_override),
		help("close the override comment with a line containing `-->`")
	)]
	UnclosedOverride {
		file: String,
		key: String,
		line: usize,
	},

	#[error("directory not found: `{path}`")]
	#[diagnostic(
		code(transplate::missing_directory),
		help("check the [paths] section of transplate.toml")
	)]
	MissingDirectory { path: String },

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(transplate::symlink_cycle),
		help("remove the circular symlink from the asset directory")
	)]
	SymlinkCycle { path: String },
}

impl TransplateError {
	/// Returns true for errors caused by a malformed template rather than the
	/// environment.
	pub fn is_malformed_block(&self) -> bool {
		matches!(
			self,
			Self::MissingEndMarker { .. } | Self::UnclosedOverride { .. }
		)
	}
}

pub type TransplateResult<T> = Result<T, TransplateError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
