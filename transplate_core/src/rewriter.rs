use std::borrow::Cow;

use regex::Captures;
use regex::Regex;

use crate::recognizer::ASSET_DIRECTIVE;

/// Replace every match of `pattern` in `line` with `prefix` followed by the
/// pattern's first capture group. Text outside the matches is untouched.
pub fn rewrite_asset_paths<'a>(line: &'a str, pattern: &Regex, prefix: &str) -> Cow<'a, str> {
	pattern.replace_all(line, |captures: &Captures<'_>| {
		let path = captures.get(1).map_or("", |m| m.as_str());
		format!("{prefix}{path}")
	})
}

/// Rewrites `{% static '...' %}` directives into plain relative paths.
#[derive(Debug, Clone)]
pub struct PathRewriter {
	prefix: String,
}

impl PathRewriter {
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
		}
	}

	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// Rewrite all asset directives in `line`. Borrowed when nothing matched.
	pub fn rewrite<'a>(&self, line: &'a str) -> Cow<'a, str> {
		rewrite_asset_paths(line, &ASSET_DIRECTIVE, &self.prefix)
	}
}

impl Default for PathRewriter {
	fn default() -> Self {
		Self::new("static/")
	}
}
