use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::TransplateError;
use crate::TransplateResult;
use crate::config::MarkersConfig;

/// A line whose whole trimmed content is a single `{% ... %}` tag.
static DIRECTIVE_LINE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^\s*\{%\s*[^%]+?\s*%\}\s*$").expect("directive line pattern is valid")
});

/// `{% static 'path' %}` or `{% static "path" %}` anywhere in a line.
pub(crate) static ASSET_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"\{%\s*static\s+['"]([^'"]+)['"]\s*%\}"#).expect("asset directive pattern is valid")
});

/// Any `{% static` opening, used to find asset directives the rewriter could
/// not understand.
static ASSET_DIRECTIVE_OPEN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\{%\s*static\b").expect("asset opening pattern is valid"));

const KEY_PATTERN: &str = "[A-Za-z0-9_-]+";

/// Classification of a single template line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
	/// A pure templating directive. Never emitted.
	Directive,
	/// `<!-- key:<source>:start -->`
	BlockStart(&'a str),
	/// `<!-- key:<source>:end -->`
	BlockEnd(&'a str),
	/// `<!-- key:<target>` with an optional same-line close.
	OverrideOpen(OverrideOpen<'a>),
	/// Anything else.
	Text,
}

/// The opening line of an override block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideOpen<'a> {
	pub key: &'a str,
	/// The trimmed text between the marker and `-->` when the comment closes
	/// on the same line. `None` when the body continues on following lines.
	pub inline: Option<&'a str>,
}

/// An asset reference found inside a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDirective<'a> {
	/// The relative path between the quotes.
	pub path: &'a str,
	/// Byte range of the whole `{% static ... %}` span.
	pub span: Range<usize>,
}

/// Recognizes directive lines and block markers for one marker vocabulary.
#[derive(Debug, Clone)]
pub struct Recognizer {
	block_start: Regex,
	block_end: Regex,
	override_open: Regex,
}

impl Recognizer {
	/// Build the marker recognizers for the configured environment names.
	pub fn new(markers: &MarkersConfig) -> TransplateResult<Self> {
		let source = regex::escape(&markers.source);
		let target = regex::escape(&markers.target);

		Ok(Self {
			block_start: compile(&format!(
				r"^\s*<!--\s*({KEY_PATTERN}):{source}:start\s*-->"
			))?,
			block_end: compile(&format!(r"^\s*<!--\s*({KEY_PATTERN}):{source}:end\s*-->"))?,
			override_open: compile(&format!(r"^\s*<!--\s*({KEY_PATTERN}):{target}\b(.*)$"))?,
		})
	}

	/// Classify a line. Directive lines take precedence over markers.
	pub fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
		if is_directive_line(line) {
			return LineKind::Directive;
		}

		if let Some(key) = self.block_start(line) {
			return LineKind::BlockStart(key);
		}

		if let Some(key) = self.block_end(line) {
			return LineKind::BlockEnd(key);
		}

		if let Some(open) = self.override_open(line) {
			return LineKind::OverrideOpen(open);
		}

		LineKind::Text
	}

	/// Returns the key of a block start marker.
	pub fn block_start<'a>(&self, line: &'a str) -> Option<&'a str> {
		capture_key(&self.block_start, line)
	}

	/// Returns the key of a block end marker.
	pub fn block_end<'a>(&self, line: &'a str) -> Option<&'a str> {
		capture_key(&self.block_end, line)
	}

	/// Recognize the opening line of an override block.
	pub fn override_open<'a>(&self, line: &'a str) -> Option<OverrideOpen<'a>> {
		let captures = self.override_open.captures(strip_line_ending(line))?;
		let key = captures.get(1)?.as_str();
		let rest = captures.get(2).map_or("", |m| m.as_str());
		let inline = rest.find("-->").map(|end| rest[..end].trim());

		Some(OverrideOpen { key, inline })
	}
}

fn compile(pattern: &str) -> TransplateResult<Regex> {
	Regex::new(pattern).map_err(|e| {
		TransplateError::InvalidPattern {
			pattern: pattern.to_string(),
			reason: e.to_string(),
		}
	})
}

fn capture_key<'a>(regex: &Regex, line: &'a str) -> Option<&'a str> {
	regex
		.captures(strip_line_ending(line))
		.and_then(|captures| captures.get(1))
		.map(|m| m.as_str())
}

/// Remove a trailing `\n` or `\r\n`.
pub fn strip_line_ending(line: &str) -> &str {
	line.strip_suffix('\n')
		.map_or(line, |rest| rest.strip_suffix('\r').unwrap_or(rest))
}

/// The line ending of `line`, if any.
pub fn line_ending(line: &str) -> &str {
	&line[strip_line_ending(line).len()..]
}

/// True when the line is nothing but one `{% ... %}` tag.
pub fn is_directive_line(line: &str) -> bool {
	DIRECTIVE_LINE.is_match(line)
}

/// True when the line closes an override comment.
pub fn is_override_close(line: &str) -> bool {
	line.contains("-->")
}

/// All well-formed asset directives in `line`, in order.
pub fn asset_directives(line: &str) -> Vec<AssetDirective<'_>> {
	ASSET_DIRECTIVE
		.captures_iter(line)
		.filter_map(|captures| {
			let whole = captures.get(0)?;
			let path = captures.get(1)?;
			Some(AssetDirective {
				path: path.as_str(),
				span: whole.range(),
			})
		})
		.collect()
}

/// Byte offsets of `{% static` openings that are not part of a well-formed
/// asset directive.
pub fn unmatched_asset_directives(line: &str) -> Vec<usize> {
	let matched = asset_directives(line);
	ASSET_DIRECTIVE_OPEN
		.find_iter(line)
		.map(|m| m.start())
		.filter(|start| !matched.iter().any(|d| d.span.contains(start)))
		.collect()
}
