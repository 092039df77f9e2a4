use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::TransplateError;
use crate::TransplateResult;
use crate::config::TransplateConfig;
use crate::recognizer::LineKind;
use crate::recognizer::OverrideOpen;
use crate::recognizer::Recognizer;
use crate::recognizer::is_directive_line;
use crate::recognizer::is_override_close;
use crate::recognizer::line_ending;
use crate::recognizer::strip_line_ending;
use crate::recognizer::unmatched_asset_directives;
use crate::rewriter::PathRewriter;

/// A template read fully into memory. Lines keep their line endings so the
/// output reproduces the source byte for byte where nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
	/// The file name used in diagnostics and for the mirrored output path.
	pub name: PathBuf,
	pub lines: Vec<String>,
}

impl TemplateDocument {
	pub fn new(name: impl Into<PathBuf>, content: &str) -> Self {
		Self {
			name: name.into(),
			lines: content.split_inclusive('\n').map(str::to_string).collect(),
		}
	}

	/// Read a template from disk.
	pub fn read(path: &Path) -> TransplateResult<Self> {
		let content = std::fs::read_to_string(path)?;
		Ok(Self::new(path, &content))
	}
}

/// The transpiled form of a [`TemplateDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
	pub name: PathBuf,
	pub lines: Vec<String>,
	/// Non-fatal findings, in source order.
	pub warnings: Vec<TranspileWarning>,
}

impl OutputDocument {
	/// The output text, ready to be written verbatim.
	pub fn content(&self) -> String {
		self.lines.concat()
	}
}

/// A non-fatal problem found while transpiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranspileWarning {
	/// 1-indexed source line.
	pub line: usize,
	pub kind: WarningKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum WarningKind {
	/// A `{% static` directive that is not of the form `{% static 'path' %}`.
	/// It is left unrewritten.
	UnmatchedAssetDirective { text: String },
	/// An override block with no block pair to replace. It is dropped.
	OrphanOverride { key: String },
	/// An end marker with no open block. It is kept as text.
	StrayEndMarker { key: String },
	/// A start marker inside another block's body. It is kept as text.
	NestedBlockStart { key: String, outer: String },
}

impl TranspileWarning {
	/// Human-readable message for this warning.
	pub fn message(&self) -> String {
		match &self.kind {
			WarningKind::UnmatchedAssetDirective { text } => {
				format!("asset directive `{text}` was left unrewritten")
			}
			WarningKind::OrphanOverride { key } => {
				format!("override block `{key}` does not follow a matching block and was dropped")
			}
			WarningKind::StrayEndMarker { key } => {
				format!("end marker for `{key}` has no matching start marker")
			}
			WarningKind::NestedBlockStart { key, outer } => {
				format!("start marker for `{key}` inside block `{outer}` is treated as content")
			}
		}
	}
}

/// Converts server templates into static pages.
///
/// Directive lines are dropped, asset directives are rewritten through a
/// [`PathRewriter`], and every block pair is replaced by the override block
/// that follows it, or by its own body when there is none.
#[derive(Debug, Clone)]
pub struct Transpiler {
	recognizer: Recognizer,
	rewriter: PathRewriter,
	lookahead: usize,
}

impl Transpiler {
	pub fn new(config: &TransplateConfig) -> TransplateResult<Self> {
		config.validate()?;

		Ok(Self {
			recognizer: Recognizer::new(&config.markers)?,
			rewriter: PathRewriter::new(config.assets.prefix.clone()),
			lookahead: config.markers.lookahead,
		})
	}

	pub fn recognizer(&self) -> &Recognizer {
		&self.recognizer
	}

	pub fn rewriter(&self) -> &PathRewriter {
		&self.rewriter
	}

	pub fn lookahead(&self) -> usize {
		self.lookahead
	}

	/// Transpile one document.
	pub fn transpile(&self, document: &TemplateDocument) -> TransplateResult<OutputDocument> {
		tracing::debug!(file = %document.name.display(), lines = document.lines.len(), "transpiling");
		Pass::new(self, document).run()
	}

	/// Transpile in-memory content and return the output text.
	pub fn transpile_str(&self, name: &str, content: &str) -> TransplateResult<String> {
		let document = TemplateDocument::new(name, content);
		Ok(self.transpile(&document)?.content())
	}

	/// Transpile several documents, stopping at the first malformed one.
	pub fn transpile_all<'d>(
		&self,
		documents: impl IntoIterator<Item = &'d TemplateDocument>,
	) -> TransplateResult<Vec<OutputDocument>> {
		documents
			.into_iter()
			.map(|document| self.transpile(document))
			.collect()
	}
}

/// Where the scan is within the document.
enum ScanState<'a> {
	/// Plain lines are emitted as they come.
	Scanning,
	/// Collecting the primary body of block `key`.
	InBlockBody {
		key: &'a str,
		opened_at: usize,
		body: Vec<(usize, &'a str)>,
	},
	/// The end marker of `key` was consumed. Probing for its override.
	SearchingOverride {
		key: &'a str,
		body: Vec<(usize, &'a str)>,
		search_from: usize,
	},
	/// Inside an override comment. Lines are emitted only when the override
	/// replaces a block.
	InOverrideBody {
		key: &'a str,
		opened_at: usize,
		replaces_block: bool,
	},
	Done,
}

/// One processing pass over a document. The cursor indexes into the line
/// array and moves by varying amounts depending on what the look-ahead finds.
struct Pass<'t, 'a> {
	transpiler: &'t Transpiler,
	document: &'a TemplateDocument,
	cursor: usize,
	output: Vec<String>,
	warnings: Vec<TranspileWarning>,
}

impl<'t, 'a> Pass<'t, 'a> {
	fn new(transpiler: &'t Transpiler, document: &'a TemplateDocument) -> Self {
		Self {
			transpiler,
			document,
			cursor: 0,
			output: Vec::with_capacity(document.lines.len()),
			warnings: Vec::new(),
		}
	}

	fn run(mut self) -> TransplateResult<OutputDocument> {
		let mut state = ScanState::Scanning;

		loop {
			state = match state {
				ScanState::Scanning => self.scan(),
				ScanState::InBlockBody {
					key,
					opened_at,
					body,
				} => self.block_body(key, opened_at, body)?,
				ScanState::SearchingOverride {
					key,
					body,
					search_from,
				} => self.search_override(key, body, search_from),
				ScanState::InOverrideBody {
					key,
					opened_at,
					replaces_block,
				} => self.override_body(key, opened_at, replaces_block)?,
				ScanState::Done => break,
			};
		}

		Ok(OutputDocument {
			name: self.document.name.clone(),
			lines: self.output,
			warnings: self.warnings,
		})
	}

	fn line(&self, index: usize) -> Option<&'a str> {
		self.document.lines.get(index).map(String::as_str)
	}

	fn file_name(&self) -> String {
		self.document.name.display().to_string()
	}

	fn classify(&self, line: &'a str) -> LineKind<'a> {
		self.transpiler.recognizer.classify(line)
	}

	fn scan(&mut self) -> ScanState<'a> {
		let Some(line) = self.line(self.cursor) else {
			return ScanState::Done;
		};
		let index = self.cursor;
		self.cursor += 1;

		match self.classify(line) {
			LineKind::Directive => ScanState::Scanning,
			LineKind::BlockStart(key) => {
				ScanState::InBlockBody {
					key,
					opened_at: index,
					body: Vec::new(),
				}
			}
			LineKind::OverrideOpen(open) => {
				self.warn(
					index,
					WarningKind::OrphanOverride {
						key: open.key.to_string(),
					},
				);
				self.enter_override(open, index, line, false)
			}
			LineKind::BlockEnd(key) => {
				self.warn(
					index,
					WarningKind::StrayEndMarker {
						key: key.to_string(),
					},
				);
				self.emit(index, line);
				ScanState::Scanning
			}
			LineKind::Text => {
				self.emit(index, line);
				ScanState::Scanning
			}
		}
	}

	fn block_body(
		&mut self,
		key: &'a str,
		opened_at: usize,
		mut body: Vec<(usize, &'a str)>,
	) -> TransplateResult<ScanState<'a>> {
		let Some(line) = self.line(self.cursor) else {
			return Err(TransplateError::MissingEndMarker {
				file: self.file_name(),
				key: key.to_string(),
				line: opened_at + 1,
			});
		};
		let index = self.cursor;
		self.cursor += 1;

		match self.classify(line) {
			LineKind::BlockEnd(end) if end == key => {
				return Ok(ScanState::SearchingOverride {
					key,
					body,
					search_from: self.cursor,
				});
			}
			LineKind::Directive => {}
			LineKind::BlockStart(inner) => {
				self.warn(
					index,
					WarningKind::NestedBlockStart {
						key: inner.to_string(),
						outer: key.to_string(),
					},
				);
				body.push((index, line));
			}
			_ => body.push((index, line)),
		}

		Ok(ScanState::InBlockBody {
			key,
			opened_at,
			body,
		})
	}

	fn search_override(
		&mut self,
		key: &'a str,
		body: Vec<(usize, &'a str)>,
		search_from: usize,
	) -> ScanState<'a> {
		let document = self.document;
		let window = document
			.lines
			.iter()
			.enumerate()
			.skip(search_from)
			.take(self.transpiler.lookahead);

		for (index, line) in window {
			match self.classify(line) {
				LineKind::OverrideOpen(open) if open.key == key => {
					tracing::debug!(
						file = %document.name.display(),
						key,
						line = index + 1,
						"applying override"
					);
					self.cursor = index + 1;
					return self.enter_override(open, index, line, true);
				}
				LineKind::BlockStart(_) => break,
				_ => {}
			}
		}

		for (index, line) in body {
			self.emit(index, line);
		}
		self.cursor = search_from;

		ScanState::Scanning
	}

	fn enter_override(
		&mut self,
		open: OverrideOpen<'a>,
		index: usize,
		line: &'a str,
		replaces_block: bool,
	) -> ScanState<'a> {
		let Some(inline) = open.inline else {
			return ScanState::InOverrideBody {
				key: open.key,
				opened_at: index,
				replaces_block,
			};
		};

		if replaces_block && !inline.is_empty() {
			let indent = &line[..line.len() - line.trim_start().len()];
			let text = format!("{indent}{inline}{}", line_ending(line));
			self.emit(index, &text);
		}

		ScanState::Scanning
	}

	fn override_body(
		&mut self,
		key: &'a str,
		opened_at: usize,
		replaces_block: bool,
	) -> TransplateResult<ScanState<'a>> {
		let Some(line) = self.line(self.cursor) else {
			return Err(TransplateError::UnclosedOverride {
				file: self.file_name(),
				key: key.to_string(),
				line: opened_at + 1,
			});
		};
		let index = self.cursor;
		self.cursor += 1;

		if is_override_close(line) {
			return Ok(ScanState::Scanning);
		}

		if replaces_block && !is_directive_line(line) {
			self.emit(index, line);
		}

		Ok(ScanState::InOverrideBody {
			key,
			opened_at,
			replaces_block,
		})
	}

	/// Rewrite asset directives in `line` and append it to the output.
	fn emit(&mut self, index: usize, line: &str) {
		let rewritten = self.transpiler.rewriter.rewrite(line);

		for start in unmatched_asset_directives(&rewritten) {
			let text = strip_line_ending(&rewritten[start..]);
			let text = text
				.find("%}")
				.map_or(text, |end| &text[..end + 2])
				.to_string();
			self.warn(index, WarningKind::UnmatchedAssetDirective { text });
		}

		self.output.push(rewritten.into_owned());
	}

	fn warn(&mut self, index: usize, kind: WarningKind) {
		let warning = TranspileWarning {
			line: index + 1,
			kind,
		};
		tracing::warn!(
			file = %self.document.name.display(),
			line = warning.line,
			"{}",
			warning.message()
		);
		self.warnings.push(warning);
	}
}
