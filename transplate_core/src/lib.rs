//! `transplate_core` is the core library for [transplate](https://github.com/iva-prime/transplate). It turns server-side HTML templates into static pages for an embedded runtime: templating directive lines are dropped, asset directives become plain relative paths, and marked regions can be swapped for an alternate rendering written next to them.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template file
//!   → Recognizer (classifies each line: directive, block start/end, override open, text)
//!   → Transpiler (cursor-driven scan, resolves block pairs against their overrides)
//!   → Path rewriter (`{% static 'a.png' %}` → `static/a.png`)
//!   → Project (lists templates, clears the output directory, writes pages, copies assets)
//! ```
//!
//! ## Block Overrides
//!
//! A region written for the server is wrapped in a block pair. The comment
//! that follows it holds the markup for the embedded runtime:
//!
//! ```html
//! <!-- help:django:start -->
//! <a href="/about">Help</a>
//! <!-- help:django:end -->
//! <!-- help:tauri
//! <a onclick="window.__TAURI__.core.invoke('open_about_window')">Help</a>
//! -->
//! ```
//!
//! The generated page contains only the second anchor. Without the trailing
//! comment it contains the first one, minus the markers.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `transplate.toml`: directories, template patterns, marker names and the asset prefix.
//! - [`project`]: Template discovery, build and check pipelines, asset synchronization.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use transplate_core::project::build_project;
//! use transplate_core::project::load_project;
//!
//! let ctx = load_project(Path::new(".")).unwrap();
//! let result = build_project(&ctx).unwrap();
//! println!("wrote {} page(s)", result.written.len());
//! ```

pub use config::*;
pub use error::*;
pub use recognizer::*;
pub use rewriter::*;
pub use transpiler::*;

pub mod config;
#[allow(unused_assignments)]
mod error;
pub mod project;
mod recognizer;
mod rewriter;
mod transpiler;

#[cfg(test)]
mod __fixtures;
