#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;

pub const PAGE: &str = r#"{% load static %}
<html>
<head>
    <link rel="stylesheet" href="{% static 'style.css' %}">
</head>
<body>
    <!-- help:django:start -->
    <a href="/about">Help</a>
    <!-- help:django:end -->
    <!-- help:tauri
    <a onclick="window.__TAURI__.core.invoke('open_about_window')">Help</a>
    -->
</body>
</html>
"#;

pub const PAGE_OUTPUT: &str = r#"<html>
<head>
    <link rel="stylesheet" href="static/style.css">
</head>
<body>
    <a onclick="window.__TAURI__.core.invoke('open_about_window')">Help</a>
</body>
</html>
"#;

pub fn transplate_cmd() -> Command {
	let mut cmd = Command::cargo_bin("transplate").expect("binary is built");
	cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
	cmd
}

/// A project with one page, one asset and the default layout.
pub fn create_project(root: &Path) -> std::io::Result<()> {
	std::fs::create_dir_all(root.join("templates"))?;
	std::fs::create_dir_all(root.join("static/img"))?;
	std::fs::write(root.join("templates/index.html"), PAGE)?;
	std::fs::write(root.join("static/style.css"), "body { margin: 0; }\n")?;
	std::fs::write(root.join("static/img/logo.svg"), "<svg></svg>\n")?;
	Ok(())
}
