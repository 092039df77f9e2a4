use std::path::Path;

use crate::TransplateConfig;
use crate::TransplateResult;
use crate::Transpiler;

pub const OVERRIDE_TEMPLATE: &str = "<body>
<!-- help:django:start -->
<div>server</div>
<!-- help:django:end -->
<!-- help:tauri
<div>embedded</div>
-->
</body>
";

pub const FALLBACK_TEMPLATE: &str = "<body>
<!-- help:django:start -->
<div>server</div>
<!-- help:django:end -->
</body>
";

pub const PAGE_TEMPLATE: &str = r#"{% load static %}
<!DOCTYPE html>
<html>
<head>
    <link rel="icon" href="{% static 'assets/favicon.ico' %}">
    {% if DEBUG %}
        {% load livereload_tags %}
        {% livereload_script %}
    {% endif %}
</head>
<body>
    <!-- about-toolbar-button:django:start -->
    <div class="toolbar-button" title="Help" onclick="window.open('/about', '_blank').focus();">
        <span class="toolbar-help-button"></span>
    </div>
    <!-- about-toolbar-button:django:end -->
    <!-- about-toolbar-button:tauri
    <div class="toolbar-button" title="Help" onclick="window.__TAURI__.core.invoke('open_about_window')">
        <span class="toolbar-help-button"></span>
    </div>
    -->
    <script src="{% static 'js/toolbar.js' %}"></script>
</body>
</html>
"#;

pub const PAGE_OUTPUT: &str = r#"<!DOCTYPE html>
<html>
<head>
    <link rel="icon" href="static/assets/favicon.ico">
</head>
<body>
    <div class="toolbar-button" title="Help" onclick="window.__TAURI__.core.invoke('open_about_window')">
        <span class="toolbar-help-button"></span>
    </div>
    <script src="static/js/toolbar.js"></script>
</body>
</html>
"#;

pub fn default_transpiler() -> Transpiler {
	Transpiler::new(&TransplateConfig::default()).expect("default config is valid")
}

pub fn transpile(content: &str) -> TransplateResult<String> {
	default_transpiler().transpile_str("page.html", content)
}

/// A block pair followed by `gap` blank lines and then its override.
pub fn override_after_gap(gap: usize) -> String {
	format!(
		"<!-- help:django:start -->\n<div>server</div>\n<!-- help:django:end \
		 -->\n{}<!-- help:tauri\n<div>embedded</div>\n-->\n",
		"\n".repeat(gap)
	)
}

/// Create a project layout with `templates/`, `static/` and an optional
/// config file.
pub fn create_project(root: &Path, config: Option<&str>) -> std::io::Result<()> {
	std::fs::create_dir_all(root.join("templates"))?;
	std::fs::create_dir_all(root.join("static/js"))?;
	std::fs::write(root.join("templates/index.html"), PAGE_TEMPLATE)?;
	std::fs::write(root.join("templates/help.html"), OVERRIDE_TEMPLATE)?;
	std::fs::write(root.join("templates/notes.txt"), "not a template\n")?;
	std::fs::write(root.join("static/js/toolbar.js"), "console.log('toolbar');\n")?;
	std::fs::write(root.join("static/style.css"), "body { margin: 0; }\n")?;

	if let Some(config) = config {
		std::fs::write(root.join("transplate.toml"), config)?;
	}

	Ok(())
}
