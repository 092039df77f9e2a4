mod common;

use transplate_core::AnyEmptyResult;

#[test]
fn render_prints_transpiled_template() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::create_project(tmp.path())?;

	common::transplate_cmd()
		.arg("render")
		.arg(tmp.path().join("templates/index.html"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(common::PAGE_OUTPUT);

	assert!(!tmp.path().join("dist").exists());

	Ok(())
}

#[test]
fn render_uses_project_markers() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("transplate.toml"),
		"[markers]\nsource = \"web\"\ntarget = \"desktop\"\n",
	)?;
	let file = tmp.path().join("page.html");
	std::fs::write(
		&file,
		"<!-- nav:web:start -->\n<a href=\"/\">Home</a>\n<!-- nav:web:end -->\n<!-- nav:desktop \
		 <a>Home</a> -->\n",
	)?;

	common::transplate_cmd()
		.arg("render")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("<a>Home</a>\n");

	Ok(())
}

#[test]
fn render_missing_file_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::transplate_cmd()
		.arg("render")
		.arg(tmp.path().join("missing.html"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2);

	Ok(())
}
