//! Staging of the dummy toolset consumed by the external probe child.
//!
//! The build system refuses to run without a resolvable toolset, so a no-op
//! one is written next to a root build script that echoes marker lines.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tempfile::TempDir;
use tracing::debug;

const TOOLSET_JAM_TEMPLATE: &str = include_str!("toolset/toolset.jam");
const TOOLSET_PY_TEMPLATE: &str = include_str!("toolset/toolset.py");
const JAMROOT_TEMPLATE: &str = include_str!("toolset/jamroot.jam");

/// Paths of the staged files. Owns the temporary directory when one was created.
#[derive(Debug)]
pub struct StagedToolset {
    pub dir: PathBuf,
    pub toolset_jam_path: PathBuf,
    pub toolset_py_path: PathBuf,
    pub jamroot_path: PathBuf,
    _temp: Option<TempDir>,
}

impl StagedToolset {
    /// Stage into a fresh temporary directory removed on drop.
    pub fn temporary(toolset: &str) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("envprobe-")
            .tempdir()
            .context("create staging dir")?;
        let mut staged = Self::stage_into(temp.path(), toolset)?;
        staged._temp = Some(temp);
        Ok(staged)
    }

    /// Stage into an existing (or to-be-created) directory that is kept.
    pub fn stage_into(dir: &Path, toolset: &str) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

        let engine = ToolsetTemplates::new()?;
        let toolset_jam_path = dir.join(format!("{toolset}.jam"));
        let toolset_py_path = dir.join(format!("{toolset}.py"));
        let jamroot_path = dir.join("jamroot.jam");

        write_text(&toolset_jam_path, &engine.render("toolset.jam", toolset)?)?;
        write_text(&toolset_py_path, &engine.render("toolset.py", toolset)?)?;
        write_text(&jamroot_path, &engine.render("jamroot.jam", toolset)?)?;
        debug!(dir = %dir.display(), toolset, "staged dummy toolset");

        Ok(Self {
            dir: dir.to_path_buf(),
            toolset_jam_path,
            toolset_py_path,
            jamroot_path,
            _temp: None,
        })
    }
}

struct ToolsetTemplates {
    env: Environment<'static>,
}

impl ToolsetTemplates {
    fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.add_template("toolset.jam", TOOLSET_JAM_TEMPLATE)
            .context("load toolset.jam template")?;
        env.add_template("toolset.py", TOOLSET_PY_TEMPLATE)
            .context("load toolset.py template")?;
        env.add_template("jamroot.jam", JAMROOT_TEMPLATE)
            .context("load jamroot.jam template")?;
        Ok(Self { env })
    }

    fn render(&self, name: &str, toolset: &str) -> Result<String> {
        let template = self.env.get_template(name)?;
        let rendered = template
            .render(context! { toolset => toolset })
            .with_context(|| format!("render {name}"))?;
        Ok(rendered)
    }
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
