use crate::component::ComponentKind;
use crate::error::{Error, Result};
use minijinja::{context, Environment};
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const CONFIGURE_SCRIPT: &str = "nginx-configure";

const TEMPLATE: &str = include_str!("nginx-configure.tpl");
const TEMPLATE_NAME: &str = "nginx-configure";

/// Trim the trailing newlines, spaces, and line-continuation backslashes off
/// a block of configure flags, then append a single space so more flags can
/// follow it.
///
/// The trims repeat until nothing changes, so `"--foo \\\n \\"` loses all of
/// its trailer and normalizing twice is the same as normalizing once.
pub(crate) fn normalize(raw: &str) -> String {
    let mut s = raw;
    loop {
        let trimmed = s
            .trim_end_matches(['\r', '\n'])
            .trim_end_matches(' ')
            .trim_end_matches('\\');

        if trimmed.len() == s.len() {
            break;
        }
        s = trimmed;
    }

    if s.is_empty() {
        String::new()
    } else {
        format!("{s} ")
    }
}

fn continued(flag: &str, value: &Path) -> String {
    format!("{flag}={} \\\n", value.display())
}

/// Turn a comma-separated list of module paths into `--add-module` flags,
/// one per line. Relative paths are resolved against `root`.
///
/// Whitespace around each path is trimmed and empty entries are dropped, so
/// `" a, ,b"` yields flags for `a` and `b` only.
pub(crate) fn add_module_flags(paths: &str, root: &Path) -> String {
    paths
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let path = Path::new(p);
            if path.is_absolute() {
                continued("--add-module", path)
            } else {
                continued("--add-module", &root.join(path))
            }
        })
        .collect()
}

/// `--with-<lib>=<dir>` flags for companion libraries built into the server.
pub(crate) fn library_flags(libs: &[(ComponentKind, PathBuf)]) -> String {
    libs.iter()
        .filter_map(|(kind, dir)| kind.configure_flag().map(|flag| continued(flag, dir)))
        .collect()
}

/// Everything needed to write the `nginx-configure` script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConfigureScript {
    tool: String,
    flags: String,
}

impl ConfigureScript {
    pub(crate) fn new(tool: &str, static_flags: &str, modules: &str, libraries: &str) -> Self {
        let mut flags = normalize(static_flags);
        flags.push_str(modules);
        flags.push_str(libraries);

        // the generated module lines end in a continuation
        let flags = normalize(&flags).trim_end().to_owned();

        Self {
            tool: tool.to_owned(),
            flags,
        }
    }

    pub(crate) fn flags(&self) -> &str {
        &self.flags
    }

    pub(crate) fn render(&self) -> Result<String> {
        let mut env = Environment::new();
        env.add_template(TEMPLATE_NAME, TEMPLATE)?;
        let template = env.get_template(TEMPLATE_NAME)?;

        let mut script = template.render(context! {
            configure => &self.tool,
            flags => &self.flags,
        })?;
        script.push('\n');

        Ok(script)
    }

    pub(crate) fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(CONFIGURE_SCRIPT);
        fs::write(&path, self.render()?)
            .map_err(Error::io(format!("writing {}", path.display())))?;
        Ok(path)
    }
}
