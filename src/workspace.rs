use crate::error::{Error, Result};
use crate::run::{run_with, Console};
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Holds the working directory captured before the pipeline changes
/// directory, and changes back to it when dropped.
#[derive(Debug)]
pub(crate) struct DirGuard {
    prev: PathBuf,
}

impl DirGuard {
    pub(crate) fn save() -> Result<Self> {
        let prev = env::current_dir().map_err(Error::io("reading current directory"))?;
        Ok(Self { prev })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.prev
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        // release step: failing to get back is not worth masking the real
        // outcome of the run, so the error is discarded
        let _ = env::set_current_dir(&self.prev);
    }
}

pub(crate) fn change_dir(path: &Path) -> Result<()> {
    debug!(dir = %path.display(), "changing directory");
    env::set_current_dir(path)
        .map_err(Error::io(format!("changing directory to {}", path.display())))
}

/// Resolve `path` against `base` without touching the filesystem. Interior
/// `.` components are dropped.
pub(crate) fn absolute(base: &Path, path: &Path) -> PathBuf {
    base.join(path).components().collect()
}

/// Remove the directory tree at `path`.
///
/// Recursive removal of very large trees (some third-party modules ship
/// thousands of files) is not guaranteed to finish in a single pass, so one
/// more attempt is made if the path survives the first.
pub(crate) fn clear_workspace(path: &Path) -> Result<()> {
    clear_workspace_with(path, |p| fs::remove_dir_all(p))
}

pub(crate) fn clear_workspace_with<F>(path: &Path, mut remove: F) -> Result<()>
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let first = remove(path);
    if !path.exists() {
        return Ok(());
    }

    if let Err(e) = &first {
        warn!("incomplete removal of {}: {e}, retrying", path.display());
    }

    let second = remove(path);
    if !path.exists() {
        return Ok(());
    }

    let source = second
        .err()
        .or(first.err())
        .unwrap_or_else(|| io::Error::other("directory still exists after removal"));

    Err(Error::ClearWorkspace {
        path: path.to_path_buf(),
        source,
    })
}

/// Make sure a user-supplied version or revision names exactly one directory
/// level, since the directory it names gets removed on every run.
pub(crate) fn check_label(label: &str) -> Result<()> {
    let mut components = Path::new(label).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !label.contains('/') => Ok(()),
        _ => Err(Error::InvalidVersion(label.to_owned())),
    }
}

/// The on-disk layout of one build attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Workspace {
    /// where archives are cached and relative module paths are resolved
    pub(crate) root: PathBuf,
    /// `<root>/<kind>/<version>`, recreated on every run
    pub(crate) build_dir: PathBuf,
    /// the unpacked or checked-out server source, inside `build_dir`
    pub(crate) src_dir: PathBuf,
}

impl Workspace {
    pub(crate) fn new(root: PathBuf, kind: &str, version: &str, src_name: &str) -> Result<Self> {
        check_label(version)?;
        let build_dir = root.join(kind).join(version);
        let src_dir = build_dir.join(src_name);
        Ok(Self {
            root,
            build_dir,
            src_dir,
        })
    }

    /// Give the build directory a clean slate.
    pub(crate) fn prepare(&self) -> Result<()> {
        if self.build_dir.exists() {
            debug!(dir = %self.build_dir.display(), "removing stale work directory");
            clear_workspace(&self.build_dir)?;
        }

        fs::create_dir_all(&self.build_dir).map_err(Error::io(format!(
            "creating work directory {}",
            self.build_dir.display()
        )))
    }
}

/// Ways of getting source code into the current directory.
pub(crate) trait SourceTool {
    /// Unpack `archive` into the current directory.
    fn extract(&self, archive: &Path) -> Result<()>;

    /// Clone `repository` into `dest`.
    fn clone_repo(&self, repository: &str, dest: &Path) -> Result<()>;

    /// Switch the tree in the current directory to `revision`.
    fn checkout(&self, revision: &str) -> Result<()>;
}

/// [SourceTool] backed by the system `tar` and `git`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SystemTools {
    console: Console,
}

impl SystemTools {
    pub(crate) fn new(verbose: bool) -> Self {
        Self {
            console: Console::from_verbose(verbose),
        }
    }
}

impl SourceTool for SystemTools {
    fn extract(&self, archive: &Path) -> Result<()> {
        let mut cmd = Command::new("tar");
        cmd.arg("zxf").arg(archive);
        run_with(&mut cmd, self.console)
    }

    fn clone_repo(&self, repository: &str, dest: &Path) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.arg("clone").arg(repository).arg(dest);
        run_with(&mut cmd, self.console)
    }

    fn checkout(&self, revision: &str) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.args(["checkout", revision]);
        run_with(&mut cmd, self.console)
    }
}
