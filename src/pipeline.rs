use crate::component::{resolve_version, ComponentKind};
use crate::configure::{add_module_flags, library_flags, ConfigureScript};
use crate::driver;
use crate::error::{Error, Failure};
use crate::fetch::{ensure_archive, Download};
use crate::run::{run_hook, Console};
use crate::types::{BuildRequest, Source};
use crate::workspace::{absolute, change_dir, check_label, DirGuard, SourceTool, Workspace};
use std::path::PathBuf;
use tracing::{debug, info};

/// Lay out the workspace, returning it along with the version being built
/// (the revision, for checkouts).
fn layout(request: &BuildRequest, root: PathBuf) -> Result<(Workspace, String), Error> {
    let kind = request.kind.to_string();

    match &request.source {
        Source::Archive => {
            let version = resolve_version(&request.version, request.kind);
            let src_name = request.kind.spec().source_dir(&version);
            Ok((Workspace::new(root, &kind, &version, &src_name)?, version))
        }
        Source::Checkout { revision, .. } => {
            let label = revision.as_deref().unwrap_or("HEAD");
            Ok((Workspace::new(root, &kind, label, &kind)?, label.to_owned()))
        }
    }
}

/// Fetch and unpack the requested companion libraries into the current
/// directory, returning where each one ended up.
fn unpack_libraries<T, D>(
    request: &BuildRequest,
    ws: &Workspace,
    tools: &T,
    downloader: &D,
) -> Result<Vec<(ComponentKind, PathBuf)>, Failure>
where
    T: SourceTool + ?Sized,
    D: Download + ?Sized,
{
    let mut unpacked = Vec::with_capacity(request.libraries.len());

    for lib in &request.libraries {
        let version = resolve_version(&lib.version, lib.kind);
        check_label(&version)?;
        let spec = lib.kind.spec();

        let archive = ensure_archive(downloader, spec, &version, &ws.root)?;
        info!("Extracting {}", archive.display());
        tools.extract(&archive)?;

        unpacked.push((lib.kind, ws.build_dir.join(spec.source_dir(&version))));
    }

    Ok(unpacked)
}

/// Run one build attempt: prepare the workspace, get the source, configure,
/// and (unless only configuring) compile.
///
/// The caller's working directory is restored before this returns, whether
/// the build succeeded or not.
pub(crate) fn build<T, D>(
    request: &BuildRequest,
    tools: &T,
    downloader: &D,
) -> Result<Workspace, Failure>
where
    T: SourceTool + ?Sized,
    D: Download + ?Sized,
{
    let guard = DirGuard::save()?;
    let root = absolute(guard.path(), &request.workdir);

    let (ws, version) = layout(request, root)?;
    ws.prepare()?;
    change_dir(&ws.build_dir)?;

    match &request.source {
        Source::Archive => {
            let archive = ensure_archive(downloader, request.kind.spec(), &version, &ws.root)?;
            info!("Extracting {}", archive.display());
            tools.extract(&archive)?;
        }
        Source::Checkout {
            repository,
            revision,
        } => {
            info!("Cloning {repository}");
            tools.clone_repo(repository, &ws.src_dir)?;
            if let Some(revision) = revision {
                change_dir(&ws.src_dir)?;
                tools.checkout(revision)?;
                change_dir(&ws.build_dir)?;
            }
        }
    }

    let libraries = unpack_libraries(request, &ws, tools, downloader)?;

    if !ws.src_dir.is_dir() {
        return Err(Error::MissingSource(ws.src_dir.clone()).into());
    }
    change_dir(&ws.src_dir)?;

    let console = Console::from_verbose(request.verbose);
    if let Some(hook) = &request.pre_hook {
        run_hook(hook, console);
    }

    let script = ConfigureScript::new(
        request.source.configure_tool(),
        &request.configure_flags,
        &add_module_flags(&request.add_modules, &ws.root),
        &library_flags(&libraries),
    );
    script.write(&ws.src_dir)?;
    debug!(flags = %script.flags(), "wrote configure script");

    info!("Configuring {}...", request.kind);
    driver::configure(&ws.src_dir, request.verbose)?;

    if !request.configure_only {
        info!("Building {}...", request.kind);
        driver::compile(&ws.src_dir, &request.make, request.jobs, request.verbose)?;
    }

    if let Some(hook) = &request.post_hook {
        run_hook(hook, console);
    }

    drop(guard);
    Ok(ws)
}
