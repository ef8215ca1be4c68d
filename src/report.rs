use crate::component::ComponentKind;
use crate::error::{Failure, Result};
use crate::run::run;
use crate::types::BuildRequest;
use crate::workspace::Workspace;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{error, info};

pub(crate) fn banner() -> String {
    format!(
        "nginx-build: {}\nCompiler: {}",
        env!("CARGO_PKG_VERSION"),
        env!("NGINX_BUILD_RUSTC_VERSION")
    )
}

/// Copy a captured log to `out` line by line, bytes unchanged.
pub(crate) fn replay_log<R: BufRead, W: Write>(log: R, out: &mut W) -> io::Result<()> {
    for line in log.split(b'\n') {
        out.write_all(&line?)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Surface a fatal error and return the exit code for the process.
///
/// In verbose mode the child output was already on the console. Otherwise
/// the log of the failed phase is copied to `out` first, so the actual tool
/// diagnostics are the last thing the user sees before the error itself.
pub(crate) fn report_fatal<W: Write>(failure: &Failure, verbose: bool, out: &mut W) -> i32 {
    if !verbose {
        if let Some(log) = &failure.log {
            match File::open(log) {
                Ok(file) => {
                    if let Err(e) = replay_log(BufReader::new(file), out) {
                        error!("error-log: failed to replay {}: {e}", log.display());
                    }
                }
                Err(e) => error!("error-log: {} is not found ({e})", log.display()),
            }
        }
    }

    error!("{}", failure.error);
    failure.error.exit_code()
}

/// Show the options compiled into a freshly built nginx.
pub(crate) fn print_configure_options(src_dir: &Path) -> Result<()> {
    let mut cmd = Command::new(src_dir.join("objs").join("nginx"));
    cmd.arg("-V")
        .current_dir(src_dir)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    run(&mut cmd)
}

pub(crate) fn next_steps(kind: ComponentKind, src_dir: &Path, configure_only: bool) -> String {
    let make = if configure_only { "\n   $ make" } else { "" };
    format!(
        "Enter the following command for install {kind}.\n\n   $ cd {}{make}\n   $ sudo make install\n",
        src_dir.display()
    )
}

pub(crate) fn report_success(request: &BuildRequest, ws: &Workspace) {
    info!("Complete building {}!", request.kind);

    // OpenResty keeps its nginx objs inside the bundle's build tree
    if request.kind != ComponentKind::OpenResty && !request.configure_only {
        println!();
        if let Err(e) = print_configure_options(&ws.src_dir) {
            println!("{e}");
        }
    }
    println!();

    print!(
        "{}",
        next_steps(request.kind, &ws.src_dir, request.configure_only)
    );
}
