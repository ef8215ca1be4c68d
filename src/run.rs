use crate::error::{Error, Result};
use crate::util::{describe, split_shell_args};
use nix::sys::signal::Signal;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, warn};

/// Where the output of a child process goes when it isn't sent to a log
/// file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Console {
    Live,
    Quiet,
}

impl Console {
    pub(crate) fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Self::Live
        } else {
            Self::Quiet
        }
    }

    pub(crate) fn stdio(self) -> Stdio {
        match self {
            Self::Live => Stdio::inherit(),
            Self::Quiet => Stdio::null(),
        }
    }
}

fn program(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

/// Run `cmd` to completion. Exit code 0 is success; anything else (including
/// a failure to spawn) is an error.
pub(crate) fn run(cmd: &mut Command) -> Result<()> {
    debug!(command = %describe(cmd), "running");

    let status = cmd.status().map_err(|source| Error::Spawn {
        prog: program(cmd),
        source,
    })?;

    check_status(&program(cmd), status)
}

/// Run `cmd` with stdout/stderr routed according to `console`.
pub(crate) fn run_with(cmd: &mut Command, console: Console) -> Result<()> {
    cmd.stdout(console.stdio()).stderr(console.stdio());
    run(cmd)
}

/// Run a user-supplied hook command. Hooks are fire-and-forget: problems are
/// logged and the build carries on. Returns whether the hook succeeded.
pub(crate) fn run_hook(hook: &str, console: Console) -> bool {
    let Some(mut args) = split_shell_args(hook).filter(|args| !args.is_empty()) else {
        warn!("ignoring hook that could not be parsed: {hook:?}");
        return false;
    };

    let mut cmd = Command::new(args.remove(0));
    cmd.args(args);

    match run_with(&mut cmd, console) {
        Ok(()) => true,
        Err(e) => {
            warn!("hook failed: {e}");
            false
        }
    }
}

fn check_status(prog: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    let signal = status
        .signal()
        .or(status.stopped_signal())
        .and_then(|sig| Signal::try_from(sig).ok());

    match (status.code(), signal) {
        (_, Some(signal)) => Err(Error::Signaled {
            prog: prog.to_owned(),
            signal,
        }),
        (Some(code), None) => Err(Error::Exit {
            prog: prog.to_owned(),
            code,
        }),
        (None, None) => Err(Error::Exit {
            prog: prog.to_owned(),
            code: -1,
        }),
    }
}
