use crate::configure::CONFIGURE_SCRIPT;
use crate::error::Failure;
use crate::run::{run, run_with, Console};
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::warn;

pub(crate) const CONFIGURE_LOG: &str = "nginx-configure.log";
pub(crate) const BUILD_LOG: &str = "nginx-build.log";

/// The two external steps of a build, run in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Phase {
    Configure,
    Compile,
}

impl Phase {
    pub(crate) fn log_name(self) -> &'static str {
        match self {
            Self::Configure => CONFIGURE_LOG,
            Self::Compile => BUILD_LOG,
        }
    }

    /// Route output for a non-verbose run: configure reports on stdout,
    /// while a compile's stdout is mostly compiler command lines and the
    /// diagnostics worth keeping are on stderr.
    fn capture(self, cmd: &mut Command, log: File) {
        match self {
            Self::Configure => {
                cmd.stdout(log).stderr(Stdio::inherit());
            }
            Self::Compile => {
                cmd.stdout(Stdio::null()).stderr(log);
            }
        }
    }
}

fn run_phase(phase: Phase, mut cmd: Command, dir: &Path, verbose: bool) -> Result<(), Failure> {
    cmd.current_dir(dir);

    if verbose {
        return run_with(&mut cmd, Console::Live).map_err(Failure::from);
    }

    let log = dir.join(phase.log_name());
    let file = match File::create(&log) {
        Ok(file) => file,
        Err(e) => {
            warn!(
                "failed to create {}: {e}, streaming {phase} output instead",
                log.display()
            );
            return run_with(&mut cmd, Console::Live).map_err(Failure::from);
        }
    };

    phase.capture(&mut cmd, file);
    let res = run(&mut cmd);

    // the command owns our handle to the log; close it before anyone reads
    drop(cmd);

    res.map_err(|e| Failure::with_log(e, &log))
}

/// Run the generated configure script in `dir`.
pub(crate) fn configure(dir: &Path, verbose: bool) -> Result<(), Failure> {
    let mut cmd = Command::new("sh");
    cmd.arg(format!("./{CONFIGURE_SCRIPT}"));
    run_phase(Phase::Configure, cmd, dir, verbose)
}

/// Run `make -j <jobs>` in `dir`.
pub(crate) fn compile(dir: &Path, make: &str, jobs: u32, verbose: bool) -> Result<(), Failure> {
    let mut cmd = Command::new(make);
    cmd.arg("-j").arg(jobs.to_string());
    run_phase(Phase::Compile, cmd, dir, verbose)
}
