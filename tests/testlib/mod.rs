#![allow(dead_code)]

pub use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

pub const NGINX_BUILD_PATH: &str = env!("CARGO_BIN_EXE_nginx-build");

pub fn cmd() -> Command {
    let mut cmd = Command::new(NGINX_BUILD_PATH);

    // stdout + stderr captured by default
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    cmd.env_clear();
    if let Some(path) = std::env::var_os("PATH") {
        cmd.env("PATH", path);
    }

    cmd
}

pub trait OutputExt {
    fn stdout_lines(&mut self) -> Vec<String>;
    fn stderr_lines(&mut self) -> Vec<String>;
    fn run(&mut self) -> Output;
}

impl OutputExt for Command {
    fn stdout_lines(&mut self) -> Vec<String> {
        lines(self.run().stdout)
    }

    fn stderr_lines(&mut self) -> Vec<String> {
        lines(self.run().stderr)
    }

    fn run(&mut self) -> Output {
        self.output().expect("run nginx-build")
    }
}

pub fn lines(bytes: Vec<u8>) -> Vec<String> {
    let data = String::from_utf8(bytes).expect("invalid utf8 bytes");
    data.split('\n')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_owned())
        .collect()
}

pub fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

pub fn tmpdir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("nginx_build_test_")
        .tempdir()
        .expect("create temporary directory")
}

pub fn executable<P: AsRef<Path>>(path: P, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = path.as_ref();
    fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
}

/// Write `<dir>/<name>.tar.gz` containing `<name>/configure` with the given
/// script body, the way a release tarball is laid out.
pub fn release_archive(dir: &Path, name: &str, configure: &str) -> PathBuf {
    let staging = dir.join("staging");
    let src = staging.join(name);
    fs::create_dir_all(&src).expect("create staging dir");
    executable(src.join("configure"), configure);

    let archive = dir.join(format!("{name}.tar.gz"));
    let status = Command::new("tar")
        .arg("czf")
        .arg(&archive)
        .arg("-C")
        .arg(&staging)
        .arg(name)
        .status()
        .expect("run tar");
    assert!(status.success(), "tar failed");

    fs::remove_dir_all(&staging).expect("remove staging dir");
    archive
}

/// A stand-in for `make` that produces an `objs/nginx` answering `-V`.
pub fn fake_make(dir: &Path) -> PathBuf {
    let make = dir.join("fake-make");
    executable(
        &make,
        r#"mkdir -p objs
printf '#!/bin/sh\necho "nginx version: nginx/test" >&2\necho "configure arguments: $(cat nginx-configure | tail -n 1)" >&2\n' > objs/nginx
chmod +x objs/nginx
echo "compiling with $*""#,
    );
    make
}

pub fn failing_make(dir: &Path) -> PathBuf {
    let make = dir.join("failing-make");
    executable(
        &make,
        "echo 'cc -c src/core/nginx.c'\necho 'error: foo' >&2\necho 'error: bar' >&2\nexit 2",
    );
    make
}
