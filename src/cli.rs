use crate::component::ComponentKind;
use crate::fetch::HttpDownloader;
use crate::pipeline;
use crate::report::{banner, report_fatal, report_success};
use crate::types::*;
use crate::workspace::SystemTools;
use clap::error::ErrorKind;
use clap::*;
use std::fs;
use std::io;
use std::path::PathBuf;

const LIBRARIES: [(ComponentKind, &str, &str); 3] = [
    (ComponentKind::Pcre, "pcre", "pcre-version"),
    (ComponentKind::OpenSsl, "openssl", "openssl-version"),
    (ComponentKind::Zlib, "zlib", "zlib-version"),
];

fn consume_arg_string(id: &str, m: &mut ArgMatches) -> Option<String> {
    m.remove_one::<String>(id)
}

fn consume_arg_strings(id: &str, m: &mut ArgMatches) -> impl Iterator<Item = String> {
    m.remove_many::<String>(id).unwrap_or_default()
}

fn consume_flag(id: &str, m: &mut ArgMatches) -> bool {
    m.remove_one::<bool>(id).unwrap_or_default()
}

fn default_jobs() -> u32 {
    std::thread::available_parallelism()
        .ok()
        .and_then(|n| u32::try_from(n.get()).ok())
        .unwrap_or(1)
}

fn cmd() -> Command {
    use builder::*;
    use ArgAction::*;

    let mut c = Command::new("nginx-build")
        .about("Build nginx, OpenResty, or Tengine from source.")
        .next_line_help(true)
        .group(ArgGroup::new("server"))
        .arg(
            Arg::new("version")
                .short('V')
                .long("version")
                .help("Print the nginx-build version and exit.")
                .action(SetTrue)
        )
        .arg(
            Arg::new("openresty")
                .long("openresty")
                .help("Build OpenResty instead of nginx.")
                .action(SetTrue)
                .group("server")
        )
        .arg(
            Arg::new("tengine")
                .long("tengine")
                .help("Build Tengine instead of nginx.")
                .action(SetTrue)
                .group("server")
        )
        .arg(
            Arg::new("server-version")
                .short('v')
                .long("server-version")
                .value_name("VERSION")
                .num_args(1)
                .help("Version of the server to build (defaults to a known-good release).")
        )
        .arg(
            Arg::new("repository")
                .long("repository")
                .value_name("URL")
                .num_args(1)
                .help("Build from a clone of this repository instead of a release archive.")
                .value_parser(NonEmptyStringValueParser::new())
        )
        .arg(
            Arg::new("revision")
                .long("revision")
                .value_name("REV")
                .num_args(1)
                .requires("repository")
                .help("Revision to check out after cloning.")
                .value_parser(NonEmptyStringValueParser::new())
        )
        .arg(
            Arg::new("workdir")
                .short('d')
                .long("workdir")
                .value_name("DIR")
                .num_args(1)
                .default_value(".")
                .help("Working directory for downloads and builds.")
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::DirPath)
        )
        .arg(
            Arg::new("configure")
                .short('c')
                .long("configure")
                .value_name("PATH")
                .num_args(1)
                .help("File containing options for the configure script.")
                .value_parser(NonEmptyStringValueParser::new())
                .value_hint(ValueHint::FilePath)
        )
        .arg(
            Arg::new("add-module")
                .long("add-module")
                .value_name("PATHS")
                .num_args(1)
                .action(Append)
                .help("Comma-separated paths of third-party modules to compile in (multiple instances are supported).")
                .value_parser(NonEmptyStringValueParser::new())
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("NUM")
                .num_args(1)
                .help("Number of parallel make jobs (defaults to the number of CPUs).")
                .value_parser(value_parser!(u32).range(1..))
        )
        .arg(
            Arg::new("make")
                .long("make")
                .value_name("PROG")
                .num_args(1)
                .default_value("make")
                .help("make program to build with.")
                .value_parser(NonEmptyStringValueParser::new())
                .value_hint(ValueHint::ExecutablePath)
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .action(SetTrue)
                .help("Show the output of configure and make instead of logging it to files.")
        )
        .arg(
            Arg::new("configure-only")
                .long("configure-only")
                .action(SetTrue)
                .help("Stop after running configure.")
        )
        .arg(
            Arg::new("pre-hook")
                .long("pre-hook")
                .value_name("CMD")
                .num_args(1)
                .allow_hyphen_values(true)
                .help("Command to run in the source directory before configure.")
        )
        .arg(
            Arg::new("post-hook")
                .long("post-hook")
                .value_name("CMD")
                .num_args(1)
                .allow_hyphen_values(true)
                .help("Command to run in the source directory after the build.")
        );

    for (kind, flag, version) in LIBRARIES {
        c = c
            .arg(
                Arg::new(flag)
                    .long(flag)
                    .action(SetTrue)
                    .help(format!("Build {kind} statically into the server.")),
            )
            .arg(
                Arg::new(version)
                    .long(version)
                    .value_name("VERSION")
                    .num_args(1)
                    .requires(flag)
                    .help(format!("Version of {kind} to build.")),
            );
    }

    c
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Version,
    Build(BuildRequest),
}

impl Action {
    pub(crate) fn verbose(&self) -> bool {
        match self {
            Action::Version => false,
            Action::Build(request) => request.verbose,
        }
    }

    pub(crate) fn run(self) -> i32 {
        println!("{}", banner());

        let Action::Build(request) = self else {
            return 0;
        };

        let tools = SystemTools::new(request.verbose);
        match pipeline::build(&request, &tools, &HttpDownloader) {
            Ok(ws) => {
                report_success(&request, &ws);
                0
            }
            Err(failure) => report_fatal(&failure, request.verbose, &mut io::stderr().lock()),
        }
    }
}

pub(crate) fn init(args: Vec<String>) -> Result<Action, clap::Error> {
    let mut c = cmd();
    let mut m = c.try_get_matches_from_mut(args)?;

    if consume_flag("version", &mut m) {
        return Ok(Action::Version);
    }

    let mut request = BuildRequest::default();

    request.kind = if consume_flag("openresty", &mut m) {
        ComponentKind::OpenResty
    } else if consume_flag("tengine", &mut m) {
        ComponentKind::Tengine
    } else {
        ComponentKind::Nginx
    };

    request.version = consume_arg_string("server-version", &mut m).unwrap_or_default();

    if let Some(repository) = consume_arg_string("repository", &mut m) {
        request.source = Source::Checkout {
            repository,
            revision: consume_arg_string("revision", &mut m),
        };
    }

    if let Some(workdir) = m.remove_one::<PathBuf>("workdir") {
        request.workdir = workdir;
    }

    if let Some(path) = consume_arg_string("configure", &mut m) {
        request.configure_flags = fs::read_to_string(&path).map_err(|e| {
            c.error(
                ErrorKind::Io,
                format!("could not read configure file {path}: {e}\n"),
            )
        })?;
    }

    request.add_modules = consume_arg_strings("add-module", &mut m)
        .collect::<Vec<_>>()
        .join(",");

    for (kind, flag, version) in LIBRARIES {
        if consume_flag(flag, &mut m) {
            request.libraries.push(Library {
                kind,
                version: consume_arg_string(version, &mut m).unwrap_or_default(),
            });
        }
    }

    request.jobs = m.remove_one::<u32>("jobs").unwrap_or_else(default_jobs);
    if let Some(make) = consume_arg_string("make", &mut m) {
        request.make = make;
    }

    request.verbose = consume_flag("verbose", &mut m);
    request.configure_only = consume_flag("configure-only", &mut m);
    request.pre_hook = consume_arg_string("pre-hook", &mut m);
    request.post_hook = consume_arg_string("post-hook", &mut m);

    Ok(Action::Build(request))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        std::iter::once("nginx-build")
            .chain(v.iter().copied())
            .map(str::to_owned)
            .collect()
    }

    fn request(v: &[&str]) -> BuildRequest {
        match init(args(v)) {
            Ok(Action::Build(request)) => request,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn verify_app() {
        cmd().debug_assert();
    }

    #[test]
    fn version_flag() {
        assert_eq!(Action::Version, init(args(&["-V"])).unwrap());
        assert_eq!(Action::Version, init(args(&["--version", "--tengine"])).unwrap());
    }

    #[test]
    fn defaults() {
        let req = request(&[]);
        assert_eq!(ComponentKind::Nginx, req.kind);
        assert_eq!("", req.version);
        assert_eq!(Source::Archive, req.source);
        assert_eq!(PathBuf::from("."), req.workdir);
        assert_eq!("", req.configure_flags);
        assert_eq!("", req.add_modules);
        assert!(req.libraries.is_empty());
        assert_eq!(default_jobs(), req.jobs);
        assert_eq!("make", req.make);
        assert!(!req.verbose);
        assert!(!req.configure_only);
        assert_eq!(None, req.pre_hook);
    }

    #[test]
    fn everything() {
        let tmp = tempfile::tempdir().unwrap();
        let conf = tmp.path().join("configure.txt");
        fs::write(&conf, "--with-http_ssl_module \\\n").unwrap();

        let req = request(&[
            "--openresty",
            "-v",
            "1.21.4.3",
            "-d",
            "/tmp/build",
            "-c",
            conf.to_str().unwrap(),
            "--add-module",
            "a,b",
            "--add-module",
            "/c",
            "-j",
            "3",
            "--make",
            "gmake",
            "--verbose",
            "--configure-only",
            "--pcre",
            "--pcre-version",
            "8.44",
            "--zlib",
            "--pre-hook",
            "./prepare.sh --fast",
            "--post-hook",
            "echo done",
        ]);

        assert_eq!(ComponentKind::OpenResty, req.kind);
        assert_eq!("1.21.4.3", req.version);
        assert_eq!(PathBuf::from("/tmp/build"), req.workdir);
        assert_eq!("--with-http_ssl_module \\\n", req.configure_flags);
        assert_eq!("a,b,/c", req.add_modules);
        assert_eq!(3, req.jobs);
        assert_eq!("gmake", req.make);
        assert!(req.verbose);
        assert!(req.configure_only);
        assert_eq!(
            vec![
                Library {
                    kind: ComponentKind::Pcre,
                    version: "8.44".into()
                },
                Library {
                    kind: ComponentKind::Zlib,
                    version: String::new()
                },
            ],
            req.libraries
        );
        assert_eq!(Some("./prepare.sh --fast".to_owned()), req.pre_hook);
        assert_eq!(Some("echo done".to_owned()), req.post_hook);
    }

    #[test]
    fn checkout_source() {
        let req = request(&[
            "--repository",
            "https://github.com/nginx/nginx",
            "--revision",
            "release-1.27.0",
        ]);
        assert_eq!(
            Source::Checkout {
                repository: "https://github.com/nginx/nginx".into(),
                revision: Some("release-1.27.0".into()),
            },
            req.source
        );
    }

    #[test]
    fn invalid_combinations() {
        let e = init(args(&["--openresty", "--tengine"])).unwrap_err();
        assert_eq!(ErrorKind::ArgumentConflict, e.kind());

        let e = init(args(&["--revision", "abc"])).unwrap_err();
        assert_eq!(ErrorKind::MissingRequiredArgument, e.kind());

        let e = init(args(&["--openssl-version", "3.0.0"])).unwrap_err();
        assert_eq!(ErrorKind::MissingRequiredArgument, e.kind());

        let e = init(args(&["-j", "0"])).unwrap_err();
        assert_eq!(ErrorKind::ValueValidation, e.kind());
    }

    #[test]
    fn missing_configure_file() {
        let e = init(args(&["-c", "/nonexistent/configure-options"])).unwrap_err();
        assert_eq!(ErrorKind::Io, e.kind());
    }
}
