use crate::component::ComponentKind;
use std::path::PathBuf;

/// Where the server source comes from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Source {
    /// A release tarball from the component's download site.
    #[default]
    Archive,

    /// A clone of a version-controlled tree, optionally switched to a
    /// specific revision.
    Checkout {
        repository: String,
        revision: Option<String>,
    },
}

impl Source {
    /// The native configure tool, relative to the source root. Release
    /// tarballs ship a generated `./configure`; repository trees keep it
    /// under `auto/`.
    pub(crate) fn configure_tool(&self) -> &'static str {
        match self {
            Self::Archive => "./configure",
            Self::Checkout { .. } => "./auto/configure",
        }
    }
}

/// A companion library to build statically into the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Library {
    pub(crate) kind: ComponentKind,
    /// may be empty, in which case the built-in default is used
    pub(crate) version: String,
}

/// Everything the user asked for. Built once from the command line and never
/// modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BuildRequest {
    pub(crate) kind: ComponentKind,
    pub(crate) version: String,
    pub(crate) source: Source,
    pub(crate) workdir: PathBuf,
    pub(crate) configure_flags: String,
    pub(crate) add_modules: String,
    pub(crate) libraries: Vec<Library>,
    pub(crate) jobs: u32,
    pub(crate) make: String,
    pub(crate) verbose: bool,
    pub(crate) configure_only: bool,
    pub(crate) pre_hook: Option<String>,
    pub(crate) post_hook: Option<String>,
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self {
            kind: ComponentKind::default(),
            version: String::new(),
            source: Source::default(),
            workdir: PathBuf::from("."),
            configure_flags: String::new(),
            add_modules: String::new(),
            libraries: vec![],
            jobs: 1,
            make: "make".to_owned(),
            verbose: false,
            configure_only: false,
            pre_hook: None,
            post_hook: None,
        }
    }
}
