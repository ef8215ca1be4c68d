use tracing::warn;

/// Buildable server distributions and the companion libraries that can be
/// linked into them.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum ComponentKind {
    #[default]
    Nginx,
    #[strum(serialize = "openresty")]
    OpenResty,
    Tengine,
    Pcre,
    #[strum(serialize = "openssl")]
    OpenSsl,
    Zlib,
}

pub(crate) struct ComponentSpec {
    pub(crate) kind: ComponentKind,
    pub(crate) version: &'static str,
    pub(crate) stem: &'static str,
    pub(crate) url_template: &'static str,
}

// indexed by `ComponentKind` discriminant
static COMPONENTS: [ComponentSpec; 6] = [
    ComponentSpec {
        kind: ComponentKind::Nginx,
        version: "1.26.2",
        stem: "nginx",
        url_template: "https://nginx.org/download/nginx-{version}.tar.gz",
    },
    ComponentSpec {
        kind: ComponentKind::OpenResty,
        version: "1.25.3.2",
        stem: "openresty",
        url_template: "https://openresty.org/download/openresty-{version}.tar.gz",
    },
    ComponentSpec {
        kind: ComponentKind::Tengine,
        version: "3.1.0",
        stem: "tengine",
        url_template: "https://tengine.taobao.org/download/tengine-{version}.tar.gz",
    },
    ComponentSpec {
        kind: ComponentKind::Pcre,
        version: "8.45",
        stem: "pcre",
        url_template:
            "https://downloads.sourceforge.net/project/pcre/pcre/{version}/pcre-{version}.tar.gz",
    },
    ComponentSpec {
        kind: ComponentKind::OpenSsl,
        version: "3.0.15",
        stem: "openssl",
        url_template: "https://www.openssl.org/source/openssl-{version}.tar.gz",
    },
    ComponentSpec {
        kind: ComponentKind::Zlib,
        version: "1.3.1",
        stem: "zlib",
        url_template: "https://zlib.net/fossils/zlib-{version}.tar.gz",
    },
];

impl ComponentKind {
    pub(crate) fn spec(self) -> &'static ComponentSpec {
        let spec = &COMPONENTS[self as usize];
        debug_assert_eq!(self, spec.kind);
        spec
    }

    pub(crate) fn default_version(self) -> &'static str {
        self.spec().version
    }

    /// The nginx configure option that points the build at the unpacked
    /// source of a companion library.
    pub(crate) fn configure_flag(self) -> Option<&'static str> {
        match self {
            Self::Pcre => Some("--with-pcre"),
            Self::OpenSsl => Some("--with-openssl"),
            Self::Zlib => Some("--with-zlib"),
            _ => None,
        }
    }
}

impl ComponentSpec {
    pub(crate) fn source_dir(&self, version: &str) -> String {
        format!("{}-{}", self.stem, version)
    }

    pub(crate) fn archive_name(&self, version: &str) -> String {
        format!("{}.tar.gz", self.source_dir(version))
    }

    pub(crate) fn download_url(&self, version: &str) -> String {
        self.url_template.replace("{version}", version)
    }
}

/// Pick the version to build: the requested one, or the built-in default
/// (with a warning) when none was given.
pub(crate) fn resolve_version(requested: &str, kind: ComponentKind) -> String {
    if requested.is_empty() {
        let default = kind.default_version();
        warn!("{kind} version is not set");
        warn!("nginx-build uses {kind} {default}");
        return default.to_owned();
    }

    requested.to_owned()
}
