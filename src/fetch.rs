use crate::component::ComponentSpec;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub(crate) trait Download {
    /// Fetch `url` and store it at `dest`.
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct HttpDownloader;

impl HttpDownloader {
    // large archives on slow links can take well past the default 30s
    fn client() -> reqwest::Result<Client> {
        Client::builder().timeout(None).build()
    }
}

impl Download for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!("Downloading {url}");

        let download_err = |source| Error::Download {
            url: url.to_owned(),
            source,
        };

        let bytes = Self::client()
            .and_then(|client| client.get(url).send())
            .and_then(|res| res.error_for_status())
            .and_then(|res| res.bytes())
            .map_err(download_err)?;

        // write next to the destination first so an interrupted transfer
        // never leaves a truncated archive that would be reused next time
        let partial = dest.with_extension("part");
        fs::write(&partial, &bytes).map_err(Error::io(format!("writing {}", partial.display())))?;
        fs::rename(&partial, dest).map_err(Error::io(format!("moving {}", dest.display())))?;

        Ok(())
    }
}

/// Make sure the release archive of `spec` at `version` is present in `dir`,
/// downloading it if needed, and return its path.
pub(crate) fn ensure_archive<D: Download + ?Sized>(
    downloader: &D,
    spec: &ComponentSpec,
    version: &str,
    dir: &Path,
) -> Result<PathBuf> {
    let archive = dir.join(spec.archive_name(version));

    if archive.is_file() {
        debug!(archive = %archive.display(), "using cached archive");
        return Ok(archive);
    }

    downloader.download(&spec.download_url(version), &archive)?;
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use std::cell::RefCell;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl Download for Recorder {
        fn download(&self, url: &str, dest: &Path) -> Result<()> {
            self.0.borrow_mut().push(url.to_owned());
            fs::write(dest, b"archive").map_err(Error::io("test"))
        }
    }

    #[test]
    fn downloads_missing_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let rec = Recorder::default();

        let path = ensure_archive(&rec, ComponentKind::Zlib.spec(), "1.3.1", tmp.path()).unwrap();

        assert_eq!(tmp.path().join("zlib-1.3.1.tar.gz"), path);
        assert!(path.is_file());
        assert_eq!(
            vec!["https://zlib.net/fossils/zlib-1.3.1.tar.gz".to_owned()],
            *rec.0.borrow()
        );
    }

    /// Serve `status` and `body` to a single request on a local port.
    fn serve_once(status: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }

            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body).unwrap();
        });

        format!("http://{addr}/nginx-1.2.3.tar.gz")
    }

    #[test]
    fn http_download_writes_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("nginx-1.2.3.tar.gz");
        let url = serve_once("200 OK", b"tarball bytes");

        HttpDownloader.download(&url, &dest).unwrap();

        assert_eq!(b"tarball bytes".to_vec(), fs::read(&dest).unwrap());
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn http_error_status_is_a_download_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("nginx-1.2.3.tar.gz");
        let url = serve_once("404 Not Found", b"");

        let err = HttpDownloader.download(&url, &dest).unwrap_err();

        assert!(matches!(err, Error::Download { .. }), "{err}");
        assert!(!dest.exists());
    }

    #[test]
    fn reuses_cached_archive() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("nginx-1.2.3.tar.gz"), b"cached").unwrap();
        let rec = Recorder::default();

        let path = ensure_archive(&rec, ComponentKind::Nginx.spec(), "1.2.3", tmp.path()).unwrap();

        assert_eq!(tmp.path().join("nginx-1.2.3.tar.gz"), path);
        assert!(rec.0.borrow().is_empty());
    }
}
