//! PDFium shared-library provisioning.
//!
//! Lookup order, first hit wins:
//!
//! 1. `PDFIUM_LIB_PATH`, when it names an existing file.
//! 2. `{cache}/pdfium-{PDFIUM_VERSION}/{lib}` from an earlier download.
//! 3. Download `{archive}` for this platform, unpack `{lib}` into the cache.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use tracing::{debug, info, warn};

use crate::EngineAutoError;

/// The pdfium-binaries release tag (`chromium/{PDFIUM_VERSION}`).
pub const PDFIUM_VERSION: &str = "7690";

const RELEASES_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Archive asset name, library path inside the archive, on-disk file name.
struct Asset {
    archive: &'static str,
    member: &'static str,
    file_name: &'static str,
}

const DYLIB: (&str, &str) = ("lib/libpdfium.dylib", "libpdfium.dylib");
const SO: (&str, &str) = ("lib/libpdfium.so", "libpdfium.so");
const DLL: (&str, &str) = ("bin/pdfium.dll", "pdfium.dll");

const ASSETS: &[(&str, &str, &str, (&str, &str))] = &[
    ("macos", "aarch64", "pdfium-mac-arm64.tgz", DYLIB),
    ("macos", "x86_64", "pdfium-mac-x64.tgz", DYLIB),
    ("linux", "x86_64", "pdfium-linux-x64.tgz", SO),
    ("linux", "aarch64", "pdfium-linux-arm64.tgz", SO),
    ("windows", "x86_64", "pdfium-win-x64.tgz", DLL),
    ("windows", "aarch64", "pdfium-win-arm64.tgz", DLL),
    ("windows", "x86", "pdfium-win-x86.tgz", DLL),
];

fn asset_for(os: &str, arch: &str) -> Result<Asset, EngineAutoError> {
    ASSETS
        .iter()
        .find(|(o, a, _, _)| *o == os && *a == arch)
        .map(|&(_, _, archive, (member, file_name))| Asset {
            archive,
            member,
            file_name,
        })
        .ok_or_else(|| EngineAutoError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

fn current_asset() -> Result<Asset, EngineAutoError> {
    asset_for(std::env::consts::OS, std::env::consts::ARCH)
}

/// Directory holding the downloaded library for [`PDFIUM_VERSION`].
///
/// Defaults to `{platform cache dir}/slides2pdf/pdfium-{VERSION}`;
/// `SLIDES2PDF_CACHE_DIR` replaces the `{platform cache dir}/slides2pdf` part.
pub fn pdfium_cache_dir() -> PathBuf {
    let versioned = format!("pdfium-{PDFIUM_VERSION}");
    if let Ok(root) = std::env::var("SLIDES2PDF_CACHE_DIR") {
        if !root.is_empty() {
            return PathBuf::from(root).join(versioned);
        }
    }
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("slides2pdf")
        .join(versioned)
}

fn env_override() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH")
        .map(PathBuf::from)
        .filter(|p| p.is_file())
}

/// The library path if it is available without a download.
pub fn cached_pdfium_path() -> Option<PathBuf> {
    env_override().or_else(|| {
        current_asset()
            .ok()
            .map(|asset| pdfium_cache_dir().join(asset.file_name))
            .filter(|p| p.is_file())
    })
}

/// `true` when [`ensure_pdfium_library`] would not touch the network.
pub fn is_pdfium_cached() -> bool {
    cached_pdfium_path().is_some()
}

static LIBRARY: OnceLock<PathBuf> = OnceLock::new();

/// Returns a usable libpdfium path, downloading it on first use.
///
/// `on_progress` is called with `(bytes_so_far, content_length)` while the
/// archive streams in. The resolved path is memoised for the process.
pub fn ensure_pdfium_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, EngineAutoError> {
    if let Some(path) = LIBRARY.get() {
        return Ok(path.clone());
    }
    let path = match cached_pdfium_path() {
        Some(path) => path,
        None => {
            if let Some(raw) = std::env::var_os("PDFIUM_LIB_PATH") {
                warn!(
                    "PDFIUM_LIB_PATH '{}' does not exist; falling back to download",
                    Path::new(&raw).display()
                );
            }
            download_into_cache(on_progress)?
        }
    };
    debug!("Using PDFium library at {}", path.display());
    Ok(LIBRARY.get_or_init(|| path).clone())
}

/// Resolves the library (see [`ensure_pdfium_library`]) and binds to it.
pub fn bind_pdfium(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Pdfium, EngineAutoError> {
    bind_pdfium_from_path(&ensure_pdfium_library(on_progress)?)
}

/// [`bind_pdfium`] without progress reporting.
pub fn bind_pdfium_silent() -> Result<Pdfium, EngineAutoError> {
    bind_pdfium(None)
}

/// Binds to the library at `path`, bypassing lookup and download.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, EngineAutoError> {
    let bindings = Pdfium::bind_to_library(path).map_err(|e| EngineAutoError::Bind {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(Pdfium::new(bindings))
}

fn download_into_cache(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, EngineAutoError> {
    let asset = current_asset()?;
    let dir = pdfium_cache_dir();
    std::fs::create_dir_all(&dir).map_err(EngineAutoError::CacheDir)?;

    let url = format!("{RELEASES_URL}/chromium%2F{PDFIUM_VERSION}/{}", asset.archive);
    info!("Downloading PDFium from {url}");
    let archive = fetch(&url, on_progress)?;

    let dest = dir.join(asset.file_name);
    unpack_member(&archive, asset.member, &dest)?;
    info!("PDFium cached at {}", dest.display());
    Ok(dest)
}

fn fetch(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, EngineAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("engine-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| EngineAutoError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| EngineAutoError::Download(format!("GET {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(EngineAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = [0u8; 64 * 1024];
    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EngineAutoError::Download(format!("read error: {e}"))),
        };
        body.extend_from_slice(&chunk[..n]);
        if let Some(report) = on_progress {
            report(body.len() as u64, total);
        }
    }
    Ok(body)
}

/// Unpacks the single archive entry named `member` from a `.tgz` into `dest`.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), EngineAutoError> {
    let extract = |e: std::io::Error| EngineAutoError::Extract(e.to_string());
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));

    for entry in tar.entries().map_err(extract)? {
        let mut entry = entry.map_err(extract)?;
        let is_member = entry.path().map_err(extract)?.to_string_lossy() == member;
        if is_member {
            entry.unpack(dest).map_err(extract)?;
            return Ok(());
        }
    }
    Err(EngineAutoError::Extract(format!(
        "'{member}' not present in archive"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_platform_has_an_asset() {
        let asset = current_asset().expect("current platform should be supported");
        assert!(asset.archive.ends_with(".tgz"));
        assert!(asset.member.ends_with(asset.file_name));
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let err = asset_for("plan9", "mips").err().expect("should be unsupported");
        assert!(err.to_string().contains("plan9/mips"));
    }

    #[test]
    fn cache_dir_is_versioned() {
        let dir = pdfium_cache_dir();
        assert_eq!(dir, pdfium_cache_dir());
        assert!(dir.to_string_lossy().contains(PDFIUM_VERSION));
    }

    #[test]
    fn unpack_finds_named_member() {
        let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
            Vec::new(),
            flate2::Compression::fast(),
        ));
        for (name, body) in [("include/fpdfview.h", &b"header"[..]), ("lib/libpdfium.so", &b"ELF"[..])] {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, body).unwrap();
        }
        let archive = builder.into_inner().unwrap().finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libpdfium.so");
        unpack_member(&archive, "lib/libpdfium.so", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"ELF");

        let missing = unpack_member(&archive, "bin/pdfium.dll", &dir.path().join("x"));
        assert!(matches!(missing, Err(EngineAutoError::Extract(_))));
    }

    #[test]
    fn unpack_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let result = unpack_member(b"not a tarball", "lib/libpdfium.so", &dir.path().join("out"));
        assert!(matches!(result, Err(EngineAutoError::Extract(_))));
    }
}
