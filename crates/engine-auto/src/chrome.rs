//! Chromium executable discovery.

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::debug;

use crate::EngineAutoError;

/// Environment variables checked, in order, before any search.
pub const CHROME_ENV_VARS: &[&str] = &["CHROME", "CHROME_PATH"];

const BINARY_NAMES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
    "chrome",
    "headless_shell",
    "msedge",
];

#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(target_os = "windows")]
const INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const INSTALL_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/opt/google/chrome/chrome",
];

/// Finds a Chromium-family browser using the process environment.
///
/// Search order: [`CHROME_ENV_VARS`], then every directory on `PATH` for the
/// usual binary names, then fixed install locations for this OS.
pub fn discover_chrome() -> Result<PathBuf, EngineAutoError> {
    let overrides = CHROME_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .collect::<Vec<_>>();
    let install = INSTALL_PATHS.iter().map(PathBuf::from).collect::<Vec<_>>();
    discover_chrome_in(&overrides, std::env::var_os("PATH"), &install)
}

/// [`discover_chrome`] with every input supplied by the caller.
///
/// On failure the error lists each candidate that was checked.
pub fn discover_chrome_in(
    overrides: &[PathBuf],
    path_var: Option<OsString>,
    install_paths: &[PathBuf],
) -> Result<PathBuf, EngineAutoError> {
    let on_path = path_var
        .as_deref()
        .map(|paths| std::env::split_paths(paths).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .flat_map(|dir| {
            BINARY_NAMES
                .iter()
                .map(move |name| dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX)))
        });

    let mut searched = Vec::new();
    for candidate in overrides
        .iter()
        .cloned()
        .chain(on_path)
        .chain(install_paths.iter().cloned())
    {
        if candidate.is_file() {
            debug!("Found Chromium at {}", candidate.display());
            return Ok(candidate);
        }
        searched.push(candidate);
    }
    Err(EngineAutoError::ChromeNotFound { searched })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        path
    }

    #[test]
    fn override_wins_over_path() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = touch(dir.path(), "my-chrome");
        let on_path = touch(dir.path(), "chromium");
        let found = discover_chrome_in(
            &[explicit.clone()],
            Some(dir.path().as_os_str().to_owned()),
            &[],
        )
        .unwrap();
        assert_eq!(found, explicit);
        assert_ne!(found, on_path);
    }

    #[test]
    fn path_search_uses_known_names() {
        let dir = tempfile::tempdir().unwrap();
        let chromium = touch(dir.path(), "chromium-browser");
        let path_var = std::env::join_paths([dir.path()]).unwrap();
        let found = discover_chrome_in(&[], Some(path_var), &[]).unwrap();
        assert_eq!(found, chromium);
    }

    #[test]
    fn missing_override_falls_through_to_install_paths() {
        let dir = tempfile::tempdir().unwrap();
        let installed = touch(dir.path(), "Google Chrome");
        let found = discover_chrome_in(
            &[dir.path().join("does-not-exist")],
            None,
            &[installed.clone()],
        )
        .unwrap();
        assert_eq!(found, installed);
    }

    #[test]
    fn not_found_reports_every_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path_var = std::env::join_paths([dir.path()]).unwrap();
        let err = discover_chrome_in(
            &[dir.path().join("nope")],
            Some(path_var),
            &[dir.path().join("also-nope")],
        )
        .unwrap_err();
        match err {
            EngineAutoError::ChromeNotFound { searched } => {
                assert_eq!(searched.len(), 1 + BINARY_NAMES.len() + 1);
                assert_eq!(searched[0], dir.path().join("nope"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn directories_are_not_executables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("chromium")).unwrap();
        let path_var = std::env::join_paths([dir.path()]).unwrap();
        assert!(discover_chrome_in(&[], Some(path_var), &[]).is_err());
    }
}
