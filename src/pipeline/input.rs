//! Input resolution: list the slide files in a directory, in deck order.
//!
//! Deck order is a natural sort on file names, so `page2.html` comes before
//! `page10.html` whether or not the author zero-padded the numbers. Runs of
//! ASCII digits compare by numeric value, other characters compare
//! case-insensitively, and an exact byte comparison breaks any remaining tie
//! so the order is total.

use crate::error::DeckError;
use std::cmp::Ordering;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::Chars;
use tracing::{debug, info};

/// One slide file and its place in the deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideSource {
    /// 1-based position after sorting.
    pub ordinal: usize,
    /// File name, e.g. `page3.html`.
    pub name: String,
    /// Path to the file (the input directory joined with `name`).
    pub path: PathBuf,
}

/// List the slides in `dir`, sorted into deck order.
///
/// Only regular files directly inside `dir` whose name ends in
/// `.{extension}` (any case) are returned.
pub fn resolve_slides(dir: impl AsRef<Path>, extension: &str) -> Result<Vec<SlideSource>, DeckError> {
    let dir = dir.as_ref();

    if !dir.exists() {
        return Err(DeckError::MissingInputDirectory {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(DeckError::InputNotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let unreadable = |source| DeckError::InputUnreadable {
        path: dir.to_path_buf(),
        source,
    };
    let suffix = format!(".{}", extension.to_lowercase());

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            debug!("Skipping non-UTF-8 file name {:?}", entry.file_name());
            continue;
        };
        if !name.to_lowercase().ends_with(&suffix) {
            continue;
        }
        // Follows symlinks, so a link to a slide counts as a slide.
        if !entry.path().is_file() {
            debug!("Skipping {name}: not a regular file");
            continue;
        }
        names.push(name);
    }

    if names.is_empty() {
        return Err(DeckError::NoSlidesFound {
            path: dir.to_path_buf(),
            extension: extension.to_string(),
        });
    }

    names.sort_by(|a, b| natural_cmp(a, b));
    info!("Found {} slides in {}", names.len(), dir.display());

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(i, name)| SlideSource {
            ordinal: i + 1,
            path: dir.join(&name),
            name,
        })
        .collect())
}

/// Compare two file names in natural order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut x, mut y) = (a.chars().peekable(), b.chars().peekable());
    loop {
        let ordering = match (x.peek().copied(), y.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(p), Some(q)) if p.is_ascii_digit() && q.is_ascii_digit() => {
                compare_numbers(&take_digits(&mut x), &take_digits(&mut y))
            }
            (Some(p), Some(q)) => {
                x.next();
                y.next();
                p.to_lowercase().cmp(q.to_lowercase())
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

/// Compares two digit runs by value without parsing, so any length works.
fn compare_numbers(x: &str, y: &str) -> Ordering {
    let (x, y) = (x.trim_start_matches('0'), y.trim_start_matches('0'));
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}
