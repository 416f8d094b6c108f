//! Enrollment: learn known faces from a directory of reference images.
//!
//! One identity per file; the identity name is the file name up to the first
//! `.` (`alice.png` → `alice`). References the oracle cannot find a face in
//! are skipped with a warning.

use crate::identity::{Identity, IdentityRegistry};
use crate::matcher::KnownFace;
use crate::oracle::{FaceOracle, OracleError};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("cannot read known-people directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("oracle failed during enrollment: {0}")]
    Oracle(#[from] OracleError),
}

/// A reference image discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub path: PathBuf,
}

/// Why a reference did not make it into the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoFaceFound,
    OracleFault(String),
    DuplicateName,
}

/// Outcome of enrolling a directory.
#[derive(Debug, Default)]
pub struct Enrollment {
    /// Enrolled encodings, in reference order.
    pub gallery: Vec<KnownFace>,
    pub registry: IdentityRegistry,
    pub skipped: Vec<(Reference, SkipReason)>,
}

/// List reference images in `dir`, sorted by file name.
///
/// Hidden files and subdirectories are ignored.
pub fn discover_references(dir: &Path) -> Result<Vec<Reference>, EnrollError> {
    let entries = std::fs::read_dir(dir).map_err(|source| EnrollError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut refs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!(path = %path.display(), "skipping non-UTF-8 file name");
            continue;
        };
        if file_name.starts_with('.') {
            continue;
        }
        let name = file_name.split('.').next().unwrap_or(file_name).to_string();
        refs.push(Reference { name, path });
    }
    refs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(refs)
}

/// Encode every reference with `oracle` and build the gallery and registry.
///
/// The first encoding found in each reference is used. A transient oracle
/// fault on one reference skips that identity; a fatal one aborts.
pub fn enroll<O: FaceOracle + ?Sized>(
    references: &[Reference],
    oracle: &mut O,
    max_score: u32,
) -> Result<Enrollment, EnrollError> {
    let mut out = Enrollment::default();

    for reference in references {
        if out.registry.contains(&reference.name) {
            tracing::warn!(
                name = %reference.name,
                path = %reference.path.display(),
                "duplicate identity name; keeping the first reference"
            );
            out.skipped.push((reference.clone(), SkipReason::DuplicateName));
            continue;
        }

        let faces = match oracle.encode_image(&reference.path) {
            Ok(faces) => faces,
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    name = %reference.name,
                    path = %reference.path.display(),
                    error = %e,
                    "could not encode reference; skipping"
                );
                out.skipped
                    .push((reference.clone(), SkipReason::OracleFault(e.to_string())));
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let Some(first) = faces.into_iter().next() else {
            tracing::warn!(
                name = %reference.name,
                path = %reference.path.display(),
                "did not find a face in reference image"
            );
            out.skipped.push((reference.clone(), SkipReason::NoFaceFound));
            continue;
        };

        out.registry.add(Identity::new(&reference.name, max_score));
        out.gallery.push(KnownFace {
            name: reference.name.clone(),
            encoding: first.encoding,
        });
    }

    tracing::info!(
        enrolled = out.gallery.len(),
        skipped = out.skipped.len(),
        "enrollment complete"
    );
    Ok(out)
}
