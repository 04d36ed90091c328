//! JSON artefacts exchanged between pipeline stages.
//!
//! Every stage reads its inputs and writes its outputs as pretty-printed
//! JSON files. The similarity mapping doubles as a cache: a missing,
//! malformed or stale file is rebuilt rather than reported.

use std::io::{self, BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use wikialign_core::{ComparisonMode, SimilarityMapping};
use wikialign_fs::{create_utf8_file, file_is_file, open_utf8_file};

/// Failures reading or writing an artefact.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArtefactError {
    /// The artefact could not be opened.
    #[error("failed to open artefact {path}: {source}")]
    Open {
        /// Artefact path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The artefact is not valid JSON for the expected type.
    #[error("failed to parse artefact {path}: {source}")]
    Parse {
        /// Artefact path.
        path: Utf8PathBuf,
        /// Decoder error.
        source: serde_json::Error,
    },
    /// The artefact could not be created.
    #[error("failed to create artefact {path}: {source}")]
    Create {
        /// Artefact path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// Serialising or flushing the artefact failed.
    #[error("failed to write artefact {path}: {source}")]
    Write {
        /// Artefact path.
        path: Utf8PathBuf,
        /// Encoder error.
        source: serde_json::Error,
    },
}

/// Load a JSON artefact.
///
/// # Errors
/// Returns [`ArtefactError::Open`] or [`ArtefactError::Parse`].
pub fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, ArtefactError> {
    let file = open_utf8_file(path).map_err(|source| ArtefactError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ArtefactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `value` as pretty-printed JSON, creating parent directories.
///
/// # Errors
/// Returns [`ArtefactError::Create`] or [`ArtefactError::Write`].
///
/// # Examples
/// ```
/// use camino::Utf8PathBuf;
/// use wikialign_data::artefact::{read_json, write_json};
///
/// let dir = tempfile::tempdir()?;
/// let path = Utf8PathBuf::try_from(dir.path().join("out/ids.json"))?;
/// write_json(&path, &vec!["P17", "P1082"])?;
/// let ids: Vec<String> = read_json(&path)?;
/// assert_eq!(ids, ["P17", "P1082"]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn write_json<T: Serialize + ?Sized>(path: &Utf8Path, value: &T) -> Result<(), ArtefactError> {
    let file = create_utf8_file(path).map_err(|source| ArtefactError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let write_error = |source| ArtefactError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(write_error)?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|err| write_error(serde_json::Error::io(err)))?;
    log::debug!("wrote {path}");
    Ok(())
}

fn cached_similarity(path: &Utf8Path, mode: ComparisonMode) -> Option<SimilarityMapping> {
    match file_is_file(path) {
        Ok(true) => {}
        Ok(false) => {
            log::warn!("no similarity cache at {path}; recomputing");
            return None;
        }
        Err(err) => {
            log::warn!("cannot inspect similarity cache {path} ({err}); recomputing");
            return None;
        }
    }
    match read_json::<SimilarityMapping>(path) {
        Ok(mapping) if mapping.mode() == mode => Some(mapping),
        Ok(mapping) => {
            log::warn!(
                "similarity cache {path} holds {:?} distances, wanted {mode:?}; recomputing",
                mapping.mode()
            );
            None
        }
        Err(err) => {
            log::warn!("{err}; recomputing");
            None
        }
    }
}

/// Load the similarity mapping cached at `path`, or build and cache it.
///
/// The cache is used only when it parses and was computed in `mode`.
///
/// # Errors
/// Returns the error from `build`, or an [`ArtefactError`] converted into
/// `E` when the rebuilt mapping cannot be written.
pub fn load_or_build_similarity<E, F>(
    path: &Utf8Path,
    mode: ComparisonMode,
    build: F,
) -> Result<SimilarityMapping, E>
where
    F: FnOnce() -> Result<SimilarityMapping, E>,
    E: From<ArtefactError>,
{
    if let Some(mapping) = cached_similarity(path, mode) {
        log::info!("loaded {} similarity rows from {path}", mapping.len());
        return Ok(mapping);
    }
    let mapping = build()?;
    write_json(path, &mapping)?;
    Ok(mapping)
}
