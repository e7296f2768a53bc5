//! Numbered run directories.
//!
//! Runs live at `<output_root>/<mode>/generated_NNNNNN`. Numbers start at 1,
//! are never reused and a partially written run is left in place.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use pallet_annot_core::ConfigError;

use crate::ExportError;

/// Prefix of every run directory name.
pub const RUN_PREFIX: &str = "generated_";

/// Upper bound on create attempts when racing other processes for a number.
const MAX_ATTEMPTS: usize = 64;

/// Subdirectories of a run, relative to the run directory.
pub const RUN_SUBDIRS: [&str; 10] = [
    "images",
    "analysis",
    "keypoints_labels",
    "face_2d_boxes",
    "face_3d_coordinates",
    "debug_3d/coordinates",
    "debug_3d/figures",
    "debug_3d/images",
    "annotations/coco",
    "annotations/voc",
];

/// Paths of one allocated run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub root: PathBuf,
    /// Run number, the `NNNNNN` of the directory name.
    pub number: u32,
}

impl RunLayout {
    /// Directory name, e.g. `generated_000001`.
    pub fn name(&self) -> String {
        run_name(self.number)
    }

    /// Absolute path of a run-relative path.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Create every standard subdirectory.
    pub fn create_subdirs(&self) -> Result<(), ExportError> {
        for sub in RUN_SUBDIRS {
            let dir = self.root.join(sub);
            fs::create_dir_all(&dir).map_err(|e| ExportError::io(&dir, e))?;
        }
        Ok(())
    }
}

/// `generated_NNNNNN` for a run number.
pub fn run_name(number: u32) -> String {
    format!("{RUN_PREFIX}{number:06}")
}

/// Parse the run number out of a directory name.
pub fn parse_run_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(RUN_PREFIX)?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Allocate the next free run directory under `output_root/mode`.
///
/// Picks the smallest unused number, starting at 1, and creates the
/// directory atomically. If another process claims the same number first,
/// the next free one is tried.
///
/// # Errors
///
/// [`ConfigError::Unwritable`] when `output_root/mode` cannot be created or
/// listed.
pub fn allocate_run(mode: &str, output_root: &Path) -> Result<RunLayout, ExportError> {
    validate_mode(mode)?;
    let base = output_root.join(mode);
    fs::create_dir_all(&base).map_err(|e| unwritable(output_root, &e))?;

    for _ in 0..MAX_ATTEMPTS {
        let number = next_free_number(&base).map_err(|e| unwritable(output_root, &e))?;
        let root = base.join(run_name(number));
        match fs::create_dir(&root) {
            Ok(()) => {
                info!("allocated run {}", root.display());
                return Ok(RunLayout { root, number });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{} was claimed concurrently, retrying", root.display());
            }
            Err(e) => return Err(unwritable(output_root, &e).into()),
        }
    }
    Err(ConfigError::Unwritable {
        path: output_root.display().to_string(),
        reason: format!("no free run number after {MAX_ATTEMPTS} attempts"),
    }
    .into())
}

fn next_free_number(base: &Path) -> io::Result<u32> {
    let mut used = Vec::new();
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        if let Some(n) = entry.file_name().to_str().and_then(parse_run_name) {
            used.push(n);
        }
    }
    used.sort_unstable();
    let mut candidate = 1;
    for n in used {
        if n == candidate {
            candidate += 1;
        } else if n > candidate {
            break;
        }
    }
    Ok(candidate)
}

fn validate_mode(mode: &str) -> Result<(), ConfigError> {
    let ok = !mode.is_empty()
        && mode
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: "mode",
            reason: format!("`{mode}` must be a non-empty [A-Za-z0-9_-] name"),
        })
    }
}

fn unwritable(root: &Path, err: &io::Error) -> ConfigError {
    ConfigError::Unwritable {
        path: root.display().to_string(),
        reason: err.to_string(),
    }
}
