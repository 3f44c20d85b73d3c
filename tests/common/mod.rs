#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use seatboard::{
    BindingConfig, Dataset, LoadOptions, RowFilter, Selection, ViewRequest, session::Session,
};
use tempfile::{TempDir, tempdir};

pub const INSTITUTIONS: &str = "institutions.csv";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Loads a fixture with default options and bindings.
pub fn fixture_session(name: &str) -> Session {
    let dataset = Dataset::load(&fixture_path(name), &LoadOptions::default()).expect("load fixture");
    Session::new(dataset, &BindingConfig::default())
}

/// Request covering every district for `selection`.
pub fn all_districts_request(session: &Session, selection: Selection) -> ViewRequest {
    let columns = session.bindings.select(selection).expect("bindings resolve");
    ViewRequest::new(
        selection,
        RowFilter::all_districts(&session.dataset, &columns),
    )
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }
}
