use thiserror::Error;

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Folder name used for code assembled without a specific game version.
pub const FREE_DIR: &str = ".free";

#[derive(Error, Debug)]
pub enum IncludeError {
    #[error("expansion file not found: {0}.asm")]
    NotFound(String),

    #[error("failed to read expansion file: {0}")]
    Io(#[from] io::Error),
}

/// A source of precompiled files for `{name.asm}` lines. Files are already encoded gecko lines
/// produced by an external assembler, one set per game version.
pub trait Includes {
    /// Load the lines of `name` for `version`, where `*` is the version free build.
    fn load(&self, version: &str, name: &str) -> Result<Vec<String>, IncludeError>;
}

/// No includes available. Every inclusion is reported as missing.
pub struct NoIncludes;

impl Includes for NoIncludes {
    fn load(&self, _: &str, name: &str) -> Result<Vec<String>, IncludeError> {
        Err(IncludeError::NotFound(name.to_string()))
    }
}

/// Includes from a build folder laid out as `<root>/<version>/<name>.gecko`.
pub struct DirIncludes {
    root: PathBuf,
}

impl DirIncludes {
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }

    /// The folder holding the files of `version`.
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.root.join(if version == "*" { FREE_DIR } else { version })
    }
}

impl Includes for DirIncludes {
    fn load(&self, version: &str, name: &str) -> Result<Vec<String>, IncludeError> {
        let path = self.version_dir(version).join(format!("{name}.gecko"));
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text.lines().map(str::to_string).collect()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(IncludeError::NotFound(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Includes held in memory, keyed by version and name.
#[derive(Default)]
pub struct MemIncludes {
    files: HashMap<(String, String), Vec<String>>,
}

impl MemIncludes {
    pub fn insert(&mut self, version: &str, name: &str, text: &str) {
        let lines = text.lines().map(str::to_string).collect();
        self.files.insert((version.to_string(), name.to_string()), lines);
    }
}

impl Includes for MemIncludes {
    fn load(&self, version: &str, name: &str) -> Result<Vec<String>, IncludeError> {
        self.files
            .get(&(version.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| IncludeError::NotFound(name.to_string()))
    }
}
