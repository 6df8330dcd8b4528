use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

pub mod generic;
pub mod vendor;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("missing class count")]
    MissingClassCount,
    #[error("line {line}: invalid integer {token:?}")]
    InvalidInteger { line: usize, token: String },
    #[error("expected {expected} class parameters, found {found}")]
    MissingParameter { expected: usize, found: usize },
    #[error("configuration defines no traffic classes")]
    NoClasses,
    #[error("class {index}: quantum must be greater than zero")]
    ZeroQuantum { index: usize },
    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },
    #[error("required directive missing: {0}")]
    MissingDirective(&'static str),
}

/// Which scheduler the engine runs, and so how class parameters are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Parameters are priority levels.
    Spq,
    /// Parameters are DRR quanta in bytes.
    Drr,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Spq => f.write_str("spq"),
            Policy::Drr => f.write_str("drr"),
        }
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spq" => Ok(Policy::Spq),
            "drr" => Ok(Policy::Drr),
            other => Err(format!("unknown policy {other:?}, expected spq or drr")),
        }
    }
}

/// One scheduling parameter per class, in class order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassParams {
    params: Vec<u32>,
}

impl ClassParams {
    pub fn new(params: Vec<u32>) -> Self {
        Self { params }
    }

    pub fn count(&self) -> usize {
        self.params.len()
    }

    pub fn values(&self) -> &[u32] {
        &self.params
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
