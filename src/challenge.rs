//! Challenge input descriptor.
//!
//! A run is described by a JSON file listing the documents plus the persona
//! and the job to be done:
//!
//! ```json
//! {
//!   "documents": [{ "filename": "guide.pdf", "title": "Guide" }],
//!   "persona": { "role": "Travel Planner" },
//!   "job_to_be_done": { "task": "Plan a trip of 4 days for a group of 10 college friends." }
//! }
//! ```
//!
//! Unknown fields are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::Query;

/// A document entry of the challenge file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The persona on whose behalf sections are ranked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub role: String,
}

/// The task the persona wants to accomplish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobToBeDone {
    pub task: String,
}

/// Parsed challenge input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub documents: Vec<DocumentRef>,
    pub persona: Persona,
    pub job_to_be_done: JobToBeDone,
}

impl Challenge {
    /// Parse a challenge from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Challenge(e.to_string()))
    }

    /// Read and parse a challenge file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| Error::Challenge(format!("{}: {}", path.display(), e)))
    }

    /// Build the ranking query from persona and task.
    pub fn query(&self) -> Result<Query> {
        Query::new(&self.persona.role, &self.job_to_be_done.task)
    }

    /// Resolve document file names against `base_dir`, in listed order.
    pub fn document_paths(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.documents
            .iter()
            .map(|d| base_dir.join(&d.filename))
            .collect()
    }
}

/// First `*.json` file in `dir`, by file name.
pub fn find_challenge_file<P: AsRef<Path>>(dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        Error::Challenge(format!("no input JSON file found in '{}'", dir.display()))
    })
}
