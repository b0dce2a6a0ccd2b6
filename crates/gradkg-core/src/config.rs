//! Configuration and data directory management.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Shared college-wide bucket used for the software departments.
const SOFTWARE_COLLEGE: &str = "소프트웨어융합대학 공통";

/// Paths to all gradkg data files and directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Graph database directory (`data/graph/`).
    pub graph: PathBuf,
    /// Pipeline artifacts written by the batch commands (`data/output/`).
    pub output: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
    /// Optional department → college override (`data/departments.json`).
    pub departments_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            graph: root.join("graph"),
            output: root.join("output"),
            llm_config_file: root.join("llm-config.json"),
            departments_file: root.join("departments.json"),
            root,
        };
        std::fs::create_dir_all(&paths.graph)?;
        std::fs::create_dir_all(&paths.output)?;
        Ok(paths)
    }
}

/// Top-level gradkg configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradKgConfig {
    /// HTTP server port.
    pub port: u16,
    pub data_paths: DataPaths,
    /// Newest curriculum year in the passage index; always searched
    /// alongside the student's own year.
    pub latest_year: i32,
    /// Oldest admission year offered to students.
    pub min_year: i32,
    /// Passages fetched per filtered search.
    pub top_k: usize,
    /// Department → college. Passages filed under the college apply to
    /// every department in it.
    pub colleges: BTreeMap<String, String>,
}

impl GradKgConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let data_paths = DataPaths::new(data_dir)?;
        let colleges = load_colleges(&data_paths.departments_file);

        Ok(Self {
            port: env_or("PORT", 3003),
            latest_year: env_or("GRADKG_LATEST_YEAR", 2025),
            min_year: env_or("GRADKG_MIN_YEAR", 2020),
            top_k: env_or("GRADKG_TOP_K", 5),
            data_paths,
            colleges,
        })
    }

    /// Departments the service knows about, in stable order.
    pub fn departments(&self) -> Vec<String> {
        self.colleges.keys().cloned().collect()
    }

    pub fn college_of(&self, department: &str) -> Option<&str> {
        self.colleges.get(department).map(String::as_str)
    }

    /// Selectable admission years, newest first.
    pub fn year_options(&self) -> Vec<i32> {
        (self.min_year..=self.latest_year).rev().collect()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn default_colleges() -> BTreeMap<String, String> {
    ["컴퓨터공학과", "인공지능학과", "소프트웨어융합학과"]
        .into_iter()
        .map(|d| (d.to_string(), SOFTWARE_COLLEGE.to_string()))
        .collect()
}

/// Read the department map, falling back to the built-in one when the file
/// is absent or unreadable.
pub fn load_colleges(path: &Path) -> BTreeMap<String, String> {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return default_colleges();
    };
    match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
        Ok(map) if !map.is_empty() => map,
        Ok(_) => default_colleges(),
        Err(e) => {
            warn!("Ignoring {}: {}", path.display(), e);
            default_colleges()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path().join("data")).unwrap();
        assert!(paths.graph.is_dir());
        assert!(paths.output.is_dir());
        assert!(!paths.llm_config_file.exists());
    }

    #[test]
    fn test_colleges_default_and_override() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("departments.json");
        assert_eq!(load_colleges(&file).len(), 3);

        std::fs::write(&file, r#"{"전자공학과": "전자정보대학"}"#).unwrap();
        let map = load_colleges(&file);
        assert_eq!(map.len(), 1);
        assert_eq!(map["전자공학과"], "전자정보대학");

        std::fs::write(&file, "not json").unwrap();
        assert_eq!(load_colleges(&file), default_colleges());
    }

    #[test]
    fn test_year_options_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GradKgConfig::from_env(dir.path()).unwrap();
        config.min_year = 2022;
        config.latest_year = 2025;
        assert_eq!(config.year_options(), vec![2025, 2024, 2023, 2022]);
        assert_eq!(config.college_of("인공지능학과"), Some(SOFTWARE_COLLEGE));
    }
}
