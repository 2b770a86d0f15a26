use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use crate::error::{Result, SyncError};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

lazy_static::lazy_static! {
    // Known remote ids for the standard document categories
    static ref CATEGORY_IDS: HashMap<&'static str, &'static str> = {
        let mut ids = HashMap::new();
        ids.insert("Material Multimédia", "0ac");
        ids.insert("Problemas", "1e");
        ids.insert("Protocolos", "2tr");
        ids.insert("Seminários", "3sm");
        ids.insert("Exames", "ex");
        ids.insert("Testes", "t");
        ids.insert("Textos de Apoio", "ta");
        ids.insert("Outros", "xot");
        ids
    };
}

/// Remote id for a category name. Names outside the known table are their own id.
pub fn known_category_id(category: &str) -> String {
    CATEGORY_IDS
        .get(category)
        .map(|id| id.to_string())
        .unwrap_or_else(|| category.to_string())
}

/// Accepts `name` only if it is a single plain path component, so joining it
/// onto a folder can never leave that folder.
pub fn safe_component(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None)
            if part == name && !name.contains(['/', '\\']) =>
        {
            Ok(name)
        }
        _ => Err(SyncError::UnsafeName(name.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemesterKind {
    Semester,
    Trimester,
}

impl SemesterKind {
    pub fn suffix(self) -> char {
        match self {
            SemesterKind::Semester => 'S',
            SemesterKind::Trimester => 'T',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Course {
    pub id: u32,
    pub year: i32,
    pub semester: u8,
    pub kind: SemesterKind,
    pub name: String,
}

impl Course {
    /// Local folder for this course: `<root>/<year>/<semester><S|T>/<name>`.
    pub fn folder(&self, root: &Path) -> PathBuf {
        root.join(self.year.to_string())
            .join(format!("{}{}", self.semester, self.kind.suffix()))
            .join(&self.name)
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub link: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub category: String,
}

impl FileDescriptor {
    pub fn modified_system_time(&self) -> SystemTime {
        SystemTime::from(self.modified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub destination: PathBuf,
    pub link: String,
    pub expected_size: u64,
    pub modified: DateTime<Utc>,
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}' -> '{}'", self.link, self.destination.display())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTask {
    pub category: String,
    pub category_id: String,
    pub course: Course,
    pub folder: PathBuf,
}

impl fmt::Display for SyncTask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} > {}", self.course, self.category)
    }
}
