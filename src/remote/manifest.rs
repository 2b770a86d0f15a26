use super::RemoteIndex;
use crate::counts::CategoryCount;
use crate::error::{Result, SyncError};
use crate::model::{known_category_id, Course, FileDescriptor, SemesterKind};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::time::Duration;
use tracing::*;

#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    /// Prefix for links given as absolute paths (`/download?id=1`).
    #[serde(default)]
    base_url: Option<String>,
    courses: Vec<ManifestCourse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestCourse {
    id: u32,
    year: i32,
    semester: u8,
    #[serde(default = "default_kind")]
    kind: SemesterKind,
    name: String,
    #[serde(default)]
    categories: Vec<ManifestCategory>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestCategory {
    name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    files: Vec<ManifestFile>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestFile {
    name: String,
    link: String,
    #[serde(default)]
    size: u64,
    modified: DateTime<Utc>,
}

fn default_kind() -> SemesterKind {
    SemesterKind::Semester
}

impl ManifestCourse {
    fn to_course(&self) -> Course {
        Course {
            id: self.id,
            year: self.year,
            semester: self.semester,
            kind: self.kind,
            name: self.name.clone(),
        }
    }

    fn matches(&self, course: &Course) -> bool {
        self.id == course.id
            && self.year == course.year
            && self.semester == course.semester
            && self.kind == course.kind
    }
}

impl ManifestCategory {
    fn remote_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| known_category_id(&self.name))
    }
}

/// Remote index described by a JSON manifest, read once from a file or URL.
#[derive(Debug, Clone)]
pub struct ManifestRemote {
    manifest: Manifest,
}

impl ManifestRemote {
    pub fn load(source: &str, timeout: Duration) -> Result<Self> {
        let contents = if source.starts_with("http://") || source.starts_with("https://") {
            debug!("Fetching manifest from {}", source);
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()?;
            let response = client.get(source).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(SyncError::HttpStatus {
                    status: status.as_u16(),
                    url: source.to_string(),
                });
            }
            response.text()?
        } else {
            debug!("Reading manifest from {}", source);
            fs::read_to_string(source)?
        };
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(contents).map_err(|e| SyncError::Manifest(e.to_string()))?;
        Ok(Self { manifest })
    }

    fn course_entry(&self, course: &Course) -> Result<&ManifestCourse> {
        self.manifest
            .courses
            .iter()
            .find(|c| c.matches(course))
            .ok_or_else(|| {
                SyncError::RemoteUnavailable(format!("no index for course {} ({})", course.name, course.id))
            })
    }

    fn absolute_link(&self, link: &str) -> String {
        match &self.manifest.base_url {
            Some(base) if link.starts_with('/') => format!("{}{}", base.trim_end_matches('/'), link),
            _ => link.to_string(),
        }
    }
}

impl RemoteIndex for ManifestRemote {
    fn academic_years(&self) -> Result<Vec<i32>> {
        let years: BTreeSet<i32> = self.manifest.courses.iter().map(|c| c.year).collect();
        Ok(years.into_iter().collect())
    }

    fn list_courses(&self, year: i32) -> Result<Vec<Course>> {
        Ok(self
            .manifest
            .courses
            .iter()
            .filter(|c| c.year == year)
            .map(ManifestCourse::to_course)
            .collect())
    }

    fn fetch_category_counts(&self, course: &Course) -> Result<CategoryCount> {
        let entry = self.course_entry(course)?;
        Ok(entry
            .categories
            .iter()
            .map(|c| (c.name.clone(), c.files.len() as u64))
            .collect())
    }

    fn fetch_file_list(&self, course: &Course, category_id: &str) -> Result<Vec<FileDescriptor>> {
        let entry = self.course_entry(course)?;
        let category = entry
            .categories
            .iter()
            .find(|c| c.remote_id() == category_id)
            .ok_or_else(|| {
                SyncError::RemoteUnavailable(format!(
                    "no category '{}' in course {}",
                    category_id, course.name
                ))
            })?;

        Ok(category
            .files
            .iter()
            .map(|f| FileDescriptor {
                name: f.name.clone(),
                link: self.absolute_link(&f.link),
                size: f.size,
                modified: f.modified,
                category: category.name.clone(),
            })
            .collect())
    }

    fn category_id(&self, course: &Course, category: &str) -> String {
        // ids are per course, the same name can map to different ids
        self.course_entry(course)
            .ok()
            .and_then(|entry| entry.categories.iter().find(|c| c.name == category))
            .map(ManifestCategory::remote_id)
            .unwrap_or_else(|| known_category_id(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "base_url": "https://clip.example.org/",
        "courses": [
            {
                "id": 101, "year": 2024, "semester": 1, "name": "Algebra",
                "categories": [
                    { "name": "Exames", "files": [
                        { "name": "2023.pdf", "link": "/doc?id=1", "size": 10, "modified": "2024-01-10T09:00:00Z" }
                    ] },
                    { "name": "Slides", "id": "sl", "files": [
                        { "name": "a.pdf", "link": "https://cdn.example.org/a.pdf", "modified": "2024-02-01T10:00:00Z" },
                        { "name": "b.pdf", "link": "https://cdn.example.org/b.pdf", "modified": "2024-02-08T10:00:00Z" }
                    ] },
                    { "name": "Outros", "files": [] }
                ]
            },
            { "id": 202, "year": 2023, "semester": 2, "kind": "trimester", "name": "Physics" }
        ]
    }"#;

    fn remote() -> ManifestRemote {
        ManifestRemote::from_json(MANIFEST).unwrap()
    }

    #[test]
    fn years_and_courses() {
        let remote = remote();
        assert_eq!(remote.academic_years().unwrap(), vec![2023, 2024]);
        let courses = remote.list_courses(2023).unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].kind, SemesterKind::Trimester);
    }

    #[test]
    fn counts_skip_empty_categories() {
        let remote = remote();
        let course = remote.find_course(101, 2024, 1, SemesterKind::Semester).unwrap();
        let counts = remote.fetch_category_counts(&course).unwrap();
        assert_eq!(counts, CategoryCount::new().with("Exames", 1).with("Slides", 2));
    }

    #[test]
    fn file_list_by_category_id() {
        let remote = remote();
        let course = remote.find_course(101, 2024, 1, SemesterKind::Semester).unwrap();

        assert_eq!(remote.category_id(&course, "Exames"), "ex");
        assert_eq!(remote.category_id(&course, "Slides"), "sl");

        let exams = remote.fetch_file_list(&course, "ex").unwrap();
        assert_eq!(exams[0].link, "https://clip.example.org/doc?id=1");
        assert_eq!(exams[0].category, "Exames");

        let slides = remote.fetch_file_list(&course, "sl").unwrap();
        assert_eq!(slides.len(), 2);
    }

    #[test]
    fn category_ids_are_scoped_to_the_course() {
        let remote = ManifestRemote::from_json(
            r#"{
            "courses": [
                { "id": 1, "year": 2024, "semester": 1, "name": "A", "categories": [
                    { "name": "Slides", "id": "a1", "files": [
                        { "name": "a.pdf", "link": "https://x/a.pdf", "modified": "2024-02-01T10:00:00Z" }
                    ] }
                ] },
                { "id": 2, "year": 2024, "semester": 1, "name": "B", "categories": [
                    { "name": "Slides", "id": "b1", "files": [
                        { "name": "b.pdf", "link": "https://x/b.pdf", "modified": "2024-02-01T10:00:00Z" }
                    ] }
                ] }
            ]
        }"#,
        )
        .unwrap();
        let a = remote.find_course(1, 2024, 1, SemesterKind::Semester).unwrap();
        let b = remote.find_course(2, 2024, 1, SemesterKind::Semester).unwrap();

        assert_eq!(remote.category_id(&a, "Slides"), "a1");
        assert_eq!(remote.category_id(&b, "Slides"), "b1");

        let files = remote.fetch_file_list(&b, &remote.category_id(&b, "Slides")).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "b.pdf");
    }

    #[test]
    fn unknown_course_is_unavailable() {
        let remote = remote();
        let course = Course {
            id: 999,
            year: 2024,
            semester: 1,
            kind: SemesterKind::Semester,
            name: "Ghost".to_string(),
        };
        assert!(matches!(
            remote.fetch_category_counts(&course),
            Err(SyncError::RemoteUnavailable(_))
        ));
        assert!(matches!(
            remote.find_course(999, 2024, 1, SemesterKind::Semester),
            Err(SyncError::CourseNotFound { .. })
        ));
    }
}
