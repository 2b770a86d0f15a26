use crate::counts::CategoryCount;
use dashmap::DashMap;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;
use tracing::*;
use walkdir::WalkDir;

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Counts the non-hidden regular files in every category subfolder of a
/// course folder. A course folder that does not exist yet has no files.
pub fn count_local_files(course_folder: &Path) -> io::Result<CategoryCount> {
    if !course_folder.is_dir() {
        trace!("No local folder at {}", course_folder.display());
        return Ok(CategoryCount::new());
    }

    let map: DashMap<String, u64> = DashMap::new();

    WalkDir::new(course_folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .par_bridge()
        .try_for_each(|entry| {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_dir() {
                return Ok(());
            }
            let category = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&category) {
                return Ok(());
            }
            let count = count_files_in_folder(entry.path())?;
            map.insert(category, count);
            Ok::<_, io::Error>(())
        })?;

    Ok(map.into_iter().collect())
}

fn count_files_in_folder(folder: &Path) -> io::Result<u64> {
    let mut count = 0;
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name();
        if is_hidden(&name.to_string_lossy()) {
            continue;
        }
        // follows symlinks, a dangling one is not a file
        if fs::metadata(entry.path()).map(|m| m.is_file()).unwrap_or(false) {
            count += 1;
        }
    }
    Ok(count)
}
