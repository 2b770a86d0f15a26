use crate::error::{Result, SyncError};
use crate::model::Course;
use crate::remote::RemoteIndex;
use tracing::*;

/// Picks the year to sync: the requested one when available, else the latest.
pub fn select_year(available: &[i32], requested: Option<i32>) -> Result<i32> {
    match requested {
        Some(year) if available.contains(&year) => Ok(year),
        Some(year) => Err(SyncError::YearNotFound(year)),
        None => available.iter().copied().max().ok_or(SyncError::NoAcademicYear),
    }
}

/// Every course of the chosen academic year.
pub fn courses_for_year(remote: &dyn RemoteIndex, requested: Option<i32>) -> Result<(i32, Vec<Course>)> {
    let years = remote.academic_years()?;
    debug!("Academic years available: {:?}", years);
    let year = select_year(&years, requested)?;
    let courses = remote.list_courses(year)?;
    info!("Found {} courses in {}", courses.len(), year);
    Ok((year, courses))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_year_is_the_default() {
        assert_eq!(select_year(&[2021, 2023, 2022], None).unwrap(), 2023);
    }

    #[test]
    fn requested_year_must_exist() {
        assert_eq!(select_year(&[2021, 2022], Some(2021)).unwrap(), 2021);
        assert!(matches!(
            select_year(&[2021, 2022], Some(2019)),
            Err(SyncError::YearNotFound(2019))
        ));
    }

    #[test]
    fn no_years_is_an_error() {
        assert!(matches!(select_year(&[], None), Err(SyncError::NoAcademicYear)));
    }
}
