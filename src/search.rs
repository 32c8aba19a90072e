use chrono::{DateTime, Datelike, Utc};

use crate::model::{Project, ProjectNumber, ProjectNumberError, MAX_COUNTRY_CODE, MAX_PROJECT_SEQ};

fn created_at(project: &Project) -> Option<DateTime<Utc>> {
    let stamps = project.time.as_ref()?;
    DateTime::parse_from_rfc3339(&stamps.created_at)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Case-insensitive substring match over the descriptive fields, newest first.
/// An empty query matches everything.
pub fn search_projects(projects: &[Project], query: &str) -> Vec<Project> {
    let needle = query.trim().to_lowercase();
    let mut hits: Vec<Project> = projects
        .iter()
        .filter(|project| {
            needle.is_empty()
                || [
                    project.name.as_str(),
                    project.name_short.as_str(),
                    project.number.id.as_str(),
                    project.city.as_str(),
                    project.area.as_str(),
                    project.country.as_str(),
                    project.folder.as_str(),
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();
    hits.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    hits
}

/// Two-digit year used in new project numbers.
pub fn current_project_year() -> u32 {
    Utc::now().year().rem_euclid(100).unsigned_abs()
}

/// Next free number for `country` in `year`: one past the highest sequence in use.
pub fn next_project_number(
    projects: &[Project],
    country: u32,
    year: u32,
) -> Result<ProjectNumber, ProjectNumberError> {
    if !(1..=MAX_COUNTRY_CODE).contains(&country) {
        return Err(ProjectNumberError::Country(country));
    }
    let highest = projects
        .iter()
        .map(|project| &project.number)
        .filter(|number| number.year == year && number.country == country)
        .map(|number| number.seq)
        .max()
        .unwrap_or(0);
    if highest >= MAX_PROJECT_SEQ {
        return Err(ProjectNumberError::Exhausted { year, country });
    }
    Ok(ProjectNumber::new(year, country, highest + 1))
}
