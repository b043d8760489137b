//! Mentor matching over the static directory from `config.toml`.

use crate::config::MentorConfig;
use serde::Deserialize;
use std::cmp::Ordering;

/// Filters for [`match_mentors`]. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MentorQuery {
    /// Skill the mentor must list (case-insensitive substring)
    pub skill: Option<String>,
    /// Minimum years of experience
    pub min_years: Option<u32>,
    /// Maximum hourly rate in cents
    pub max_rate: Option<i64>,
    /// Teaching language (case-insensitive)
    pub language: Option<String>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl MentorQuery {
    fn matches(&self, mentor: &MentorConfig) -> bool {
        if let Some(skill) = self.skill.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let skill = skill.to_lowercase();
            if !mentor
                .expertise
                .iter()
                .any(|e| e.to_lowercase().contains(&skill))
            {
                return false;
            }
        }
        if self.min_years.is_some_and(|min| mentor.years_experience < min) {
            return false;
        }
        if self.max_rate.is_some_and(|max| mentor.hourly_rate > max) {
            return false;
        }
        if let Some(language) = self.language.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            if !mentor
                .languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(language))
            {
                return false;
            }
        }
        true
    }
}

/// Mentors matching `query`, best rated first, ties broken by name.
#[must_use]
pub fn match_mentors(mentors: &[MentorConfig], query: &MentorQuery) -> Vec<MentorConfig> {
    let mut matched: Vec<MentorConfig> = mentors
        .iter()
        .filter(|m| query.matches(m))
        .cloned()
        .collect();
    matched.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    if let Some(limit) = query.limit {
        matched.truncate(limit);
    }
    matched
}
