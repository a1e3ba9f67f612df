use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub size: Option<i64>,
    pub description: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub company_id: i64,
    pub company_name: Option<String>, // denormalized for display
    pub title: String,
    pub location: String,
    pub experience_level: String,
    pub education: String,
    pub employment_type: String,
    pub deadline: String, // free text as shown on the listing, e.g. "~ 12/31(화)"
    pub link: String,
    pub sector: String,
    pub salary: String,
    pub posted_at: DateTime<Utc>,
    pub views: i64,
}

// A listing as scraped from a search-result page, not yet in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCandidate {
    pub company_name: String,
    pub title: String,
    pub link: String,
    pub location: String,
    pub experience: String,
    pub education: String,
    pub employment_type: String,
    pub deadline: String,
    pub sector: String,
    pub salary: String,
}

// Column values for a job row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub company_id: i64,
    pub title: String,
    pub location: String,
    pub experience_level: String,
    pub education: String,
    pub employment_type: String,
    pub deadline: String,
    pub link: String,
    pub sector: String,
    pub salary: String,
}

impl NewJob {
    pub fn from_candidate(company: &Company, candidate: &JobCandidate) -> Self {
        Self {
            company_id: company.id,
            title: candidate.title.clone(),
            location: candidate.location.clone(),
            experience_level: candidate.experience.clone(),
            education: candidate.education.clone(),
            employment_type: candidate.employment_type.clone(),
            deadline: candidate.deadline.clone(),
            link: candidate.link.clone(),
            sector: candidate.sector.clone(),
            salary: candidate.salary.clone(),
        }
    }
}

// The four "condition" spans of a listing item.
// The site renders these without labels, so their meaning is purely
// positional: location, experience, education, employment type. Absent
// trailing spans become empty strings; spans past the fourth are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionFields {
    pub location: String,
    pub experience: String,
    pub education: String,
    pub employment_type: String,
}

impl ConditionFields {
    pub fn from_positional(spans: &[String]) -> Self {
        let at = |i: usize| spans.get(i).cloned().unwrap_or_default();
        Self {
            location: at(0),
            experience: at(1),
            education: at(2),
            employment_type: at(3),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    pub experience_level: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            search: None,
            location: None,
            experience_level: None,
            page: 1,
            limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_condition_fields_in_order() {
        let fields = ConditionFields::from_positional(&spans(&["서울 강남구", "경력 3년↑", "대졸↑", "정규직"]));
        assert_eq!(fields.location, "서울 강남구");
        assert_eq!(fields.experience, "경력 3년↑");
        assert_eq!(fields.education, "대졸↑");
        assert_eq!(fields.employment_type, "정규직");
    }

    #[test]
    fn test_condition_fields_missing_default_to_empty() {
        let fields = ConditionFields::from_positional(&[]);
        assert_eq!(fields, ConditionFields::default());

        let fields = ConditionFields::from_positional(&spans(&["부산"]));
        assert_eq!(fields.location, "부산");
        assert_eq!(fields.experience, "");
        assert_eq!(fields.employment_type, "");
    }

    #[test]
    fn test_condition_fields_ignore_extra_spans() {
        let fields = ConditionFields::from_positional(&spans(&["a", "b", "c", "d", "e"]));
        assert_eq!(fields.employment_type, "d");
    }

    #[test]
    fn test_job_query_defaults() {
        let query = JobQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 20);
        assert!(query.search.is_none());
    }
}
