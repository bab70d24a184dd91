//! Domain records shared by acquisition and extraction.

use serde::{Deserialize, Serialize};

/// One roster entry to acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
    pub profile_url: String,
    pub profile_document: Option<String>,
    pub detail_document: Option<String>,
}

impl Subject {
    pub fn new(id: impl Into<String>, profile_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            profile_url: profile_url.into(),
            profile_document: None,
            detail_document: None,
        }
    }

    /// Attach both captured documents.
    pub fn attach(&mut self, profile: String, detail: String) {
        self.profile_document = Some(profile);
        self.detail_document = Some(detail);
    }

    /// Location of the extended experience detail page.
    pub fn detail_url(&self, suffix: &str) -> String {
        format!("{}{}", self.profile_url.trim_end_matches('/'), suffix)
    }
}

/// A login identity used to acquire sessions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    #[serde(rename = "profile_id", deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(rename = "email")]
    pub username: String,
    pub password: String,
    /// Egress location the account must be routed through.
    #[serde(rename = "vpn_location", default)]
    pub locale: String,
    #[serde(rename = "vpn_server", default)]
    pub server: String,
}

fn id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "profile_id must be a string or number, got {other}"
        ))),
    }
}

/// A structured start/end date pair parsed from free text.
///
/// Years are kept as text and parsed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_month: Option<String>,
    pub start_year: Option<String>,
    pub end_month: Option<String>,
    pub end_year: Option<String>,
    pub duration: Option<String>,
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.start_month.is_none()
            && self.start_year.is_none()
            && self.end_month.is_none()
            && self.end_year.is_none()
            && self.duration.is_none()
    }

    pub fn start_year_number(&self) -> Option<i32> {
        self.start_year.as_deref().and_then(|y| y.parse().ok())
    }

    pub fn end_year_number(&self) -> Option<i32> {
        self.end_year.as_deref().and_then(|y| y.parse().ok())
    }

    /// Whether the range is open-ended ("Present").
    pub fn is_ongoing(&self) -> bool {
        self.end_year
            .as_deref()
            .is_some_and(|y| y.eq_ignore_ascii_case("present"))
    }
}

/// One education list item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub school: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_month: Option<String>,
    pub start_year: Option<String>,
    pub end_month: Option<String>,
    pub end_year: Option<String>,
    pub raw_years: Option<String>,
    pub raw_degree: Option<String>,
}

impl EducationEntry {
    pub fn is_empty(&self) -> bool {
        self.school.is_none()
            && self.degree.is_none()
            && self.field_of_study.is_none()
            && self.start_month.is_none()
            && self.start_year.is_none()
            && self.end_month.is_none()
            && self.end_year.is_none()
            && self.raw_years.is_none()
            && self.raw_degree.is_none()
    }
}

/// One experience role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: Option<String>,
    pub company_id: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_month: Option<String>,
    pub start_year: Option<String>,
    pub end_month: Option<String>,
    pub end_year: Option<String>,
    pub duration: Option<String>,
    pub raw_years: Option<String>,
}

impl ExperienceEntry {
    pub fn is_empty(&self) -> bool {
        self.company.is_none()
            && self.company_id.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.start_month.is_none()
            && self.start_year.is_none()
            && self.end_month.is_none()
            && self.end_year.is_none()
            && self.duration.is_none()
            && self.raw_years.is_none()
    }
}

/// Structured output for one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub subject_id: String,
    pub profile_url: String,
    pub name: Option<String>,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub educations: Vec<EducationEntry>,
    pub experiences: Vec<ExperienceEntry>,
    pub image_url: Option<String>,
}

impl ExtractionRecord {
    /// Whether no field was recovered from the documents.
    pub fn is_blank(&self) -> bool {
        self.name.is_none()
            && self.headline.is_none()
            && self.location.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && self.educations.is_empty()
            && self.experiences.is_empty()
            && self.image_url.is_none()
    }
}

/// Current or past membership filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tenure {
    Current,
    Past,
}

impl Tenure {
    /// Label used by the filter controls ("Current", "Past").
    pub fn label(self) -> &'static str {
        match self {
            Tenure::Current => "Current",
            Tenure::Past => "Past",
        }
    }

    /// Lowercase form used in placeholders ("current", "past").
    pub fn keyword(self) -> &'static str {
        match self {
            Tenure::Current => "current",
            Tenure::Past => "past",
        }
    }
}

/// What a membership search was filtered by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterKey {
    pub company: String,
    pub tenure: Tenure,
}

impl FilterKey {
    pub fn new(company: impl Into<String>, tenure: Tenure) -> Self {
        Self {
            company: company.into(),
            tenure,
        }
    }
}

/// Whether a membership record is a result row or the "checked, empty" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipKind {
    Member,
    NoMatches,
}

/// One row of a filtered people search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub kind: MembershipKind,
    pub input_company: String,
    pub searched_company: Option<String>,
    pub name: Option<String>,
    pub lead_url: Option<String>,
    /// Public profile locator, filled in when the lead is resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    pub currently_at_company: bool,
}

impl MembershipRecord {
    /// Sentinel marking a filter that was checked and matched nobody.
    pub fn no_matches(filter: &FilterKey) -> Self {
        Self {
            kind: MembershipKind::NoMatches,
            input_company: filter.company.clone(),
            searched_company: None,
            name: None,
            lead_url: None,
            profile_url: None,
            currently_at_company: filter.tenure == Tenure::Current,
        }
    }

    pub fn member(
        filter: &FilterKey,
        searched_company: &str,
        name: Option<String>,
        lead_url: String,
    ) -> Self {
        Self {
            kind: MembershipKind::Member,
            input_company: filter.company.clone(),
            searched_company: Some(searched_company.to_string()),
            name,
            lead_url: Some(lead_url),
            profile_url: None,
            currently_at_company: filter.tenure == Tenure::Current,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.kind == MembershipKind::NoMatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_url_strips_trailing_slash() {
        let s = Subject::new("7", "https://www.example.com/in/jane/");
        assert_eq!(
            s.detail_url("/details/experience/"),
            "https://www.example.com/in/jane/details/experience/"
        );
    }

    #[test]
    fn test_account_accepts_numeric_id() {
        let json = r#"{"profile_id": 4, "email": "a@b.c", "password": "pw",
                       "vpn_location": "us", "vpn_server": "us-12"}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.id, "4");
        assert_eq!(account.username, "a@b.c");
        assert_eq!(account.locale, "us");
    }

    #[test]
    fn test_date_range_numbers_parse_on_demand() {
        let range = DateRange {
            start_year: Some("2018".into()),
            end_year: Some("Present".into()),
            ..Default::default()
        };
        assert_eq!(range.start_year_number(), Some(2018));
        assert_eq!(range.end_year_number(), None);
        assert!(range.is_ongoing());
    }

    #[test]
    fn test_sentinel_is_distinguishable() {
        let filter = FilterKey::new("Acme", Tenure::Past);
        let sentinel = MembershipRecord::no_matches(&filter);
        assert!(sentinel.is_sentinel());
        assert!(!sentinel.currently_at_company);
        let member =
            MembershipRecord::member(&filter, "Acme Inc", Some("Jo".into()), "u".into());
        assert!(!member.is_sentinel());
    }
}
