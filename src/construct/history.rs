//! Job and education history blobs.
//!
//! Sources disagree on field names; serde aliases absorb the variants.

use serde::{Deserialize, Deserializer};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct JobEntry {
    #[serde(alias = "companyName", alias = "firm", alias = "organization", alias = "employer")]
    pub company: Option<String>,
    #[serde(alias = "title", alias = "position")]
    pub role: Option<String>,
    #[serde(alias = "startDate", alias = "startYear", alias = "from", deserialize_with = "text_or_number")]
    pub start: Option<String>,
    #[serde(alias = "endDate", alias = "endYear", alias = "to", deserialize_with = "text_or_number")]
    pub end: Option<String>,
    #[serde(alias = "isCurrent")]
    pub current: Option<bool>,
}

impl JobEntry {
    pub fn company(&self) -> Option<&str> {
        self.company.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Explicit flag, else an open or "present" end.
    pub fn is_current(&self) -> bool {
        self.current.unwrap_or_else(|| {
            self.end.as_deref().is_none_or(|e| e.trim().is_empty() || e.eq_ignore_ascii_case("present"))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    #[serde(alias = "institution", alias = "schoolName", alias = "university", alias = "name")]
    pub school: Option<String>,
    #[serde(alias = "degreeName", alias = "field", alias = "fieldOfStudy")]
    pub degree: Option<String>,
    #[serde(alias = "startDate", alias = "startYear", alias = "from", deserialize_with = "text_or_number")]
    pub start: Option<String>,
    #[serde(alias = "endDate", alias = "endYear", alias = "to", deserialize_with = "text_or_number")]
    pub end: Option<String>,
}

impl EducationEntry {
    pub fn school(&self) -> Option<&str> {
        self.school.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Decode a JSON array of job entries.
pub fn parse_jobs(blob: &str) -> Result<Vec<JobEntry>> {
    Ok(serde_json::from_str(blob)?)
}

/// Decode a JSON array of education entries.
pub fn parse_education(blob: &str) -> Result<Vec<EducationEntry>> {
    Ok(serde_json::from_str(blob)?)
}

fn text_or_number<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }
    Ok(match Option::<Raw>::deserialize(de)? {
        Some(Raw::Text(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(Raw::Int(n)) => Some(n.to_string()),
        Some(Raw::Float(f)) => Some(f.to_string()),
        None => None,
    })
}
