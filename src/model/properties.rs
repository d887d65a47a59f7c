//! Properties — the typed key-value payload on nodes and relationships.
//!
//! Known fields are modeled explicitly; anything else lands in `extra`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Direction, Source};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// External profile URL (LinkedIn or similar); used to look targets up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Trust in this node/relationship as a whole, in [0, 1].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutual_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<NaiveDate>,

    /// Period start/end as given by the source (a year or an ISO date).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_current: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_seed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mutual_connection: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

macro_rules! overwrite_if_set {
    ($dst:ident, $src:ident, $($field:ident),+ $(,)?) => {
        $( if $src.$field.is_some() { $dst.$field = $src.$field; } )+
    };
}

impl Properties {
    /// Incoming set fields overwrite; unset fields keep the existing value.
    pub fn merge(&mut self, other: Properties) {
        let this = self;
        overwrite_if_set!(
            this, other,
            name, firm, role, email, location, profile_url, degree, notes,
            source, confidence, strength, weight, mutual_count, direction, last_seen,
            start, end, is_current, is_seed, is_mutual_connection,
        );
        this.extra.extend(other.extra);
    }

    pub fn is_seed(&self) -> bool {
        self.is_seed.unwrap_or(false)
    }

    pub fn is_mutual_connection(&self) -> bool {
        self.is_mutual_connection.unwrap_or(false)
    }

    /// String view of a property by key, for lookups by property name.
    ///
    /// Accepts both camelCase and snake_case spellings of known fields.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "name" => self.name.clone(),
            "firm" => self.firm.clone(),
            "role" => self.role.clone(),
            "email" => self.email.clone(),
            "location" => self.location.clone(),
            "profileUrl" | "profile_url" | "linkedin" | "linkedinUrl" => self.profile_url.clone(),
            "degree" => self.degree.clone(),
            "notes" => self.notes.clone(),
            "confidence" => self.confidence.map(|v| v.to_string()),
            "strength" => self.strength.map(|v| v.to_string()),
            "weight" => self.weight.map(|v| v.to_string()),
            "mutualCount" | "mutual_count" => self.mutual_count.map(|v| v.to_string()),
            "start" => self.start.clone(),
            "end" => self.end.clone(),
            "isCurrent" | "is_current" => self.is_current.map(|v| v.to_string()),
            "isSeed" | "is_seed" => self.is_seed.map(|v| v.to_string()),
            "isMutualConnection" | "is_mutual_connection" => {
                self.is_mutual_connection.map(|v| v.to_string())
            }
            _ => self.extra.get(key).cloned(),
        }
    }
}
