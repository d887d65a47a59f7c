//! Header alias tables.
//!
//! Two tables live here: the preprocessor's exact-match header aliases, and
//! the normalizer's canonical contact fields with the spellings the fuzzy
//! header matcher compares against.

/// Canonical preprocessor keys whose values accumulate into `notes`.
pub const NOTES_LIKE: &[&str] = &["notes", "description", "summary", "about"];

/// Exact header aliases (lower-cased, whitespace-collapsed) → canonical key.
const HEADER_ALIASES: &[(&str, &[&str])] = &[
    ("name", &["name", "full name", "fullname", "contact name", "contact", "person", "lp name", "investor name"]),
    ("firm", &[
        "firm", "firm name", "company", "company name", "org", "organization", "organisation",
        "fund", "fund name", "employer", "institution", "investor",
    ]),
    ("email", &["email", "email address", "e-mail", "e-mail address", "work email", "mail"]),
    ("role", &["role", "title", "job title", "position", "job"]),
    ("location", &["location", "hq", "headquarters", "office location", "city", "address", "office", "hq location"]),
    ("linkedin", &["linkedin", "linkedin url", "linkedin profile", "linkedinurl"]),
    ("website", &["website", "web site", "url", "homepage", "site", "web"]),
    ("twitter", &["twitter", "twitter handle", "x handle", "twitterhandle"]),
    ("notes", &["notes", "note", "comments", "comment"]),
    ("description", &["description", "bio", "biography"]),
    ("summary", &["summary", "overview"]),
    ("about", &["about", "about us"]),
    ("personal_connections", &["personal_connections", "personal connections", "personalconnections", "connections", "relationships", "known contacts"]),
    ("school", &["school", "university", "college", "alma mater"]),
    ("degree", &["degree"]),
    ("interests", &["interests", "focus", "investment focus", "sectors"]),
    ("job_history", &["job_history", "job history", "jobhistory", "employment history", "experience"]),
    ("education", &["education", "education history", "educationhistory"]),
];

/// Map a cleaned, lower-cased header to its canonical key, if aliased.
pub fn canonical_key(header: &str) -> Option<&'static str> {
    HEADER_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&header))
        .map(|(key, _)| *key)
}

/// True when the key's values accumulate into notes.
pub fn is_notes_like(key: &str) -> bool {
    NOTES_LIKE.contains(&key)
}

/// Canonical contact fields understood by the row normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Firm,
    Email,
    Role,
    Linkedin,
    Website,
    Twitter,
    Location,
    Notes,
    PersonalConnections,
    Aum,
    School,
    Degree,
    Interests,
    JobHistory,
    Education,
}

impl Field {
    /// Key used in the confidence map and decision log.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Firm => "firm",
            Field::Email => "email",
            Field::Role => "role",
            Field::Linkedin => "linkedinUrl",
            Field::Website => "website",
            Field::Twitter => "twitterHandle",
            Field::Location => "location",
            Field::Notes => "notes",
            Field::PersonalConnections => "personalConnections",
            Field::Aum => "assetsUnderManagement",
            Field::School => "school",
            Field::Degree => "degree",
            Field::Interests => "interests",
            Field::JobHistory => "jobHistory",
            Field::Education => "educationHistory",
        }
    }
}

/// Spellings the fuzzy header matcher accepts for each field.
const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::Name, &["name", "full name", "fullname", "contact name"]),
    (Field::Firm, &["firm", "company", "organization", "fund"]),
    (Field::Email, &["email", "email address", "e-mail"]),
    (Field::Role, &["role", "title", "job title", "position"]),
    (Field::Linkedin, &["linkedin", "linkedinurl", "linkedin url"]),
    (Field::Website, &["website", "url", "homepage"]),
    (Field::Twitter, &["twitter", "twitterhandle", "twitter handle"]),
    (Field::Location, &["location", "city", "headquarters"]),
    (Field::Notes, &["notes", "note", "comments"]),
    (Field::PersonalConnections, &["personal_connections", "personalconnections", "personal connections", "connections"]),
    (Field::Aum, &["aum", "assetsundermanagement", "assets under management"]),
    (Field::School, &["school", "university", "college"]),
    (Field::Degree, &["degree"]),
    (Field::Interests, &["interests", "focus"]),
    (Field::JobHistory, &["job_history", "jobhistory", "job history", "employment history"]),
    (Field::Education, &["education", "educationhistory", "education history"]),
];

/// Best fuzzy match of `header` against the field aliases.
///
/// Returns the field and its similarity when it exceeds `threshold`.
pub fn match_field(header: &str, threshold: f64) -> Option<(Field, f64)> {
    let header = header.trim().to_lowercase();
    let mut best: Option<(Field, f64)> = None;
    for (field, aliases) in FIELD_ALIASES {
        for alias in *aliases {
            let sim = strsim::normalized_levenshtein(&header, alias);
            if best.is_none_or(|(_, b)| sim > b) {
                best = Some((*field, sim));
            }
        }
    }
    best.filter(|(_, sim)| *sim > threshold)
}
