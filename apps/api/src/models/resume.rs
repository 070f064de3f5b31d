use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of the asynchronous parse that follows an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Pending,
    Parsing,
    Parsed,
    Failed,
}

impl ParseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStatus::Pending => "pending",
            ParseStatus::Parsing => "parsing",
            ParseStatus::Parsed => "parsed",
            ParseStatus::Failed => "failed",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "parsing" => ParseStatus::Parsing,
            "parsed" => ParseStatus::Parsed,
            "failed" => ParseStatus::Failed,
            _ => ParseStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub file_path: String,
    pub parse_status: String,
    pub parse_error: Option<String>,
    pub parsed_data: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl ResumeRow {
    pub fn status(&self) -> ParseStatus {
        ParseStatus::from_db(&self.parse_status)
    }

    /// Stored parse result, only when the parse actually completed.
    pub fn parsed(&self) -> Option<ParsedResume> {
        if self.status() != ParseStatus::Parsed {
            return None;
        }
        self.parsed_data
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

// The parser is LLM-backed: any field may come back as `null`, and numbers
// sometimes arrive as strings. One bad field must not fail the whole parse.

/// `null` or missing becomes the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// List of strings; numbers are stringified, other entries dropped.
pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect())
}

/// `2024`, `"2024"` or `"May 2024"`.
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Some(Value::String(s)) => s
            .split(|c: char| !c.is_ascii_digit())
            .find(|part| part.len() == 4)
            .and_then(|part| part.parse().ok()),
        _ => None,
    })
}

/// `3.8`, `"3.8"` or `"3.8/4.0"`.
fn lenient_gpa<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.split('/').next().and_then(|g| g.trim().parse().ok()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub job_title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: String,
    #[serde(default, deserialize_with = "string_list")]
    pub responsibilities: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub achievements: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "string_list")]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub degree: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub institution: String,
    #[serde(default, deserialize_with = "lenient_year")]
    pub graduation_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_gpa")]
    pub gpa: Option<f64>,
    #[serde(default, deserialize_with = "string_list")]
    pub relevant_coursework: Vec<String>,
}

/// Structured resume as returned by the parsing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,
    pub education: Vec<EducationEntry>,
    /// 0.0 – 1.0
    pub parsing_confidence: f64,
}

impl ParsedResume {
    /// The `resume_data` shape the content generators expect
    /// (skills wrapped as `{"name": ...}` objects).
    pub fn to_resume_data(&self) -> Value {
        json!({
            "name": self.name,
            "email": self.email,
            "phone": self.phone,
            "location": self.location,
            "skills": self.skills.iter().map(|s| json!({ "name": s })).collect::<Vec<_>>(),
            "experience": self.experience,
            "projects": self.projects,
            "education": self.education,
            "parsing_confidence": self.parsing_confidence,
        })
    }
}
