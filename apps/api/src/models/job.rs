use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A job posting as extracted from a URL or pasted text.
///
/// Lives only in the user's workspace; it is never persisted on its own.
/// Field names follow the camelCase wire shape the extraction model emits and
/// the generators consume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub role: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub responsibilities: Option<String>,
    #[serde(default)]
    pub qualifications: Option<String>,
    #[serde(default)]
    pub preferred_qualifications: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub benefits: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    pub skills: Vec<String>,
}

impl JobPosting {
    /// Company name for display, with the same placeholder the tracker uses.
    pub fn company_or_unknown(&self) -> &str {
        self.company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("Unknown Company")
    }

    /// The `job_data` object handed to the content generators.
    pub fn to_job_data(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_posting_deserializes_model_shape() {
        let json = r#"{
            "role": "Frontend Engineer",
            "company": "Acme",
            "location": null,
            "preferredQualifications": "TypeScript",
            "skills": ["React", "CSS"]
        }"#;
        let job: JobPosting = serde_json::from_str(json).unwrap();
        assert_eq!(job.role, "Frontend Engineer");
        assert_eq!(job.preferred_qualifications.as_deref(), Some("TypeScript"));
        assert!(job.location.is_none());
        assert_eq!(job.skills, vec!["React", "CSS"]);
    }

    #[test]
    fn test_job_posting_requires_skills_list() {
        let json = r#"{"role": "Engineer", "skills": "React, CSS"}"#;
        assert!(serde_json::from_str::<JobPosting>(json).is_err());
    }

    #[test]
    fn test_company_or_unknown_falls_back() {
        let job: JobPosting =
            serde_json::from_str(r#"{"role": "Engineer", "company": "  ", "skills": []}"#).unwrap();
        assert_eq!(job.company_or_unknown(), "Unknown Company");
    }

    #[test]
    fn test_job_data_keeps_camel_case_keys() {
        let job = JobPosting {
            role: "Engineer".to_string(),
            preferred_qualifications: Some("Kafka".to_string()),
            skills: vec!["Go".to_string()],
            ..JobPosting::default()
        };
        let data = job.to_job_data();
        assert_eq!(data["preferredQualifications"], "Kafka");
        assert_eq!(data["skills"][0], "Go");
    }
}
