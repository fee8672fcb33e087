use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured job-description record, finalized by the ingest pipeline.
///
/// Immutable once returned: `job_id` is assigned exactly once per
/// ingestion, and the caller-supplied `company_id` and `title` always win
/// over anything the model inferred from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptionRecord {
    pub job_id: Uuid,
    pub company_id: String,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// E.g. "Entry-level", "Mid-level", "Senior", "Manager".
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    /// Specific languages, frameworks, tools.
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
}

/// The schema the LLM is constrained to: a record minus `job_id`, which the
/// structured extractor never sets. `company_id` and `title` are optional
/// here because the model may or may not infer them — either way they are
/// replaced at finalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDraft {
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
}

impl JobDraft {
    /// Finalizes the draft into a record with the pipeline-assigned id and
    /// the caller-supplied identity fields.
    pub fn finalize(self, job_id: Uuid, company_id: &str, title: &str) -> JobDescriptionRecord {
        JobDescriptionRecord {
            job_id,
            company_id: company_id.to_string(),
            title: title.to_string(),
            location: self.location,
            summary: self.summary,
            experience_level: self.experience_level,
            responsibilities: self.responsibilities,
            required_skills: self.required_skills,
            preferred_skills: self.preferred_skills,
            qualifications: self.qualifications,
            technologies: self.technologies,
            benefits: self.benefits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_deserializes_with_omitted_lists_as_empty() {
        let json = r#"{
            "title": "Backend Engineer",
            "location": "Remote",
            "required_skills": ["Go", "distributed systems"]
        }"#;
        let draft: JobDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.title.as_deref(), Some("Backend Engineer"));
        assert_eq!(draft.required_skills.len(), 2);
        assert!(draft.responsibilities.is_empty());
        assert!(draft.benefits.is_empty());
    }

    #[test]
    fn test_finalize_caller_identity_wins() {
        let draft = JobDraft {
            company_id: Some("inferred-co".to_string()),
            title: Some("Inferred Title".to_string()),
            required_skills: vec!["Rust".to_string()],
            ..JobDraft::default()
        };
        let job_id = Uuid::new_v4();
        let record = draft.finalize(job_id, "acme", "Backend Engineer");
        assert_eq!(record.job_id, job_id);
        assert_eq!(record.company_id, "acme");
        assert_eq!(record.title, "Backend Engineer");
        assert_eq!(record.required_skills, vec!["Rust".to_string()]);
    }

    #[test]
    fn test_finalize_preserves_optional_fields() {
        let draft = JobDraft {
            location: Some("New York, NY".to_string()),
            experience_level: Some("Senior".to_string()),
            ..JobDraft::default()
        };
        let record = draft.finalize(Uuid::new_v4(), "acme", "Engineer");
        assert_eq!(record.location.as_deref(), Some("New York, NY"));
        assert_eq!(record.experience_level.as_deref(), Some("Senior"));
        assert!(record.summary.is_none());
    }
}
