//! Flattens a structured record into the scalar metadata mapping the index
//! can filter on.
//!
//! This transform is lossy and one-way: list fields collapse into
//! newline-joined strings. The structured record returned to the caller
//! remains the source of truth.

use crate::index::{Metadata, MetadataValue};
use crate::models::job::JobDescriptionRecord;

/// Every record field appears in the output, empty or not. `None` becomes
/// the empty string, the absent-marker convention of this store.
pub fn flatten(record: &JobDescriptionRecord) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("job_id".to_string(), record.job_id.to_string().into());
    metadata.insert("company_id".to_string(), record.company_id.clone().into());
    metadata.insert("title".to_string(), record.title.clone().into());
    metadata.insert("location".to_string(), optional(&record.location));
    metadata.insert("summary".to_string(), optional(&record.summary));
    metadata.insert(
        "experience_level".to_string(),
        optional(&record.experience_level),
    );
    metadata.insert(
        "responsibilities".to_string(),
        joined(&record.responsibilities),
    );
    metadata.insert(
        "required_skills".to_string(),
        joined(&record.required_skills),
    );
    metadata.insert(
        "preferred_skills".to_string(),
        joined(&record.preferred_skills),
    );
    metadata.insert("qualifications".to_string(), joined(&record.qualifications));
    metadata.insert("technologies".to_string(), joined(&record.technologies));
    metadata.insert("benefits".to_string(), joined(&record.benefits));
    metadata
}

fn optional(value: &Option<String>) -> MetadataValue {
    value.clone().unwrap_or_default().into()
}

fn joined(values: &[String]) -> MetadataValue {
    values.join("\n").into()
}
