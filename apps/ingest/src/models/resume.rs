//! Resume data contracts.
//!
//! Consumed by the matching service that queries the job index; resume
//! *parsing* is not a pipeline stage in this crate. These are the wire
//! shapes only.

use serde::{Deserialize, Serialize};

/// A skill from a candidate's resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    /// Proficiency level, e.g. "Expert", "Proficient", "Familiar".
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub years_of_experience: Option<f32>,
}

/// A work experience entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    /// "Present" if current.
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

/// An education entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub graduation_date: Option<String>,
    #[serde(default)]
    pub gpa: Option<String>,
}

/// A project entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub technologies_used: Vec<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Structured resume data as produced by the (external) resume parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeData {
    pub resume_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub certifications: Vec<String>,
}
