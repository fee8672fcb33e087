// LLM prompt constants for structured job-description extraction.

/// System prompt — enforces JSON-only output.
pub const JD_EXTRACT_SYSTEM: &str =
    "You are an expert HR assistant. Your task is to accurately extract all \
    relevant information from a job description and structure it into the \
    provided JSON format. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    If a field is not explicitly mentioned, use null for optional strings \
    and an empty list for list fields.";

/// Extraction prompt template. Replace `{jd_text}` before sending.
pub const JD_EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract structured information from the following job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "company_id": null,
  "title": "Senior Backend Engineer",
  "location": "New York, NY",
  "summary": "One or two sentence summary of the role.",
  "experience_level": "Senior",
  "responsibilities": ["Design and build scalable backend services"],
  "required_skills": ["5+ years backend development", "Go"],
  "preferred_skills": ["Kubernetes"],
  "qualifications": ["B.S. in Computer Science or equivalent"],
  "technologies": ["Go", "PostgreSQL", "Docker"],
  "benefits": ["Health insurance", "401(k) match"]
}

Rules:
- "required_skills": explicit must-haves — "required", "must have", minimum years.
- "preferred_skills": nice-to-haves — "preferred", "bonus", "a plus".
- "technologies": specific languages, frameworks, and tools mentioned anywhere.
- "experience_level": "Entry-level", "Mid-level", "Senior", "Manager", or null.
- Leave "company_id" null unless the text names an unambiguous company identifier.
- Never invent content that is not in the text.

JOB DESCRIPTION:
{jd_text}"#;
