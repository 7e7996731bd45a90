use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::models::{EmploymentType, JobStatus, PriorityTier, StageStatus, WorkType};

/// A job payload as submitted: enum fields arrive as raw strings so a bad
/// value surfaces as a validation failure, not a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDraft {
    pub position: String,
    pub company: String,
    pub location: String,
    pub status: String,
    pub work_type: String,
    pub employment_type: String,
    pub job_source: String,
    pub salary: Option<String>,
    pub salary_asked: Option<String>,
    pub salary_range: Option<String>,
    pub salary_offered: Option<String>,
    pub description: Option<String>,
    pub experience_required: Option<i64>,
    pub priority: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub benefits: Option<Vec<String>>,
    pub date_applied: Option<NaiveDate>,
    pub sent_followup_to_recruiter: bool,
    pub url_job_source: Option<String>,
}

/// The checked form of a JobDraft, ready to persist. Requirements and
/// benefits default to empty lists, an empty source URL becomes absent.
#[derive(Debug, Clone)]
pub struct JobFields {
    pub position: String,
    pub company: String,
    pub location: String,
    pub status: JobStatus,
    pub work_type: WorkType,
    pub employment_type: EmploymentType,
    pub job_source: String,
    pub salary: Option<String>,
    pub salary_asked: Option<String>,
    pub salary_range: Option<String>,
    pub salary_offered: Option<String>,
    pub description: Option<String>,
    pub experience_required: Option<i64>,
    pub priority: Option<PriorityTier>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub date_applied: Option<NaiveDate>,
    pub sent_followup_to_recruiter: bool,
    pub url_job_source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageDraft {
    pub stage_name: String,
    pub description: Option<String>,
    pub status: String,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub interview_notes: Option<String>,
    pub feedback_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StageFields {
    pub stage_name: String,
    pub description: Option<String>,
    pub status: StageStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub interview_notes: Option<String>,
    pub feedback_notes: Option<String>,
}

fn min_len(field: &'static str, value: &str, min: usize) -> Result<()> {
    if value.trim().chars().count() < min {
        return Err(TrackerError::invalid(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    Ok(())
}

fn non_negative(field: &'static str, value: Option<i64>) -> Result<()> {
    if let Some(n) = value {
        if n < 0 {
            return Err(TrackerError::invalid(field, "must not be negative"));
        }
    }
    Ok(())
}

/// Checks the full job payload before any write: field presence, minimum
/// lengths, enum membership, non-negative numbers.
pub fn validate_job(draft: &JobDraft) -> Result<JobFields> {
    min_len("position", &draft.position, 2)?;
    min_len("company", &draft.company, 2)?;
    min_len("location", &draft.location, 2)?;
    min_len("job_source", &draft.job_source, 2)?;

    let status = JobStatus::parse(&draft.status)
        .ok_or_else(|| TrackerError::invalid("status", unknown_value(&draft.status)))?;
    let work_type = WorkType::parse(&draft.work_type)
        .ok_or_else(|| TrackerError::invalid("work_type", unknown_value(&draft.work_type)))?;
    let employment_type = EmploymentType::parse(&draft.employment_type).ok_or_else(|| {
        TrackerError::invalid("employment_type", unknown_value(&draft.employment_type))
    })?;
    let priority = match draft.priority.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            PriorityTier::parse(raw)
                .ok_or_else(|| TrackerError::invalid("priority", unknown_value(raw)))?,
        ),
    };

    non_negative("experience_required", draft.experience_required)?;

    Ok(JobFields {
        position: draft.position.trim().to_string(),
        company: draft.company.trim().to_string(),
        location: draft.location.trim().to_string(),
        status,
        work_type,
        employment_type,
        job_source: draft.job_source.trim().to_string(),
        salary: draft.salary.clone(),
        salary_asked: draft.salary_asked.clone(),
        salary_range: draft.salary_range.clone(),
        salary_offered: draft.salary_offered.clone(),
        description: draft.description.clone(),
        experience_required: draft.experience_required,
        priority,
        requirements: draft.requirements.clone().unwrap_or_default(),
        benefits: draft.benefits.clone().unwrap_or_default(),
        date_applied: draft.date_applied,
        sent_followup_to_recruiter: draft.sent_followup_to_recruiter,
        url_job_source: draft
            .url_job_source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
    })
}

pub fn validate_stage(draft: &StageDraft) -> Result<StageFields> {
    if draft.stage_name.trim().is_empty() {
        return Err(TrackerError::invalid("stage_name", "must not be empty"));
    }

    let status = StageStatus::parse(&draft.status)
        .ok_or_else(|| TrackerError::invalid("status", unknown_value(&draft.status)))?;

    non_negative("duration_minutes", draft.duration_minutes)?;

    Ok(StageFields {
        stage_name: draft.stage_name.trim().to_string(),
        description: draft.description.clone(),
        status,
        scheduled_date: draft.scheduled_date,
        duration_minutes: draft.duration_minutes,
        interview_notes: draft.interview_notes.clone(),
        feedback_notes: draft.feedback_notes.clone(),
    })
}

fn unknown_value(raw: &str) -> String {
    format!("'{raw}' is not a recognized value")
}
