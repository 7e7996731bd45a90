use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "To Apply")]
    ToApply,
    Applied,
    Screening,
    Interviewing,
    #[serde(rename = "Offer Extended")]
    OfferExtended,
    Negotiating,
    Accepted,
    Declined,
    Rejected,
    #[serde(rename = "On Hold")]
    OnHold,
    Withdrawn,
}

impl JobStatus {
    pub const ALL: [JobStatus; 11] = [
        JobStatus::ToApply,
        JobStatus::Applied,
        JobStatus::Screening,
        JobStatus::Interviewing,
        JobStatus::OfferExtended,
        JobStatus::Negotiating,
        JobStatus::Accepted,
        JobStatus::Declined,
        JobStatus::Rejected,
        JobStatus::OnHold,
        JobStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::ToApply => "To Apply",
            JobStatus::Applied => "Applied",
            JobStatus::Screening => "Screening",
            JobStatus::Interviewing => "Interviewing",
            JobStatus::OfferExtended => "Offer Extended",
            JobStatus::Negotiating => "Negotiating",
            JobStatus::Accepted => "Accepted",
            JobStatus::Declined => "Declined",
            JobStatus::Rejected => "Rejected",
            JobStatus::OnHold => "On Hold",
            JobStatus::Withdrawn => "Withdrawn",
        }
    }

    /// Exact-label lookup. Returns None for anything outside the closed set,
    /// including legacy values left behind in storage.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkType {
    Hybrid,
    Onsite,
    Remote,
    Flexible,
}

impl WorkType {
    pub const ALL: [WorkType; 4] = [
        WorkType::Hybrid,
        WorkType::Onsite,
        WorkType::Remote,
        WorkType::Flexible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::Hybrid => "Hybrid",
            WorkType::Onsite => "Onsite",
            WorkType::Remote => "Remote",
            WorkType::Flexible => "Flexible",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentType {
    #[serde(rename = "Full-Time")]
    FullTime,
    #[serde(rename = "Part-Time")]
    PartTime,
    Contract,
    Internship,
    Freelance,
    Temporary,
}

impl EmploymentType {
    pub const ALL: [EmploymentType; 6] = [
        EmploymentType::FullTime,
        EmploymentType::PartTime,
        EmploymentType::Contract,
        EmploymentType::Internship,
        EmploymentType::Freelance,
        EmploymentType::Temporary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "Full-Time",
            EmploymentType::PartTime => "Part-Time",
            EmploymentType::Contract => "Contract",
            EmploymentType::Internship => "Internship",
            EmploymentType::Freelance => "Freelance",
            EmploymentType::Temporary => "Temporary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityTier {
    #[serde(rename = "Dream Job")]
    DreamJob,
    #[serde(rename = "Great Opportunity")]
    GreatOpportunity,
    #[serde(rename = "Backup Option")]
    BackupOption,
    #[serde(rename = "Exploring Interest")]
    ExploringInterest,
}

impl PriorityTier {
    pub const ALL: [PriorityTier; 4] = [
        PriorityTier::DreamJob,
        PriorityTier::GreatOpportunity,
        PriorityTier::BackupOption,
        PriorityTier::ExploringInterest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::DreamJob => "Dream Job",
            PriorityTier::GreatOpportunity => "Great Opportunity",
            PriorityTier::BackupOption => "Backup Option",
            PriorityTier::ExploringInterest => "Exploring Interest",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageStatus {
    Pending,
    Passed,
    #[serde(rename = "Done-Waiting Response")]
    DoneWaitingResponse,
    Cancelled,
}

impl StageStatus {
    pub const ALL: [StageStatus; 4] = [
        StageStatus::Pending,
        StageStatus::Passed,
        StageStatus::DoneWaitingResponse,
        StageStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "Pending",
            StageStatus::Passed => "Passed",
            StageStatus::DoneWaitingResponse => "Done-Waiting Response",
            StageStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked job application, owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: i64,
    pub owner: String,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One interview step under a job. Owner always matches the parent job's owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewStageRecord {
    pub id: i64,
    pub owner: String,
    pub job_id: i64,
    pub stage_name: String,
    pub description: Option<String>,
    pub status: StageStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub interview_notes: Option<String>,
    pub feedback_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List filters as they arrive from the caller. The status filter is a raw
/// string so the "all" sentinel and unknown values pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobPage {
    pub records: Vec<JobRecord>,
    pub total_count: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// One month of application activity, labeled like "Jan 25".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip() {
        for status in JobStatus::ALL {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("Ghosted"), None);
        assert_eq!(JobStatus::parse("to apply"), None);
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&JobStatus::OfferExtended).unwrap();
        assert_eq!(json, "\"Offer Extended\"");
        let back: JobStatus = serde_json::from_str("\"On Hold\"").unwrap();
        assert_eq!(back, JobStatus::OnHold);

        let json = serde_json::to_string(&EmploymentType::FullTime).unwrap();
        assert_eq!(json, "\"Full-Time\"");
        let json = serde_json::to_string(&StageStatus::DoneWaitingResponse).unwrap();
        assert_eq!(json, "\"Done-Waiting Response\"");
    }

    #[test]
    fn secondary_enum_labels_round_trip() {
        for v in WorkType::ALL {
            assert_eq!(WorkType::parse(v.as_str()), Some(v));
        }
        for v in EmploymentType::ALL {
            assert_eq!(EmploymentType::parse(v.as_str()), Some(v));
        }
        for v in PriorityTier::ALL {
            assert_eq!(PriorityTier::parse(v.as_str()), Some(v));
        }
        for v in StageStatus::ALL {
            assert_eq!(StageStatus::parse(v.as_str()), Some(v));
        }
    }
}
