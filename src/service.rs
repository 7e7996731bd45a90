use chrono::{DateTime, Months, Utc};
use std::collections::BTreeMap;
use tracing::{debug, error};

use crate::auth::OwnerId;
use crate::db::Database;
use crate::error::{Result, TrackerError};
use crate::models::{
    InterviewStageRecord, JobPage, JobQuery, JobRecord, JobStatus, MonthlyCount,
};
use crate::validate::{JobDraft, StageDraft, validate_job, validate_stage};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Owner-scoped queries, aggregation, and validated mutations over the job
/// store. Validation runs before any store access; store failures are logged
/// here and surfaced as a single failure kind.
pub struct Tracker {
    db: Database,
}

impl Tracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // --- Query/filter ---

    /// Filtered, paginated listing: substring search over position OR
    /// company, optional status filter ("all" means none), newest first.
    /// Pages are 1-indexed; a page past the end is an empty page, not an
    /// error.
    pub fn list_jobs(&self, owner: &OwnerId, query: &JobQuery) -> Result<JobPage> {
        let page = query.page.unwrap_or(1).max(1);
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let status = query.status.as_deref().filter(|s| *s != "all");

        debug!(owner = owner.as_str(), page, page_size, "listing jobs");

        let total_count = self.db.count_jobs(owner, search, status).map_err(store_err)?;
        let skip = u64::from(page - 1) * u64::from(page_size);
        let records = self
            .db
            .list_jobs(owner, search, status, page_size, skip)
            .map_err(store_err)?;
        let total_pages = total_count.div_ceil(u64::from(page_size)) as u32;

        Ok(JobPage {
            records,
            total_count,
            page,
            total_pages,
        })
    }

    pub fn get_job(&self, owner: &OwnerId, id: i64) -> Result<JobRecord> {
        self.db
            .job_by_id(owner, id)
            .map_err(store_err)?
            .ok_or(TrackerError::NotFound)
    }

    // --- Aggregation ---

    /// Status counts seeded with every enum value at zero, then merged with
    /// the grouped counts from the store. A groupby alone would drop empty
    /// buckets; the seed keeps every key present. Stored labels outside the
    /// enum are skipped.
    pub fn status_summary(&self, owner: &OwnerId) -> Result<BTreeMap<JobStatus, u64>> {
        let mut summary: BTreeMap<JobStatus, u64> =
            JobStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for (label, count) in self.db.status_counts(owner).map_err(store_err)? {
            if let Some(status) = JobStatus::parse(&label) {
                summary.insert(status, count);
            }
        }
        Ok(summary)
    }

    /// Applications per calendar month over the trailing six months,
    /// ascending. Months without activity produce no entry.
    pub fn monthly_histogram(&self, owner: &OwnerId) -> Result<Vec<MonthlyCount>> {
        let now = Utc::now();
        let cutoff = now
            .checked_sub_months(Months::new(6))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let created = self.db.created_since(owner, cutoff).map_err(store_err)?;
        Ok(fold_monthly(&created))
    }

    // --- Job mutations ---

    pub fn create_job(&self, owner: &OwnerId, draft: &JobDraft) -> Result<JobRecord> {
        let fields = validate_job(draft)?;
        debug!(owner = owner.as_str(), position = %fields.position, "creating job");
        self.db.insert_job(owner, &fields).map_err(store_err)
    }

    /// Full-payload update scoped by (id, owner). An id that belongs to a
    /// different owner is reported exactly like a missing one.
    pub fn update_job(&self, owner: &OwnerId, id: i64, draft: &JobDraft) -> Result<JobRecord> {
        let fields = validate_job(draft)?;
        self.db
            .update_job(owner, id, &fields)
            .map_err(store_err)?
            .ok_or(TrackerError::NotFound)
    }

    /// Deletes the job and all its interview stages in one atomic step.
    /// Deleting an id that is already gone is a clean NotFound.
    pub fn delete_job(&self, owner: &OwnerId, id: i64) -> Result<JobRecord> {
        self.db
            .delete_job(owner, id)
            .map_err(store_err)?
            .ok_or(TrackerError::NotFound)
    }

    // --- Interview stage operations ---

    /// Stages for one job, or every stage the owner has when no job is
    /// given, ordered by scheduled date.
    pub fn list_stages(
        &self,
        owner: &OwnerId,
        job_id: Option<i64>,
    ) -> Result<Vec<InterviewStageRecord>> {
        self.db.list_stages(owner, job_id).map_err(store_err)
    }

    pub fn get_stage(&self, owner: &OwnerId, id: i64) -> Result<InterviewStageRecord> {
        self.db
            .stage_by_id(owner, id)
            .map_err(store_err)?
            .ok_or(TrackerError::NotFound)
    }

    /// The referenced job must belong to the same owner; a foreign job id
    /// fails as if the job did not exist.
    pub fn create_stage(
        &self,
        owner: &OwnerId,
        job_id: i64,
        draft: &StageDraft,
    ) -> Result<InterviewStageRecord> {
        let fields = validate_stage(draft)?;
        if self.db.job_by_id(owner, job_id).map_err(store_err)?.is_none() {
            return Err(TrackerError::NotFound);
        }
        self.db.insert_stage(owner, job_id, &fields).map_err(store_err)
    }

    pub fn update_stage(
        &self,
        owner: &OwnerId,
        id: i64,
        draft: &StageDraft,
    ) -> Result<InterviewStageRecord> {
        let fields = validate_stage(draft)?;
        self.db
            .update_stage(owner, id, &fields)
            .map_err(store_err)?
            .ok_or(TrackerError::NotFound)
    }

    pub fn delete_stage(&self, owner: &OwnerId, id: i64) -> Result<()> {
        if self.db.delete_stage(owner, id).map_err(store_err)? {
            Ok(())
        } else {
            Err(TrackerError::NotFound)
        }
    }
}

/// Folds creation timestamps (already ascending) into per-month entries.
/// Entries are looked up by label first so two records in the same month
/// share one entry; label order follows first appearance.
fn fold_monthly(created: &[DateTime<Utc>]) -> Vec<MonthlyCount> {
    let mut entries: Vec<MonthlyCount> = Vec::new();
    for ts in created {
        let label = ts.format("%b %y").to_string();
        match entries.iter_mut().find(|e| e.month == label) {
            Some(entry) => entry.count += 1,
            None => entries.push(MonthlyCount {
                month: label,
                count: 1,
            }),
        }
    }
    entries
}

fn store_err(e: rusqlite::Error) -> TrackerError {
    error!(error = %e, "storage operation failed");
    TrackerError::Store(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn fold_collapses_same_month_into_one_entry() {
        let folded = fold_monthly(&[at(2025, 3, 2), at(2025, 3, 28)]);
        assert_eq!(
            folded,
            vec![MonthlyCount {
                month: "Mar 25".to_string(),
                count: 2
            }]
        );
    }

    #[test]
    fn fold_keeps_chronological_first_appearance_order() {
        let folded = fold_monthly(&[
            at(2024, 11, 5),
            at(2024, 12, 1),
            at(2024, 12, 9),
            at(2025, 2, 14),
        ]);
        let labels: Vec<&str> = folded.iter().map(|e| e.month.as_str()).collect();
        assert_eq!(labels, vec!["Nov 24", "Dec 24", "Feb 25"]);
        assert_eq!(folded[1].count, 2);
    }

    #[test]
    fn fold_of_nothing_is_empty() {
        assert!(fold_monthly(&[]).is_empty());
    }

    #[test]
    fn summary_skips_status_labels_outside_the_enum() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        let owner = OwnerId::new("u1");
        // A label retired from the status set, still present in old rows.
        db.seed_job_with_raw_status(&owner, "Ghosted").unwrap();
        let tracker = Tracker::new(db);

        let draft = JobDraft {
            position: "Backend Engineer".into(),
            company: "Acme".into(),
            location: "Berlin".into(),
            status: "Applied".into(),
            work_type: "Remote".into(),
            employment_type: "Full-Time".into(),
            job_source: "LinkedIn".into(),
            ..JobDraft::default()
        };
        tracker.create_job(&owner, &draft).unwrap();

        let summary = tracker.status_summary(&owner).unwrap();
        assert_eq!(summary.len(), JobStatus::ALL.len());
        assert_eq!(summary[&JobStatus::Applied], 1);
        assert_eq!(summary.values().sum::<u64>(), 1);
    }
}
