use std::collections::HashSet;

use jobtrack::auth::OwnerId;
use jobtrack::db::Database;
use jobtrack::error::TrackerError;
use jobtrack::models::{JobQuery, JobStatus};
use jobtrack::service::Tracker;
use jobtrack::validate::{JobDraft, StageDraft};

fn tracker() -> Tracker {
    let db = Database::open_in_memory().unwrap();
    db.init().unwrap();
    Tracker::new(db)
}

fn draft(position: &str, company: &str) -> JobDraft {
    JobDraft {
        position: position.into(),
        company: company.into(),
        location: "Berlin".into(),
        status: "To Apply".into(),
        work_type: "Remote".into(),
        employment_type: "Full-Time".into(),
        job_source: "LinkedIn".into(),
        ..JobDraft::default()
    }
}

fn stage_draft(name: &str) -> StageDraft {
    StageDraft {
        stage_name: name.into(),
        status: "Pending".into(),
        ..StageDraft::default()
    }
}

fn query() -> JobQuery {
    JobQuery::default()
}

#[test]
fn owners_never_see_each_others_records() {
    let tracker = tracker();
    let alice = OwnerId::new("alice");
    let bob = OwnerId::new("bob");

    let job = tracker.create_job(&alice, &draft("Backend Engineer", "Acme")).unwrap();
    tracker.create_job(&alice, &draft("Data Engineer", "Acme")).unwrap();

    let page = tracker.list_jobs(&bob, &query()).unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.records.is_empty());

    assert!(matches!(
        tracker.get_job(&bob, job.id),
        Err(TrackerError::NotFound)
    ));
    assert!(matches!(
        tracker.update_job(&bob, job.id, &draft("Hijacked", "Evil Corp")),
        Err(TrackerError::NotFound)
    ));
    assert!(matches!(
        tracker.delete_job(&bob, job.id),
        Err(TrackerError::NotFound)
    ));
    assert!(matches!(
        tracker.create_stage(&bob, job.id, &stage_draft("Phone Screen")),
        Err(TrackerError::NotFound)
    ));

    let summary = tracker.status_summary(&bob).unwrap();
    assert_eq!(summary.values().sum::<u64>(), 0);
    assert!(tracker.monthly_histogram(&bob).unwrap().is_empty());

    // Alice's record survived Bob's attempts untouched.
    let kept = tracker.get_job(&alice, job.id).unwrap();
    assert_eq!(kept.position, "Backend Engineer");
}

#[test]
fn status_summary_contains_every_bucket() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    let empty = tracker.status_summary(&owner).unwrap();
    assert_eq!(empty.len(), JobStatus::ALL.len());
    assert!(empty.values().all(|&c| c == 0));

    let mut d = draft("Backend Engineer", "Acme");
    d.status = "Applied".into();
    tracker.create_job(&owner, &d).unwrap();
    tracker.create_job(&owner, &d).unwrap();
    d.status = "Rejected".into();
    tracker.create_job(&owner, &d).unwrap();

    let summary = tracker.status_summary(&owner).unwrap();
    assert_eq!(summary.len(), JobStatus::ALL.len());
    assert_eq!(summary[&JobStatus::Applied], 2);
    assert_eq!(summary[&JobStatus::Rejected], 1);
    assert_eq!(summary[&JobStatus::ToApply], 0);
    assert_eq!(summary.values().sum::<u64>(), 3);
}

#[test]
fn pagination_is_consistent_and_complete() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    for i in 0..25 {
        tracker
            .create_job(&owner, &draft(&format!("Engineer {i:02}"), "Acme"))
            .unwrap();
    }

    let mut q = query();
    q.page_size = Some(10);

    let first = tracker.list_jobs(&owner, &q).unwrap();
    assert_eq!(first.total_count, 25);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.records.len(), 10);

    let mut seen = HashSet::new();
    for page in 1..=first.total_pages {
        q.page = Some(page);
        for record in tracker.list_jobs(&owner, &q).unwrap().records {
            seen.insert(record.id);
        }
    }
    assert_eq!(seen.len(), 25);

    // One past the end: empty, not an error.
    q.page = Some(first.total_pages + 1);
    let past = tracker.list_jobs(&owner, &q).unwrap();
    assert!(past.records.is_empty());
    assert_eq!(past.total_pages, 3);
}

#[test]
fn listing_orders_newest_first_deterministically() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    let first = tracker.create_job(&owner, &draft("Engineer A", "Acme")).unwrap();
    let second = tracker.create_job(&owner, &draft("Engineer B", "Acme")).unwrap();

    let once = tracker.list_jobs(&owner, &query()).unwrap();
    let twice = tracker.list_jobs(&owner, &query()).unwrap();
    let ids: Vec<i64> = once.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, twice.records.iter().map(|r| r.id).collect::<Vec<_>>());

    // Same-timestamp inserts still come back newest insertion first.
    assert_eq!(ids.first(), Some(&second.id));
    assert_eq!(ids.last(), Some(&first.id));
}

#[test]
fn search_matches_position_or_company() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    tracker.create_job(&owner, &draft("Backend Engineer", "Acme")).unwrap();
    tracker.create_job(&owner, &draft("Product Designer", "Backend Labs")).unwrap();
    tracker.create_job(&owner, &draft("Data Analyst", "Beta GmbH")).unwrap();

    let mut q = query();
    q.status = Some("all".into());

    q.search = Some("Backend".into());
    let found = tracker.list_jobs(&owner, &q).unwrap();
    assert_eq!(found.total_count, 2); // position match and company match

    q.search = Some("Frontend".into());
    assert_eq!(tracker.list_jobs(&owner, &q).unwrap().total_count, 0);

    // LIKE wildcards in the needle are literal, not patterns.
    q.search = Some("%".into());
    assert_eq!(tracker.list_jobs(&owner, &q).unwrap().total_count, 0);
}

#[test]
fn status_filter_restricts_and_all_is_a_sentinel() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    let mut d = draft("Backend Engineer", "Acme");
    tracker.create_job(&owner, &d).unwrap();
    d.status = "Applied".into();
    tracker.create_job(&owner, &d).unwrap();

    let mut q = query();
    q.status = Some("Applied".into());
    let filtered = tracker.list_jobs(&owner, &q).unwrap();
    assert_eq!(filtered.total_count, 1);
    assert_eq!(filtered.records[0].status, JobStatus::Applied);

    q.status = Some("all".into());
    assert_eq!(tracker.list_jobs(&owner, &q).unwrap().total_count, 2);
}

#[test]
fn deleting_a_job_cascades_to_its_stages() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    let job = tracker.create_job(&owner, &draft("Backend Engineer", "Acme")).unwrap();
    let other = tracker.create_job(&owner, &draft("Data Engineer", "Beta")).unwrap();
    tracker.create_stage(&owner, job.id, &stage_draft("Phone Screen")).unwrap();
    tracker.create_stage(&owner, job.id, &stage_draft("Onsite")).unwrap();
    let kept_stage = tracker
        .create_stage(&owner, other.id, &stage_draft("Phone Screen"))
        .unwrap();

    let deleted = tracker.delete_job(&owner, job.id).unwrap();
    assert_eq!(deleted.id, job.id);

    assert!(tracker.list_stages(&owner, Some(job.id)).unwrap().is_empty());
    assert!(matches!(
        tracker.get_job(&owner, job.id),
        Err(TrackerError::NotFound)
    ));

    // The other job and its stage are untouched.
    let remaining = tracker.list_stages(&owner, None).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept_stage.id);

    // Deleting again is a clean failure, not a crash.
    assert!(matches!(
        tracker.delete_job(&owner, job.id),
        Err(TrackerError::NotFound)
    ));
}

#[test]
fn invalid_payload_never_reaches_the_store() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    let mut d = draft("X", "Acme");
    let err = tracker.create_job(&owner, &d).unwrap_err();
    assert!(matches!(
        err,
        TrackerError::Validation { field: "position", .. }
    ));
    assert_eq!(tracker.list_jobs(&owner, &query()).unwrap().total_count, 0);

    d.position = "Backend Engineer".into();
    d.work_type = "Telepathic".into();
    assert!(matches!(
        tracker.create_job(&owner, &d),
        Err(TrackerError::Validation { field: "work_type", .. })
    ));
    assert_eq!(tracker.list_jobs(&owner, &query()).unwrap().total_count, 0);
}

#[test]
fn update_validates_and_replaces_the_payload() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    let job = tracker.create_job(&owner, &draft("Backend Engineer", "Acme")).unwrap();

    let mut d = draft("Senior Backend Engineer", "Acme");
    d.status = "Interviewing".into();
    d.salary_offered = Some("95k EUR".into());
    let updated = tracker.update_job(&owner, job.id, &d).unwrap();
    assert_eq!(updated.position, "Senior Backend Engineer");
    assert_eq!(updated.status, JobStatus::Interviewing);
    assert_eq!(updated.salary_offered.as_deref(), Some("95k EUR"));

    d.company = "A".into();
    assert!(matches!(
        tracker.update_job(&owner, job.id, &d),
        Err(TrackerError::Validation { field: "company", .. })
    ));
    // The failed update left the previous state in place.
    let current = tracker.get_job(&owner, job.id).unwrap();
    assert_eq!(current.company, "Acme");
    assert_eq!(current.status, JobStatus::Interviewing);

    assert!(matches!(
        tracker.update_job(&owner, 9999, &draft("Backend Engineer", "Acme")),
        Err(TrackerError::NotFound)
    ));
}

#[test]
fn full_payload_update_clears_optional_fields() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    let mut d = draft("Backend Engineer", "Acme");
    d.description = Some("Great team".into());
    d.salary_offered = Some("95k EUR".into());
    let job = tracker.create_job(&owner, &d).unwrap();
    assert!(job.description.is_some());

    // A payload without the optional fields wipes them; there is no merge.
    let cleared = tracker
        .update_job(&owner, job.id, &draft("Backend Engineer", "Acme"))
        .unwrap();
    assert!(cleared.description.is_none());
    assert!(cleared.salary_offered.is_none());

    let mut s = stage_draft("Phone Screen");
    s.interview_notes = Some("went well".into());
    let stage = tracker.create_stage(&owner, job.id, &s).unwrap();
    assert!(stage.interview_notes.is_some());

    let cleared = tracker
        .update_stage(&owner, stage.id, &stage_draft("Phone Screen"))
        .unwrap();
    assert!(cleared.interview_notes.is_none());
}

#[test]
fn create_applies_documented_defaults() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    let mut d = draft("Backend Engineer", "Acme");
    d.url_job_source = Some("".into());
    let job = tracker.create_job(&owner, &d).unwrap();

    assert!(job.requirements.is_empty());
    assert!(job.benefits.is_empty());
    assert!(job.url_job_source.is_none());
    assert!(!job.sent_followup_to_recruiter);
    assert!(job.id > 0);
}

#[test]
fn same_month_applications_share_one_histogram_entry() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");

    tracker.create_job(&owner, &draft("Backend Engineer", "Acme")).unwrap();
    tracker.create_job(&owner, &draft("Data Engineer", "Beta")).unwrap();

    let histogram = tracker.monthly_histogram(&owner).unwrap();
    assert_eq!(histogram.len(), 1);
    assert_eq!(histogram[0].count, 2);
    assert_eq!(
        histogram[0].month,
        chrono::Utc::now().format("%b %y").to_string()
    );
}

#[test]
fn stage_lifecycle_is_owner_scoped() {
    let tracker = tracker();
    let owner = OwnerId::new("u1");
    let stranger = OwnerId::new("u2");

    let job = tracker.create_job(&owner, &draft("Backend Engineer", "Acme")).unwrap();
    let stage = tracker
        .create_stage(&owner, job.id, &stage_draft("Phone Screen"))
        .unwrap();
    assert_eq!(stage.job_id, job.id);

    // Stage payloads are validated before the job lookup.
    let mut bad = stage_draft("");
    assert!(matches!(
        tracker.create_stage(&owner, job.id, &bad),
        Err(TrackerError::Validation { field: "stage_name", .. })
    ));
    bad = stage_draft("Onsite");
    bad.duration_minutes = Some(-5);
    assert!(matches!(
        tracker.create_stage(&owner, job.id, &bad),
        Err(TrackerError::Validation { field: "duration_minutes", .. })
    ));

    let mut edit = stage_draft("Phone Screen");
    edit.status = "Passed".into();
    edit.duration_minutes = Some(45);
    let updated = tracker.update_stage(&owner, stage.id, &edit).unwrap();
    assert_eq!(updated.duration_minutes, Some(45));

    assert!(matches!(
        tracker.update_stage(&stranger, stage.id, &edit),
        Err(TrackerError::NotFound)
    ));
    assert!(matches!(
        tracker.delete_stage(&stranger, stage.id),
        Err(TrackerError::NotFound)
    ));
    assert!(tracker.list_stages(&stranger, Some(job.id)).unwrap().is_empty());

    tracker.delete_stage(&owner, stage.id).unwrap();
    assert!(matches!(
        tracker.delete_stage(&owner, stage.id),
        Err(TrackerError::NotFound)
    ));
}
