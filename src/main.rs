use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use jobtrack::auth::{OwnerId, SessionStore};
use jobtrack::db::Database;
use jobtrack::error::TrackerError;
use jobtrack::models::{InterviewStageRecord, JobQuery, JobRecord, JobStatus};
use jobtrack::service::Tracker;
use jobtrack::validate::{JobDraft, StageDraft};

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications, interview stages, and pipeline stats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Sign in as a user (all records are scoped to the signed-in user)
    Login {
        /// User name
        user: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Add a job application
    Add {
        /// Read the full payload from a JSON file instead of flags
        #[arg(long, conflicts_with_all = ["position", "company", "location"])]
        file: Option<PathBuf>,

        /// Position title
        #[arg(required_unless_present = "file")]
        position: Option<String>,

        /// Company name
        #[arg(required_unless_present = "file")]
        company: Option<String>,

        /// Location
        #[arg(required_unless_present = "file")]
        location: Option<String>,

        /// Status (e.g. "To Apply", "Applied", "Interviewing")
        #[arg(short, long, default_value = "To Apply")]
        status: String,

        /// Work arrangement (Hybrid, Onsite, Remote, Flexible)
        #[arg(long, default_value = "Onsite")]
        work_type: String,

        /// Employment type (Full-Time, Part-Time, Contract, ...)
        #[arg(long, default_value = "Full-Time")]
        employment_type: String,

        /// Where the posting was found (LinkedIn, Indeed, ...)
        #[arg(long, default_value = "Other")]
        source: String,

        #[arg(long)]
        salary: Option<String>,

        #[arg(long)]
        salary_asked: Option<String>,

        #[arg(long)]
        salary_range: Option<String>,

        #[arg(long)]
        salary_offered: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Years of experience required
        #[arg(long)]
        experience: Option<i64>,

        /// Priority tier ("Dream Job", "Great Opportunity", ...)
        #[arg(long)]
        priority: Option<String>,

        /// Requirement line (repeatable)
        #[arg(long = "requirement")]
        requirements: Vec<String>,

        /// Benefit line (repeatable)
        #[arg(long = "benefit")]
        benefits: Vec<String>,

        /// Date applied (YYYY-MM-DD)
        #[arg(long)]
        date_applied: Option<NaiveDate>,

        /// Mark the recruiter follow-up as sent
        #[arg(long)]
        followed_up: bool,

        /// Posting URL
        #[arg(long)]
        url: Option<String>,
    },

    /// List job applications
    List {
        /// Match position or company by substring
        #[arg(long)]
        search: Option<String>,

        /// Filter by status, or "all"
        #[arg(short, long, default_value = "all")]
        status: String,

        /// Page number (1-indexed)
        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "10")]
        page_size: u32,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one job with its interview stages
    Show {
        /// Job ID
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Edit a job (unset flags keep their current values)
    Edit {
        /// Job ID
        id: i64,

        /// Read the full payload from a JSON file. The file replaces the
        /// whole record, so this is also how an optional field is cleared.
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long)]
        position: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(long)]
        work_type: Option<String>,

        #[arg(long)]
        employment_type: Option<String>,

        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        salary: Option<String>,

        #[arg(long)]
        salary_asked: Option<String>,

        #[arg(long)]
        salary_range: Option<String>,

        #[arg(long)]
        salary_offered: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        experience: Option<i64>,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        date_applied: Option<NaiveDate>,

        /// Mark the recruiter follow-up as sent
        #[arg(long)]
        followed_up: bool,

        #[arg(long)]
        url: Option<String>,
    },

    /// Delete a job and its interview stages
    Delete {
        /// Job ID
        id: i64,
    },

    /// Per-status application counts
    Stats,

    /// Applications per month over the trailing six months
    Chart,

    /// Manage interview stages
    Stage {
        #[command(subcommand)]
        command: StageCommands,
    },
}

#[derive(Subcommand)]
enum StageCommands {
    /// Add an interview stage to a job
    Add {
        /// Parent job ID
        job_id: i64,

        /// Stage name (e.g. "Phone Screen")
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Status (Pending, Passed, "Done-Waiting Response", Cancelled)
        #[arg(short, long, default_value = "Pending")]
        status: String,

        /// Scheduled date-time, RFC 3339 (e.g. 2026-09-01T14:00:00Z)
        #[arg(long)]
        date: Option<DateTime<Utc>>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<i64>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        feedback: Option<String>,
    },

    /// List interview stages, for one job or across all jobs
    List {
        /// Restrict to one job
        #[arg(long)]
        job: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Edit an interview stage (unset flags keep their current values)
    Edit {
        /// Stage ID
        id: i64,

        /// Read the full payload from a JSON file. The file replaces the
        /// whole record, so this is also how an optional field is cleared.
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(long)]
        date: Option<DateTime<Utc>>,

        #[arg(long)]
        duration: Option<i64>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        feedback: Option<String>,
    },

    /// Delete an interview stage
    Delete {
        /// Stage ID
        id: i64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let db = Database::open()?;
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Login { user } => {
            let sessions = SessionStore::open()?;
            sessions.login(&user)?;
            println!("Signed in as '{}'.", user.trim());
        }

        Commands::Logout => {
            let sessions = SessionStore::open()?;
            sessions.logout()?;
            println!("Signed out.");
        }

        Commands::Whoami => {
            let sessions = SessionStore::open()?;
            match sessions.current() {
                Ok(owner) => println!("{}", owner.as_str()),
                Err(_) => println!("Not signed in."),
            }
        }

        Commands::Add {
            file,
            position,
            company,
            location,
            status,
            work_type,
            employment_type,
            source,
            salary,
            salary_asked,
            salary_range,
            salary_offered,
            description,
            experience,
            priority,
            requirements,
            benefits,
            date_applied,
            followed_up,
            url,
        } => {
            let (tracker, owner) = open_tracker()?;
            let draft = if let Some(path) = file {
                read_payload(&path)?
            } else {
                JobDraft {
                    position: position.unwrap_or_default(),
                    company: company.unwrap_or_default(),
                    location: location.unwrap_or_default(),
                    status,
                    work_type,
                    employment_type,
                    job_source: source,
                    salary,
                    salary_asked,
                    salary_range,
                    salary_offered,
                    description,
                    experience_required: experience,
                    priority,
                    requirements: if requirements.is_empty() {
                        None
                    } else {
                        Some(requirements)
                    },
                    benefits: if benefits.is_empty() {
                        None
                    } else {
                        Some(benefits)
                    },
                    date_applied,
                    sent_followup_to_recruiter: followed_up,
                    url_job_source: url,
                }
            };
            match tracker.create_job(&owner, &draft) {
                Ok(job) => println!("Added job #{}: {} at {}", job.id, job.position, job.company),
                Err(e) => fail(e),
            }
        }

        Commands::List {
            search,
            status,
            page,
            page_size,
            json,
        } => {
            let (tracker, owner) = open_tracker()?;
            let query = JobQuery {
                search,
                status: Some(status),
                page: Some(page),
                page_size: Some(page_size),
            };
            match tracker.list_jobs(&owner, &query) {
                Ok(result) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&result)?);
                    } else if result.records.is_empty() {
                        println!("No jobs found.");
                    } else {
                        print_jobs_table(&result.records);
                        println!(
                            "\nPage {} of {} ({} total)",
                            result.page, result.total_pages, result.total_count
                        );
                    }
                }
                // Queries degrade to an empty view rather than aborting.
                Err(TrackerError::Store(_)) => println!("No jobs found."),
                Err(e) => fail(e),
            }
        }

        Commands::Show { id, json } => {
            let (tracker, owner) = open_tracker()?;
            match tracker.get_job(&owner, id) {
                Ok(job) => {
                    let stages = tracker.list_stages(&owner, Some(id)).unwrap_or_default();
                    if json {
                        println!("{}", serde_json::to_string_pretty(&job_json(&job, &stages))?);
                    } else {
                        print_job(&job, &stages);
                    }
                }
                Err(e) => fail(e),
            }
        }

        Commands::Edit {
            id,
            file,
            position,
            company,
            location,
            status,
            work_type,
            employment_type,
            source,
            salary,
            salary_asked,
            salary_range,
            salary_offered,
            description,
            experience,
            priority,
            date_applied,
            followed_up,
            url,
        } => {
            let (tracker, owner) = open_tracker()?;
            let draft = if let Some(path) = file {
                read_payload(&path)?
            } else {
                let current = match tracker.get_job(&owner, id) {
                    Ok(job) => job,
                    Err(e) => fail(e),
                };
                let mut draft = draft_from_record(&current);
                if let Some(v) = position {
                    draft.position = v;
                }
                if let Some(v) = company {
                    draft.company = v;
                }
                if let Some(v) = location {
                    draft.location = v;
                }
                if let Some(v) = status {
                    draft.status = v;
                }
                if let Some(v) = work_type {
                    draft.work_type = v;
                }
                if let Some(v) = employment_type {
                    draft.employment_type = v;
                }
                if let Some(v) = source {
                    draft.job_source = v;
                }
                if let Some(v) = salary {
                    draft.salary = Some(v);
                }
                if let Some(v) = salary_asked {
                    draft.salary_asked = Some(v);
                }
                if let Some(v) = salary_range {
                    draft.salary_range = Some(v);
                }
                if let Some(v) = salary_offered {
                    draft.salary_offered = Some(v);
                }
                if let Some(v) = description {
                    draft.description = Some(v);
                }
                if let Some(v) = experience {
                    draft.experience_required = Some(v);
                }
                if let Some(v) = priority {
                    draft.priority = Some(v);
                }
                if let Some(v) = date_applied {
                    draft.date_applied = Some(v);
                }
                if followed_up {
                    draft.sent_followup_to_recruiter = true;
                }
                if let Some(v) = url {
                    draft.url_job_source = Some(v);
                }
                draft
            };
            match tracker.update_job(&owner, id, &draft) {
                Ok(job) => println!("Updated job #{} ({})", job.id, job.status),
                Err(e) => fail(e),
            }
        }

        Commands::Delete { id } => {
            let (tracker, owner) = open_tracker()?;
            match tracker.delete_job(&owner, id) {
                Ok(job) => println!("Deleted job #{}: {} at {}", job.id, job.position, job.company),
                Err(e) => fail(e),
            }
        }

        Commands::Stats => {
            let (tracker, owner) = open_tracker()?;
            match tracker.status_summary(&owner) {
                Ok(summary) => {
                    println!("{:<22} {:>6}", "STATUS", "COUNT");
                    println!("{}", "-".repeat(29));
                    let mut total = 0;
                    for status in JobStatus::ALL {
                        let count = summary.get(&status).copied().unwrap_or(0);
                        total += count;
                        println!("{:<22} {:>6}", status.as_str(), count);
                    }
                    println!("{}", "-".repeat(29));
                    println!("{:<22} {:>6}", "Total", total);
                }
                Err(TrackerError::Store(_)) => println!("No stats available."),
                Err(e) => fail(e),
            }
        }

        Commands::Chart => {
            let (tracker, owner) = open_tracker()?;
            match tracker.monthly_histogram(&owner) {
                Ok(histogram) => {
                    if histogram.is_empty() {
                        println!("No applications in the last six months.");
                    } else {
                        for entry in histogram {
                            println!(
                                "{:<8} {:>4}  {}",
                                entry.month,
                                entry.count,
                                "#".repeat(entry.count.min(60) as usize)
                            );
                        }
                    }
                }
                Err(TrackerError::Store(_)) => {
                    println!("No applications in the last six months.")
                }
                Err(e) => fail(e),
            }
        }

        Commands::Stage { command } => {
            let (tracker, owner) = open_tracker()?;
            match command {
                StageCommands::Add {
                    job_id,
                    name,
                    description,
                    status,
                    date,
                    duration,
                    notes,
                    feedback,
                } => {
                    let draft = StageDraft {
                        stage_name: name,
                        description,
                        status,
                        scheduled_date: date,
                        duration_minutes: duration,
                        interview_notes: notes,
                        feedback_notes: feedback,
                    };
                    match tracker.create_stage(&owner, job_id, &draft) {
                        Ok(stage) => println!(
                            "Added stage #{} '{}' to job #{}",
                            stage.id, stage.stage_name, stage.job_id
                        ),
                        Err(e) => fail(e),
                    }
                }

                StageCommands::List { job, json } => {
                    match tracker.list_stages(&owner, job) {
                        Ok(stages) => {
                            if json {
                                println!("{}", serde_json::to_string_pretty(&stages)?);
                            } else if stages.is_empty() {
                                println!("No interview stages found.");
                            } else {
                                print_stages_table(&stages);
                            }
                        }
                        Err(TrackerError::Store(_)) => println!("No interview stages found."),
                        Err(e) => fail(e),
                    }
                }

                StageCommands::Edit {
                    id,
                    file,
                    name,
                    description,
                    status,
                    date,
                    duration,
                    notes,
                    feedback,
                } => {
                    let draft = if let Some(path) = file {
                        read_payload(&path)?
                    } else {
                        let current = match tracker.get_stage(&owner, id) {
                            Ok(stage) => stage,
                            Err(e) => fail(e),
                        };
                        StageDraft {
                            stage_name: name.unwrap_or(current.stage_name),
                            description: description.or(current.description),
                            status: status.unwrap_or_else(|| current.status.as_str().to_string()),
                            scheduled_date: date.or(current.scheduled_date),
                            duration_minutes: duration.or(current.duration_minutes),
                            interview_notes: notes.or(current.interview_notes),
                            feedback_notes: feedback.or(current.feedback_notes),
                        }
                    };
                    match tracker.update_stage(&owner, id, &draft) {
                        Ok(stage) => println!("Updated stage #{} ({})", stage.id, stage.status),
                        Err(e) => fail(e),
                    }
                }

                StageCommands::Delete { id } => match tracker.delete_stage(&owner, id) {
                    Ok(()) => println!("Deleted stage #{}", id),
                    Err(e) => fail(e),
                },
            }
        }
    }

    Ok(())
}

/// Resolves the signed-in owner and opens the store. Every data command goes
/// through here; the owner never comes from command arguments.
fn open_tracker() -> Result<(Tracker, OwnerId)> {
    let sessions = SessionStore::open()?;
    let owner = match sessions.current() {
        Ok(owner) => owner,
        Err(e) => fail(e),
    };
    let db = Database::open()?;
    db.ensure_initialized()?;
    Ok((Tracker::new(db), owner))
}

fn read_payload<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse payload file: {}", path.display()))
}

fn draft_from_record(job: &JobRecord) -> JobDraft {
    JobDraft {
        position: job.position.clone(),
        company: job.company.clone(),
        location: job.location.clone(),
        status: job.status.as_str().to_string(),
        work_type: job.work_type.as_str().to_string(),
        employment_type: job.employment_type.as_str().to_string(),
        job_source: job.job_source.clone(),
        salary: job.salary.clone(),
        salary_asked: job.salary_asked.clone(),
        salary_range: job.salary_range.clone(),
        salary_offered: job.salary_offered.clone(),
        description: job.description.clone(),
        experience_required: job.experience_required,
        priority: job.priority.map(|p| p.as_str().to_string()),
        requirements: Some(job.requirements.clone()),
        benefits: Some(job.benefits.clone()),
        date_applied: job.date_applied,
        sent_followup_to_recruiter: job.sent_followup_to_recruiter,
        url_job_source: job.url_job_source.clone(),
    }
}

/// One object for `show --json`, so stages ride along with the job.
fn job_json(job: &JobRecord, stages: &[InterviewStageRecord]) -> serde_json::Value {
    serde_json::json!({
        "job": job,
        "interview_stages": stages,
    })
}

fn print_jobs_table(jobs: &[JobRecord]) {
    println!(
        "{:<6} {:<15} {:<28} {:<20} {:<14}",
        "ID", "STATUS", "POSITION", "COMPANY", "LOCATION"
    );
    println!("{}", "-".repeat(86));
    for job in jobs {
        println!(
            "{:<6} {:<15} {:<28} {:<20} {:<14}",
            job.id,
            job.status.as_str(),
            truncate(&job.position, 26),
            truncate(&job.company, 18),
            truncate(&job.location, 12)
        );
    }
}

fn print_job(job: &JobRecord, stages: &[InterviewStageRecord]) {
    println!("Job #{}", job.id);
    println!("Position: {}", job.position);
    println!("Company: {}", job.company);
    println!("Location: {}", job.location);
    println!("Status: {}", job.status);
    println!("Work type: {}", job.work_type);
    println!("Employment: {}", job.employment_type);
    println!("Source: {}", job.job_source);
    if let Some(url) = &job.url_job_source {
        println!("URL: {}", url);
    }
    if let Some(priority) = job.priority {
        println!("Priority: {}", priority);
    }
    if let Some(exp) = job.experience_required {
        println!("Experience required: {} years", exp);
    }
    for (label, value) in [
        ("Salary", &job.salary),
        ("Salary asked", &job.salary_asked),
        ("Salary range", &job.salary_range),
        ("Salary offered", &job.salary_offered),
    ] {
        if let Some(v) = value {
            println!("{}: {}", label, v);
        }
    }
    if let Some(date) = job.date_applied {
        println!("Date applied: {}", date);
    }
    println!(
        "Followed up with recruiter: {}",
        if job.sent_followup_to_recruiter { "yes" } else { "no" }
    );
    println!("Created: {}", job.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(desc) = &job.description {
        println!("\n{}", textwrap::fill(desc, 78));
    }
    if !job.requirements.is_empty() {
        println!("\nRequirements:");
        for item in &job.requirements {
            println!("  - {}", item);
        }
    }
    if !job.benefits.is_empty() {
        println!("\nBenefits:");
        for item in &job.benefits {
            println!("  - {}", item);
        }
    }
    if !stages.is_empty() {
        println!("\nInterview stages:");
        print_stages_table(stages);
    }
}

fn print_stages_table(stages: &[InterviewStageRecord]) {
    println!(
        "{:<6} {:<6} {:<24} {:<22} {:<17} {:>5}",
        "ID", "JOB", "STAGE", "STATUS", "SCHEDULED", "MIN"
    );
    println!("{}", "-".repeat(85));
    for stage in stages {
        let scheduled = stage
            .scheduled_date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let duration = stage
            .duration_minutes
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<6} {:<24} {:<22} {:<17} {:>5}",
            stage.id,
            stage.job_id,
            truncate(&stage.stage_name, 22),
            stage.status.as_str(),
            scheduled,
            duration
        );
    }
}

/// Renders a failure the way the UI layer expects it: short, human, and
/// without store internals. Mutating commands leave the store untouched.
fn fail(err: TrackerError) -> ! {
    match &err {
        TrackerError::Unauthorized => {
            eprintln!("Not signed in. Run 'jobtrack login <user>' first.")
        }
        TrackerError::Validation { .. } => eprintln!("{err}"),
        TrackerError::NotFound => eprintln!("Record not found."),
        TrackerError::Store(_) => eprintln!("There was an error. Please try again."),
    }
    std::process::exit(1);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
