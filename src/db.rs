use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Result, params, params_from_iter};
use std::path::PathBuf;

use crate::auth::OwnerId;
use crate::models::{
    EmploymentType, InterviewStageRecord, JobRecord, JobStatus, PriorityTier, StageStatus,
    WorkType,
};
use crate::validate::{JobFields, StageFields};

const JOB_COLUMNS: &str = "id, owner, position, company, location, status, work_type, \
     employment_type, job_source, salary, salary_asked, salary_range, salary_offered, \
     description, experience_required, priority, requirements, benefits, date_applied, \
     sent_followup, url_job_source, created_at, updated_at";

const STAGE_COLUMNS: &str = "id, owner, job_id, stage_name, description, status, \
     scheduled_date, duration_minutes, interview_notes, feedback_notes, created_at, updated_at";

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open() -> anyhow::Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        Self::configure(&conn)?;
        Ok(Self { conn, path })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> anyhow::Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
            Ok(proj_dirs.data_dir().join("jobtrack.db"))
        } else {
            Ok(PathBuf::from("jobtrack.db"))
        }
    }

    fn configure(conn: &Connection) -> Result<()> {
        // Required for the stage cascade on job deletion.
        conn.pragma_update(None, "foreign_keys", true)
    }

    pub fn init(&self) -> Result<()> {
        // jobs.status carries no CHECK constraint: validation enforces the
        // enum on writes, and reads must tolerate legacy labels already in
        // storage (the aggregation skips them).
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                position TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT NOT NULL,
                status TEXT NOT NULL,
                work_type TEXT NOT NULL,
                employment_type TEXT NOT NULL,
                job_source TEXT NOT NULL,
                salary TEXT,
                salary_asked TEXT,
                salary_range TEXT,
                salary_offered TEXT,
                description TEXT,
                experience_required INTEGER,
                priority TEXT,
                requirements TEXT NOT NULL DEFAULT '[]',
                benefits TEXT NOT NULL DEFAULT '[]',
                date_applied TEXT,
                sent_followup INTEGER NOT NULL DEFAULT 0,
                url_job_source TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS interview_stages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
                stage_name TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL,
                scheduled_date TEXT,
                duration_minutes INTEGER,
                interview_notes TEXT,
                feedback_notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_owner ON jobs(owner);
            CREATE INDEX IF NOT EXISTS idx_jobs_owner_status ON jobs(owner, status);
            CREATE INDEX IF NOT EXISTS idx_stages_owner ON interview_stages(owner);
            CREATE INDEX IF NOT EXISTS idx_stages_job ON interview_stages(job_id);
            "#,
        )
    }

    pub fn ensure_initialized(&self) -> anyhow::Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='jobs'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            anyhow::bail!("Database not initialized. Run 'jobtrack init' first.");
        }
        Ok(())
    }

    // --- Job operations (all scoped by owner) ---

    pub fn insert_job(&self, owner: &OwnerId, f: &JobFields) -> Result<JobRecord> {
        let now = now_stamp();
        self.conn.execute(
            "INSERT INTO jobs (owner, position, company, location, status, work_type, \
             employment_type, job_source, salary, salary_asked, salary_range, salary_offered, \
             description, experience_required, priority, requirements, benefits, date_applied, \
             sent_followup, url_job_source, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18, ?19, ?20, ?21, ?22)",
            params![
                owner.as_str(),
                f.position,
                f.company,
                f.location,
                f.status.as_str(),
                f.work_type.as_str(),
                f.employment_type.as_str(),
                f.job_source,
                f.salary,
                f.salary_asked,
                f.salary_range,
                f.salary_offered,
                f.description,
                f.experience_required,
                f.priority.map(|p| p.as_str()),
                json_list(&f.requirements),
                json_list(&f.benefits),
                f.date_applied.map(|d| d.to_string()),
                f.sent_followup_to_recruiter,
                f.url_job_source,
                now,
                now,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.job_by_id(owner, id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn job_by_id(&self, owner: &OwnerId, id: i64) -> Result<Option<JobRecord>> {
        let result = self.conn.query_row(
            &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1 AND owner = ?2"),
            params![id, owner.as_str()],
            Self::row_to_job,
        );
        match result {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn list_jobs(
        &self,
        owner: &OwnerId,
        search: Option<&str>,
        status: Option<&str>,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<JobRecord>> {
        let (clause, args) = job_filter(owner, search, status);
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE {clause} \
             ORDER BY created_at DESC, id DESC LIMIT {limit} OFFSET {offset}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), Self::row_to_job)?;
        rows.collect()
    }

    pub fn count_jobs(
        &self,
        owner: &OwnerId,
        search: Option<&str>,
        status: Option<&str>,
    ) -> Result<u64> {
        let (clause, args) = job_filter(owner, search, status);
        let sql = format!("SELECT COUNT(*) FROM jobs WHERE {clause}");
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(args), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn update_job(&self, owner: &OwnerId, id: i64, f: &JobFields) -> Result<Option<JobRecord>> {
        let affected = self.conn.execute(
            "UPDATE jobs SET position = ?1, company = ?2, location = ?3, status = ?4, \
             work_type = ?5, employment_type = ?6, job_source = ?7, salary = ?8, \
             salary_asked = ?9, salary_range = ?10, salary_offered = ?11, description = ?12, \
             experience_required = ?13, priority = ?14, requirements = ?15, benefits = ?16, \
             date_applied = ?17, sent_followup = ?18, url_job_source = ?19, updated_at = ?20 \
             WHERE id = ?21 AND owner = ?22",
            params![
                f.position,
                f.company,
                f.location,
                f.status.as_str(),
                f.work_type.as_str(),
                f.employment_type.as_str(),
                f.job_source,
                f.salary,
                f.salary_asked,
                f.salary_range,
                f.salary_offered,
                f.description,
                f.experience_required,
                f.priority.map(|p| p.as_str()),
                json_list(&f.requirements),
                json_list(&f.benefits),
                f.date_applied.map(|d| d.to_string()),
                f.sent_followup_to_recruiter,
                f.url_job_source,
                now_stamp(),
                id,
                owner.as_str(),
            ],
        )?;
        if affected == 0 {
            return Ok(None);
        }
        self.job_by_id(owner, id)
    }

    /// Deletes a job and, through the foreign key cascade, every interview
    /// stage under it. Returns the record as it was before deletion.
    pub fn delete_job(&self, owner: &OwnerId, id: i64) -> Result<Option<JobRecord>> {
        let Some(job) = self.job_by_id(owner, id)? else {
            return Ok(None);
        };
        self.conn.execute(
            "DELETE FROM jobs WHERE id = ?1 AND owner = ?2",
            params![id, owner.as_str()],
        )?;
        Ok(Some(job))
    }

    /// Raw per-status counts straight from the store. Labels come back as
    /// stored, so callers decide what to do with unknown ones.
    pub fn status_counts(&self, owner: &OwnerId) -> Result<Vec<(String, u64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM jobs WHERE owner = ?1 GROUP BY status")?;
        let rows = stmt.query_map([owner.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?.max(0) as u64))
        })?;
        rows.collect()
    }

    /// Creation timestamps of jobs created at or after the cutoff, ascending,
    /// ties broken by insertion order.
    pub fn created_since(&self, owner: &OwnerId, cutoff: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn.prepare(
            "SELECT created_at FROM jobs WHERE owner = ?1 AND created_at >= ?2 \
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(
            params![
                owner.as_str(),
                cutoff.to_rfc3339_opts(SecondsFormat::Millis, true)
            ],
            |row| parse_stamp(0, row.get(0)?),
        )?;
        rows.collect()
    }

    // --- Interview stage operations ---

    pub fn insert_stage(
        &self,
        owner: &OwnerId,
        job_id: i64,
        f: &StageFields,
    ) -> Result<InterviewStageRecord> {
        let now = now_stamp();
        self.conn.execute(
            "INSERT INTO interview_stages (owner, job_id, stage_name, description, status, \
             scheduled_date, duration_minutes, interview_notes, feedback_notes, created_at, \
             updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                owner.as_str(),
                job_id,
                f.stage_name,
                f.description,
                f.status.as_str(),
                f.scheduled_date
                    .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
                f.duration_minutes,
                f.interview_notes,
                f.feedback_notes,
                now,
                now,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.stage_by_id(owner, id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn stage_by_id(&self, owner: &OwnerId, id: i64) -> Result<Option<InterviewStageRecord>> {
        let result = self.conn.query_row(
            &format!("SELECT {STAGE_COLUMNS} FROM interview_stages WHERE id = ?1 AND owner = ?2"),
            params![id, owner.as_str()],
            Self::row_to_stage,
        );
        match result {
            Ok(stage) => Ok(Some(stage)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn list_stages(
        &self,
        owner: &OwnerId,
        job_id: Option<i64>,
    ) -> Result<Vec<InterviewStageRecord>> {
        let mut sql = format!("SELECT {STAGE_COLUMNS} FROM interview_stages WHERE owner = ?1");
        if job_id.is_some() {
            sql.push_str(" AND job_id = ?2");
        }
        sql.push_str(" ORDER BY scheduled_date ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if let Some(job_id) = job_id {
            stmt.query_map(params![owner.as_str(), job_id], Self::row_to_stage)?
        } else {
            stmt.query_map([owner.as_str()], Self::row_to_stage)?
        };
        rows.collect()
    }

    pub fn update_stage(
        &self,
        owner: &OwnerId,
        id: i64,
        f: &StageFields,
    ) -> Result<Option<InterviewStageRecord>> {
        let affected = self.conn.execute(
            "UPDATE interview_stages SET stage_name = ?1, description = ?2, status = ?3, \
             scheduled_date = ?4, duration_minutes = ?5, interview_notes = ?6, \
             feedback_notes = ?7, updated_at = ?8 WHERE id = ?9 AND owner = ?10",
            params![
                f.stage_name,
                f.description,
                f.status.as_str(),
                f.scheduled_date
                    .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
                f.duration_minutes,
                f.interview_notes,
                f.feedback_notes,
                now_stamp(),
                id,
                owner.as_str(),
            ],
        )?;
        if affected == 0 {
            return Ok(None);
        }
        self.stage_by_id(owner, id)
    }

    pub fn delete_stage(&self, owner: &OwnerId, id: i64) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM interview_stages WHERE id = ?1 AND owner = ?2",
            params![id, owner.as_str()],
        )?;
        Ok(affected > 0)
    }

    // --- Row mappers ---

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<JobRecord> {
        Ok(JobRecord {
            id: row.get(0)?,
            owner: row.get(1)?,
            position: row.get(2)?,
            company: row.get(3)?,
            location: row.get(4)?,
            status: parse_enum(5, row.get(5)?, JobStatus::parse)?,
            work_type: parse_enum(6, row.get(6)?, WorkType::parse)?,
            employment_type: parse_enum(7, row.get(7)?, EmploymentType::parse)?,
            job_source: row.get(8)?,
            salary: row.get(9)?,
            salary_asked: row.get(10)?,
            salary_range: row.get(11)?,
            salary_offered: row.get(12)?,
            description: row.get(13)?,
            experience_required: row.get(14)?,
            priority: match row.get::<_, Option<String>>(15)? {
                Some(raw) => Some(parse_enum(15, raw, PriorityTier::parse)?),
                None => None,
            },
            requirements: parse_list(16, row.get(16)?)?,
            benefits: parse_list(17, row.get(17)?)?,
            date_applied: match row.get::<_, Option<String>>(18)? {
                Some(raw) => Some(parse_date(18, raw)?),
                None => None,
            },
            sent_followup_to_recruiter: row.get(19)?,
            url_job_source: row.get(20)?,
            created_at: parse_stamp(21, row.get(21)?)?,
            updated_at: parse_stamp(22, row.get(22)?)?,
        })
    }

    fn row_to_stage(row: &rusqlite::Row) -> rusqlite::Result<InterviewStageRecord> {
        Ok(InterviewStageRecord {
            id: row.get(0)?,
            owner: row.get(1)?,
            job_id: row.get(2)?,
            stage_name: row.get(3)?,
            description: row.get(4)?,
            status: parse_enum(5, row.get(5)?, StageStatus::parse)?,
            scheduled_date: match row.get::<_, Option<String>>(6)? {
                Some(raw) => Some(parse_stamp(6, raw)?),
                None => None,
            },
            duration_minutes: row.get(7)?,
            interview_notes: row.get(8)?,
            feedback_notes: row.get(9)?,
            created_at: parse_stamp(10, row.get(10)?)?,
            updated_at: parse_stamp(11, row.get(11)?)?,
        })
    }
}

fn job_filter(
    owner: &OwnerId,
    search: Option<&str>,
    status: Option<&str>,
) -> (String, Vec<String>) {
    let mut clause = String::from("owner = ?1");
    let mut args = vec![owner.as_str().to_string()];

    if let Some(q) = search {
        args.push(format!("%{}%", escape_like(q)));
        let n = args.len();
        clause.push_str(&format!(
            " AND (position LIKE ?{n} ESCAPE '\\' OR company LIKE ?{n} ESCAPE '\\')"
        ));
    }

    if let Some(s) = status {
        args.push(s.to_string());
        clause.push_str(&format!(" AND status = ?{}", args.len()));
    }

    (clause, args)
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Stored timestamps are RFC 3339 UTC with a fixed precision, so TEXT
/// comparison and TEXT ordering agree with chronological order.
fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn parse_enum<T>(idx: usize, raw: String, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(&raw).ok_or_else(|| conversion_err(idx, format!("unrecognized value '{raw}'")))
}

fn parse_stamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, format!("bad timestamp '{raw}': {e}")))
}

fn parse_date(idx: usize, raw: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| conversion_err(idx, format!("bad date '{raw}': {e}")))
}

fn parse_list(idx: usize, raw: String) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&raw).map_err(|e| conversion_err(idx, format!("bad list column: {e}")))
}

fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

#[cfg(test)]
impl Database {
    /// Writes a row directly, sidestepping validation. Simulates what a
    /// rename in the status set leaves behind in an existing database.
    pub(crate) fn seed_job_with_raw_status(&self, owner: &OwnerId, status: &str) -> Result<i64> {
        let now = now_stamp();
        self.conn.execute(
            "INSERT INTO jobs (owner, position, company, location, status, work_type, \
             employment_type, job_source, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                owner.as_str(),
                "Archived Role",
                "Acme",
                "Berlin",
                status,
                "Remote",
                "Full-Time",
                "Other",
                now,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn filter_clause_grows_with_filters() {
        let owner = OwnerId::new("u1");
        let (clause, args) = job_filter(&owner, None, None);
        assert_eq!(clause, "owner = ?1");
        assert_eq!(args.len(), 1);

        let (clause, args) = job_filter(&owner, Some("acme"), Some("Applied"));
        assert!(clause.contains("position LIKE ?2"));
        assert!(clause.contains("company LIKE ?2"));
        assert!(clause.contains("status = ?3"));
        assert_eq!(args, vec!["u1".to_string(), "%acme%".to_string(), "Applied".to_string()]);
    }
}
