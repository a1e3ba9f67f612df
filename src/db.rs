use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection};
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::models::{Company, Job, JobPage, JobQuery, NewJob};

// Write/lookup contract the merger relies on.
// `create_*` reports a uniqueness violation as `StoreError::Conflict`.
pub trait Catalog {
    fn find_company_by_name(&self, name: &str) -> StoreResult<Option<Company>>;
    fn create_company(&self, name: &str) -> StoreResult<Company>;
    fn find_job_by_link(&self, link: &str) -> StoreResult<Option<Job>>;
    fn create_job(&self, job: &NewJob) -> StoreResult<Job>;
}

const JOB_COLUMNS: &str = "j.id, j.company_id, c.name, j.title, j.location, j.experience_level,
     j.education, j.employment_type, j.deadline, j.link, j.sector, j.salary,
     j.posted_at, j.views";

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open catalog at {}", path.display()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        // XDG data directory, or the working directory if there is no home
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobboard") {
            proj_dirs.data_dir().join("jobboard.db")
        } else {
            PathBuf::from("jobboard.db")
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
                industry TEXT,
                location TEXT,
                size INTEGER,
                description TEXT,
                website TEXT
            );

            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_id INTEGER NOT NULL REFERENCES companies(id),
                title TEXT NOT NULL,
                location TEXT NOT NULL DEFAULT '',
                experience_level TEXT NOT NULL DEFAULT '',
                education TEXT NOT NULL DEFAULT '',
                employment_type TEXT NOT NULL DEFAULT '',
                deadline TEXT NOT NULL DEFAULT '',
                link TEXT NOT NULL UNIQUE,
                sector TEXT NOT NULL DEFAULT '',
                salary TEXT NOT NULL DEFAULT '',
                posted_at TEXT NOT NULL,
                views INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(company_id);
            CREATE INDEX IF NOT EXISTS idx_jobs_posted_at ON jobs(posted_at);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('jobs', 'companies')",
            [],
            |row| row.get(0),
        )?;
        if tables < 2 {
            return Err(anyhow!(
                "Catalog not initialized. Run 'jobboard init' first."
            ));
        }
        Ok(())
    }

    // --- Company read path ---

    pub fn list_companies(&self) -> Result<Vec<Company>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, industry, location, size, description, website
             FROM companies ORDER BY name",
        )?;
        let rows = stmt.query_map([], Self::row_to_company)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list companies")
    }

    fn row_to_company(row: &rusqlite::Row) -> rusqlite::Result<Company> {
        Ok(Company {
            id: row.get(0)?,
            name: row.get(1)?,
            industry: row.get(2)?,
            location: row.get(3)?,
            size: row.get(4)?,
            description: row.get(5)?,
            website: row.get(6)?,
        })
    }

    // --- Job read path ---

    pub fn list_jobs(&self, query: &JobQuery) -> Result<JobPage> {
        let page = query.page.max(1);
        let limit = query.limit.max(1);

        let mut filter = String::from(" WHERE 1=1");
        let mut params: Vec<String> = vec![];

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            filter.push_str(&format!(
                " AND j.title LIKE '%' || ?{} || '%' ESCAPE '\\'",
                params.len() + 1
            ));
            params.push(escape_like(search));
        }

        if let Some(location) = &query.location {
            filter.push_str(&format!(" AND j.location = ?{}", params.len() + 1));
            params.push(location.clone());
        }

        if let Some(experience) = &query.experience_level {
            filter.push_str(&format!(" AND j.experience_level = ?{}", params.len() + 1));
            params.push(experience.clone());
        }

        let total_items: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM jobs j{}", filter),
            params_from_iter(params.iter()),
            |row| row.get(0),
        )?;

        let offset = (u64::from(page) - 1) * u64::from(limit);
        let sql = format!(
            "SELECT {} FROM jobs j
             LEFT JOIN companies c ON j.company_id = c.id{}
             ORDER BY j.posted_at DESC, j.id DESC
             LIMIT {} OFFSET {}",
            JOB_COLUMNS, filter, limit, offset
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params_from_iter(params.iter()), Self::row_to_job)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list jobs")?;

        let total_items = total_items as u64;
        Ok(JobPage {
            jobs,
            current_page: page,
            total_pages: total_items.div_ceil(u64::from(limit)) as u32,
            total_items,
        })
    }

    pub fn list_jobs_for_company(&self, company_id: i64) -> Result<Vec<Job>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM jobs j
             LEFT JOIN companies c ON j.company_id = c.id
             WHERE j.company_id = ?1
             ORDER BY j.posted_at DESC, j.id DESC",
            JOB_COLUMNS
        ))?;
        let rows = stmt.query_map([company_id], Self::row_to_job)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list company jobs")
    }

    pub fn get_job(&self, id: i64) -> Result<Option<Job>> {
        let result = self.conn.query_row(
            &format!(
                "SELECT {} FROM jobs j
                 LEFT JOIN companies c ON j.company_id = c.id
                 WHERE j.id = ?1",
                JOB_COLUMNS
            ),
            [id],
            Self::row_to_job,
        );
        match result {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // Detail read: bumps the view counter, then returns the job.
    pub fn view_job(&self, id: i64) -> Result<Option<Job>> {
        let updated = self
            .conn
            .execute("UPDATE jobs SET views = views + 1 WHERE id = ?1", [id])?;
        if updated == 0 {
            return Ok(None);
        }
        self.get_job(id)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        Ok(Job {
            id: row.get(0)?,
            company_id: row.get(1)?,
            company_name: row.get(2)?,
            title: row.get(3)?,
            location: row.get(4)?,
            experience_level: row.get(5)?,
            education: row.get(6)?,
            employment_type: row.get(7)?,
            deadline: row.get(8)?,
            link: row.get(9)?,
            sector: row.get(10)?,
            salary: row.get(11)?,
            posted_at: row.get(12)?,
            views: row.get(13)?,
        })
    }
}

impl Catalog for Database {
    fn find_company_by_name(&self, name: &str) -> StoreResult<Option<Company>> {
        let result = self.conn.query_row(
            "SELECT id, name, industry, location, size, description, website
             FROM companies WHERE name = ?1",
            [name],
            Self::row_to_company,
        );
        match result {
            Ok(company) => Ok(Some(company)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create_company(&self, name: &str) -> StoreResult<Company> {
        self.conn
            .execute("INSERT INTO companies (name) VALUES (?1)", [name])
            .map_err(|e| unique_conflict(e, "company", name))?;
        Ok(Company {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            industry: None,
            location: None,
            size: None,
            description: None,
            website: None,
        })
    }

    fn find_job_by_link(&self, link: &str) -> StoreResult<Option<Job>> {
        let result = self.conn.query_row(
            &format!(
                "SELECT {} FROM jobs j
                 LEFT JOIN companies c ON j.company_id = c.id
                 WHERE j.link = ?1",
                JOB_COLUMNS
            ),
            [link],
            Self::row_to_job,
        );
        match result {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create_job(&self, job: &NewJob) -> StoreResult<Job> {
        let posted_at = Utc::now();
        self.conn
            .execute(
                "INSERT INTO jobs (company_id, title, location, experience_level, education,
                                   employment_type, deadline, link, sector, salary, posted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    job.company_id,
                    job.title,
                    job.location,
                    job.experience_level,
                    job.education,
                    job.employment_type,
                    job.deadline,
                    job.link,
                    job.sector,
                    job.salary,
                    posted_at,
                ],
            )
            .map_err(|e| unique_conflict(e, "job", &job.link))?;

        let id = self.conn.last_insert_rowid();
        let company_name: Option<String> = self.conn.query_row(
            "SELECT name FROM companies WHERE id = ?1",
            [job.company_id],
            |row| row.get(0),
        )?;

        Ok(Job {
            id,
            company_id: job.company_id,
            company_name,
            title: job.title.clone(),
            location: job.location.clone(),
            experience_level: job.experience_level.clone(),
            education: job.education.clone(),
            employment_type: job.employment_type.clone(),
            deadline: job.deadline.clone(),
            link: job.link.clone(),
            sector: job.sector.clone(),
            salary: job.salary.clone(),
            posted_at,
            views: 0,
        })
    }
}

fn unique_conflict(err: rusqlite::Error, entity: &'static str, key: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::Conflict {
                entity,
                key: key.to_string(),
            }
        }
        _ => StoreError::Sqlite(err),
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
