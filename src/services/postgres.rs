use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{
    AuxiliaryAttributes, CandidateBatch, CandidateRecord, FeedbackCounts, FeedbackPolarity, Grade, Institution,
    Requirement, SalaryQuartiles, YearlyEarnings,
};
use crate::services::{
    AuxiliaryDataStore, AuxiliarySource, CatalogProvider, ContextFilter, FeedbackStore, StoreError,
};

/// Shared PostgreSQL connection pool for the catalog, outcome and feedback tables
#[derive(Clone)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout_secs: u64,
        idle_timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(idle_timeout_secs))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            acquire_timeout_secs.unwrap_or(5),
            idle_timeout_secs.unwrap_or(600),
        )
        .await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn catalog(&self) -> PostgresCatalog {
        PostgresCatalog {
            pool: self.pool.clone(),
        }
    }

    pub fn feedback(&self) -> PostgresFeedbackStore {
        PostgresFeedbackStore {
            pool: self.pool.clone(),
        }
    }

    pub fn auxiliary(&self, source: AuxiliarySource) -> PostgresAuxiliaryStore {
        PostgresAuxiliaryStore {
            pool: self.pool.clone(),
            source,
        }
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn opt_u32(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

fn count(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let value: i64 = row.try_get(column)?;
    Ok(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Course catalog pre-joined with institution attributes
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    async fn fetch_requirements(
        &self,
        course_ids: &[String],
    ) -> Result<HashMap<String, Vec<Requirement>>, StoreError> {
        let query = r#"
            SELECT course_id, subject, min_grade
            FROM course_requirements
            WHERE course_id = ANY($1)
        "#;

        let rows = sqlx::query(query)
            .bind(course_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut requirements: HashMap<String, Vec<Requirement>> = HashMap::new();
        for row in &rows {
            let course_id: String = row.try_get("course_id")?;
            let subject: String = row.try_get("subject")?;
            let raw_grade: String = row.try_get("min_grade")?;

            match raw_grade.parse::<Grade>() {
                Ok(min_grade) => requirements
                    .entry(course_id)
                    .or_default()
                    .push(Requirement { subject, min_grade }),
                Err(e) => {
                    tracing::warn!(course_id = %course_id, error = %e, "Skipping requirement with unreadable grade");
                }
            }
        }

        Ok(requirements)
    }
}

#[async_trait]
impl CatalogProvider for PostgresCatalog {
    async fn fetch_candidates(&self, limit: usize) -> Result<CandidateBatch, StoreError> {
        let query = r#"
            SELECT
                c.course_id, c.title, c.subject_area, c.qualification,
                c.annual_cost, c.employability, c.subject_rank, c.median_salary,
                i.institution_id, i.name AS institution_name, i.region,
                i.rank AS institution_rank, i.employability AS institution_employability,
                i.student_count
            FROM courses c
            JOIN institutions i ON i.institution_id = c.institution_id
            WHERE c.is_active
            LIMIT $1
        "#;

        let rows = sqlx::query(query)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(CandidateRecord {
                id: row.try_get("course_id")?,
                title: row.try_get("title")?,
                subject_area: row.try_get("subject_area")?,
                qualification: row.try_get("qualification")?,
                institution: Institution {
                    id: row.try_get("institution_id")?,
                    name: row.try_get("institution_name")?,
                    region: row.try_get("region")?,
                    rank: opt_u32(row.try_get("institution_rank")?),
                    employability: row.try_get("institution_employability")?,
                    student_count: opt_u32(row.try_get("student_count")?),
                },
                requirements: Vec::new(),
                annual_cost: row.try_get("annual_cost")?,
                employability: row.try_get("employability")?,
                subject_rank: opt_u32(row.try_get("subject_rank")?),
                median_salary: row.try_get("median_salary")?,
                auxiliary: None,
            });
        }

        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let mut requirements = self.fetch_requirements(&ids).await?;
        for record in &mut records {
            if let Some(reqs) = requirements.remove(&record.id) {
                record.requirements = reqs;
            }
        }

        tracing::debug!("Fetched {} candidate courses", records.len());

        Ok(records.into())
    }
}

/// One outcome dataset, resolved with a single `ANY($1)` query per batch
#[derive(Clone)]
pub struct PostgresAuxiliaryStore {
    pool: PgPool,
    source: AuxiliarySource,
}

#[async_trait]
impl AuxiliaryDataStore for PostgresAuxiliaryStore {
    fn source(&self) -> AuxiliarySource {
        self.source
    }

    async fn batch_resolve(
        &self,
        course_ids: &[String],
    ) -> Result<HashMap<String, AuxiliaryAttributes>, StoreError> {
        let query = match self.source {
            AuxiliarySource::Employment => {
                r#"
                SELECT course_id, employment_rate
                FROM course_employment
                WHERE course_id = ANY($1)
                "#
            }
            AuxiliarySource::Salary => {
                r#"
                SELECT course_id, salary_lower, salary_median, salary_upper
                FROM course_salaries
                WHERE course_id = ANY($1)
                "#
            }
            AuxiliarySource::Earnings => {
                r#"
                SELECT course_id, years_after_graduation, median_earnings
                FROM course_earnings
                WHERE course_id = ANY($1)
                ORDER BY course_id, years_after_graduation
                "#
            }
            AuxiliarySource::JobDestinations => {
                r#"
                SELECT course_id, job_title
                FROM course_job_destinations
                WHERE course_id = ANY($1)
                ORDER BY course_id, share DESC
                "#
            }
        };

        let rows = sqlx::query(query)
            .bind(course_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut resolved: HashMap<String, AuxiliaryAttributes> = HashMap::new();
        for row in &rows {
            let course_id: String = row.try_get("course_id")?;
            let attrs = resolved.entry(course_id).or_default();

            match self.source {
                AuxiliarySource::Employment => {
                    attrs.employment_rate = row.try_get("employment_rate")?;
                }
                AuxiliarySource::Salary => {
                    let salary = SalaryQuartiles {
                        lower: row.try_get("salary_lower")?,
                        median: row.try_get("salary_median")?,
                        upper: row.try_get("salary_upper")?,
                    };
                    if salary.lower.is_some() || salary.median.is_some() || salary.upper.is_some() {
                        attrs.salary = Some(salary);
                    }
                }
                AuxiliarySource::Earnings => {
                    let years: i16 = row.try_get("years_after_graduation")?;
                    let median: Option<f64> = row.try_get("median_earnings")?;
                    if let (Ok(years), Some(median)) = (u8::try_from(years), median) {
                        attrs.earnings.push(YearlyEarnings {
                            years_after_graduation: years,
                            median,
                        });
                    }
                }
                AuxiliarySource::JobDestinations => {
                    let job: String = row.try_get("job_title")?;
                    attrs.job_destinations.push(job);
                }
            }
        }

        resolved.retain(|_, attrs| !attrs.is_empty());
        Ok(resolved)
    }
}

/// Aggregates over the append-only `course_feedback` table
#[derive(Clone)]
pub struct PostgresFeedbackStore {
    pool: PgPool,
}

impl PostgresFeedbackStore {
    fn collect_counts(rows: &[PgRow]) -> Result<HashMap<String, FeedbackCounts>, StoreError> {
        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let course_id: String = row.try_get("course_id")?;
            counts.insert(
                course_id,
                FeedbackCounts::new(count(row, "approvals")?, count(row, "rejections")?),
            );
        }
        Ok(counts)
    }
}

#[async_trait]
impl FeedbackStore for PostgresFeedbackStore {
    async fn aggregate_own(
        &self,
        requester_id: &str,
        course_ids: &[String],
    ) -> Result<HashMap<String, FeedbackCounts>, StoreError> {
        let query = r#"
            SELECT
                course_id,
                COUNT(*) FILTER (WHERE polarity::text = $3) AS approvals,
                COUNT(*) FILTER (WHERE polarity::text = $4) AS rejections
            FROM course_feedback
            WHERE requester_id = $1 AND course_id = ANY($2)
            GROUP BY course_id
        "#;

        let rows = sqlx::query(query)
            .bind(requester_id)
            .bind(course_ids)
            .bind(FeedbackPolarity::Approve.as_str())
            .bind(FeedbackPolarity::Reject.as_str())
            .fetch_all(&self.pool)
            .await?;

        Self::collect_counts(&rows)
    }

    async fn aggregate_similar(
        &self,
        course_ids: &[String],
        requester_id: &str,
        filter: &ContextFilter,
    ) -> Result<HashMap<String, FeedbackCounts>, StoreError> {
        let interests: Vec<String> = filter
            .career_interests
            .iter()
            .map(|i| i.trim().to_lowercase())
            .collect();

        let query = r#"
            SELECT
                course_id,
                COUNT(*) FILTER (WHERE polarity::text = $4) AS approvals,
                COUNT(*) FILTER (WHERE polarity::text = $5) AS rejections
            FROM course_feedback
            WHERE requester_id <> $1
              AND course_id = ANY($2)
              AND EXISTS (
                  SELECT 1
                  FROM jsonb_array_elements_text(COALESCE(context -> 'careerInterests', '[]'::jsonb)) AS ci(interest)
                  WHERE lower(ci.interest) = ANY($3)
              )
            GROUP BY course_id
        "#;

        let rows = sqlx::query(query)
            .bind(requester_id)
            .bind(course_ids)
            .bind(&interests)
            .bind(FeedbackPolarity::Approve.as_str())
            .bind(FeedbackPolarity::Reject.as_str())
            .fetch_all(&self.pool)
            .await?;

        Self::collect_counts(&rows)
    }
}
