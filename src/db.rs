use anyhow::Context;
use serde::Deserialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{EnrollmentRecord, OutreachRequest};
use crate::risk::Notifier;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let section_id = "BIO-201-F26";
    upsert_section(pool, section_id, "BIO-201", "Fall 2026").await?;

    let roster = vec![
        ("Avery Lee", "avery.lee@university.edu", Some(95.0)),
        ("Jules Moreno", "jules.moreno@university.edu", Some(58.0)),
        ("Kiara Patel", "kiara.patel@university.edu", Some(88.0)),
        ("Noah Okafor", "noah.okafor@university.edu", Some(72.0)),
        ("Mina Sato", "mina.sato@university.edu", Some(45.0)),
        ("Lucas Ferreira", "lucas.ferreira@university.edu", Some(65.0)),
        ("Hana Kim", "hana.kim@university.edu", Some(81.5)),
        ("Omar Haddad", "omar.haddad@university.edu", Some(0.0)),
        ("Sofia Rossi", "sofia.rossi@university.edu", None),
        ("Ethan Brooks", "ethan.brooks@university.edu", Some(77.0)),
    ];

    let mut inserted = 0usize;
    for (name, email, grade) in roster {
        let student_id = upsert_student(pool, name, email).await?;
        inserted += upsert_enrollment(pool, student_id, section_id, grade).await?;
    }

    Ok(inserted)
}

async fn upsert_section(
    pool: &PgPool,
    section_id: &str,
    course_code: &str,
    term: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO section_grade_analytics.sections (id, course_code, term)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE
        SET course_code = EXCLUDED.course_code, term = EXCLUDED.term
        "#,
    )
    .bind(section_id)
    .bind(course_code)
    .bind(term)
    .execute(pool)
    .await?;
    Ok(())
}

async fn upsert_student(pool: &PgPool, display_name: &str, email: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO section_grade_analytics.students (id, display_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET display_name = EXCLUDED.display_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(display_name)
    .bind(email)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn upsert_enrollment(
    pool: &PgPool,
    student_id: Uuid,
    section_id: &str,
    final_grade: Option<f64>,
) -> anyhow::Result<usize> {
    let result = sqlx::query(
        r#"
        INSERT INTO section_grade_analytics.enrollments
        (id, student_id, section_id, final_grade)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, section_id) DO UPDATE
        SET final_grade = EXCLUDED.final_grade
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(section_id)
    .bind(final_grade)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() as usize)
}

/// Enrollments for one section, or `None` when the section is unknown.
pub async fn fetch_enrollments(
    pool: &PgPool,
    section_id: &str,
) -> anyhow::Result<Option<Vec<EnrollmentRecord>>> {
    let found: bool = sqlx::query(
        "SELECT EXISTS (SELECT 1 FROM section_grade_analytics.sections WHERE id = $1) AS found",
    )
    .bind(section_id)
    .fetch_one(pool)
    .await?
    .get("found");

    if !found {
        return Ok(None);
    }

    let rows = sqlx::query(
        r#"
        SELECT st.id::text AS student_id, st.display_name, e.final_grade, e.section_id
        FROM section_grade_analytics.enrollments e
        JOIN section_grade_analytics.students st ON st.id = e.student_id
        WHERE e.section_id = $1
        ORDER BY e.enrolled_at, st.display_name
        "#,
    )
    .bind(section_id)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(EnrollmentRecord {
            student_id: row.get("student_id"),
            student_display_name: row.get("display_name"),
            final_grade: row.get("final_grade"),
            section_id: row.get("section_id"),
        });
    }

    Ok(Some(records))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RosterRow {
    pub section_id: String,
    pub course_code: String,
    pub term: String,
    pub display_name: String,
    pub email: String,
    pub final_grade: Option<f64>,
}

pub fn read_roster_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<RosterRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<RosterRow>().enumerate() {
        // header is line 1
        let row = result.with_context(|| format!("invalid roster row at line {}", line + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let rows = read_roster_csv(csv_path)?;
    let mut imported = 0usize;

    for row in rows {
        upsert_section(pool, &row.section_id, &row.course_code, &row.term).await?;
        let student_id = upsert_student(pool, &row.display_name, &row.email).await?;
        imported += upsert_enrollment(pool, student_id, &row.section_id, row.final_grade).await?;
    }

    Ok(imported)
}

/// Queues outreach rows for the delivery service to pick up.
pub struct OutreachQueue<'a> {
    pool: &'a PgPool,
}

impl<'a> OutreachQueue<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl Notifier for OutreachQueue<'_> {
    async fn notify(&self, request: &OutreachRequest) -> anyhow::Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut queued = 0usize;

        for student_id in &request.student_ids {
            let result = sqlx::query(
                r#"
                INSERT INTO section_grade_analytics.outreach_notifications
                (id, section_id, student_id, message_template)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&request.section_id)
            .bind(student_id)
            .bind(&request.message_template)
            .execute(&mut *tx)
            .await?;
            queued += result.rows_affected() as usize;
        }

        tx.commit().await.context("failed to queue outreach")?;
        Ok(queued)
    }
}
