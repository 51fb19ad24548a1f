use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    BloodGroup, BloodRequest, Broadcast, Cohort, CohortMember, Component, Hospital, HospitalStock,
    RequestStatus, ScheduleStatus, TransfusionSchedule,
};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid stored value: {0}")]
    Decode(String),
}

/// New cohort slot at creation time
#[derive(Debug, Clone)]
pub struct NewCohortMember {
    pub donor_id: String,
    pub last_donation_date: Option<NaiveDate>,
}

/// New transfusion schedule row
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub patient_id: String,
    pub cohort_id: Uuid,
    pub cycle_number: i32,
    pub scheduled_for: DateTime<Utc>,
    pub component: Component,
    pub units: i32,
    pub assigned_donor_id: Option<String>,
    pub assigned_donor_name: Option<String>,
    pub used_emergency_backup: bool,
    /// Cohort slot to stamp with the new date, when a member was assigned
    pub member_position: Option<i16>,
}

/// PostgreSQL client for engine-owned state
///
/// Requests, broadcasts, cohorts, schedules and hospital stock live here.
/// Every write is one transaction; idempotency rests on the partial unique
/// indexes declared in the migrations, so concurrent duplicate calls surface
/// as unique violations the handlers resolve by re-fetching.
pub struct PostgresClient {
    pool: PgPool,
}

fn parse_group(raw: &str) -> Result<BloodGroup, PostgresError> {
    BloodGroup::from_wire(raw)
        .ok_or_else(|| PostgresError::Decode(format!("unknown blood group '{raw}'")))
}

fn parse_component(raw: &str) -> Result<Component, PostgresError> {
    Component::from_wire(raw)
        .ok_or_else(|| PostgresError::Decode(format!("unknown component '{raw}'")))
}

fn parse_request_status(raw: &str) -> Result<RequestStatus, PostgresError> {
    RequestStatus::from_wire(raw)
        .ok_or_else(|| PostgresError::Decode(format!("unknown request status '{raw}'")))
}

fn parse_schedule_status(raw: &str) -> Result<ScheduleStatus, PostgresError> {
    ScheduleStatus::from_wire(raw)
        .ok_or_else(|| PostgresError::Decode(format!("unknown schedule status '{raw}'")))
}

fn parse_urgency(raw: &str) -> Result<crate::models::Urgency, PostgresError> {
    match raw {
        "critical" => Ok(crate::models::Urgency::Critical),
        "high" => Ok(crate::models::Urgency::High),
        "medium" => Ok(crate::models::Urgency::Medium),
        "low" => Ok(crate::models::Urgency::Low),
        other => Err(PostgresError::Decode(format!("unknown urgency '{other}'"))),
    }
}

fn request_from_row(row: &PgRow) -> Result<BloodRequest, PostgresError> {
    Ok(BloodRequest {
        id: row.get("id"),
        patient_id: row.get("patient_id"),
        request_type: row.get("request_type"),
        blood_group: parse_group(row.get("blood_group"))?,
        component: parse_component(row.get("component"))?,
        quantity_units: row.get("quantity_units"),
        urgency: parse_urgency(row.get("urgency"))?,
        status: parse_request_status(row.get("status"))?,
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        created_at: row.get("created_at"),
    })
}

fn cohort_from_row(row: &PgRow) -> Cohort {
    Cohort {
        id: row.get("id"),
        patient_id: row.get("patient_id"),
        name: row.get("name"),
        start_date: row.get("start_date"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    }
}

fn member_from_row(row: &PgRow) -> CohortMember {
    CohortMember {
        cohort_id: row.get("cohort_id"),
        donor_id: row.get("donor_id"),
        sequence_order: row.get("sequence_order"),
        last_donation_date: row.get("last_donation_date"),
        next_scheduled_for: row.get("next_scheduled_for"),
    }
}

fn schedule_from_row(row: &PgRow) -> Result<TransfusionSchedule, PostgresError> {
    Ok(TransfusionSchedule {
        id: row.get("id"),
        patient_id: row.get("patient_id"),
        cohort_id: row.get("cohort_id"),
        cycle_number: row.get("cycle_number"),
        scheduled_for: row.get("scheduled_for"),
        status: parse_schedule_status(row.get("status"))?,
        component: parse_component(row.get("component"))?,
        units: row.get("units"),
        hospital_id: row.get("hospital_id"),
        assigned_donor_id: row.get("assigned_donor_id"),
        assigned_donor_name: row.get("assigned_donor_name"),
        used_emergency_backup: row.get("used_emergency_backup"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const SCHEDULE_COLUMNS: &str = "id, patient_id, cohort_id, cycle_number, scheduled_for, status, \
     component, units, hospital_id, assigned_donor_id, assigned_donor_name, \
     used_emergency_backup, created_at, updated_at";

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    // --- blood requests -------------------------------------------------

    pub async fn get_request(&self, id: Uuid) -> Result<Option<BloodRequest>, PostgresError> {
        let row = sqlx::query(
            r#"
            SELECT id, patient_id, request_type, blood_group, component, quantity_units,
                   urgency, status, latitude, longitude, created_at
            FROM blood_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(request_from_row).transpose()
    }

    /// Flip a pending request to broadcasted and write the broadcast record
    /// in one transaction. Returns None when the request lost its pending
    /// status in between — the caller maps that to a precondition failure.
    pub async fn record_broadcast(
        &self,
        request_id: Uuid,
        radius_km: f64,
        donors_notified: i32,
    ) -> Result<Option<Broadcast>, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE blood_requests
            SET status = 'broadcasted'
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO broadcasts (id, request_id, radius_km, donors_notified, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, request_id, radius_km, donors_notified, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request_id)
        .bind(radius_km)
        .bind(donors_notified)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(Broadcast {
            id: row.get("id"),
            request_id: row.get("request_id"),
            radius_km: row.get("radius_km"),
            donors_notified: row.get("donors_notified"),
            created_at: row.get("created_at"),
        }))
    }

    // --- cohorts --------------------------------------------------------

    /// Create a cohort and its ordered memberships in one transaction.
    ///
    /// The partial unique index on (patient_id) WHERE active turns a
    /// concurrent duplicate into a unique violation.
    pub async fn create_cohort(
        &self,
        patient_id: &str,
        name: &str,
        start_date: NaiveDate,
        members: &[NewCohortMember],
    ) -> Result<(Cohort, Vec<CohortMember>), PostgresError> {
        let mut tx = self.pool.begin().await?;

        let cohort_row = sqlx::query(
            r#"
            INSERT INTO cohorts (id, patient_id, name, start_date, active, created_at)
            VALUES ($1, $2, $3, $4, TRUE, NOW())
            RETURNING id, patient_id, name, start_date, active, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(patient_id)
        .bind(name)
        .bind(start_date)
        .fetch_one(&mut *tx)
        .await?;

        let cohort = cohort_from_row(&cohort_row);

        let mut rows = Vec::with_capacity(members.len());
        for (order, member) in members.iter().enumerate() {
            let row = sqlx::query(
                r#"
                INSERT INTO cohort_members
                    (cohort_id, donor_id, sequence_order, last_donation_date, next_scheduled_for)
                VALUES ($1, $2, $3, $4, NULL)
                RETURNING cohort_id, donor_id, sequence_order, last_donation_date, next_scheduled_for
                "#,
            )
            .bind(cohort.id)
            .bind(&member.donor_id)
            .bind(order as i16)
            .bind(member.last_donation_date)
            .fetch_one(&mut *tx)
            .await?;

            rows.push(member_from_row(&row));
        }

        tx.commit().await?;

        tracing::info!(
            "Created cohort {} for patient {} with {} members",
            cohort.id,
            patient_id,
            rows.len()
        );

        Ok((cohort, rows))
    }

    pub async fn get_active_cohort(
        &self,
        patient_id: &str,
    ) -> Result<Option<Cohort>, PostgresError> {
        let row = sqlx::query(
            r#"
            SELECT id, patient_id, name, start_date, active, created_at
            FROM cohorts
            WHERE patient_id = $1 AND active
            "#,
        )
        .bind(patient_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(cohort_from_row))
    }

    pub async fn get_cohort_members(
        &self,
        cohort_id: Uuid,
    ) -> Result<Vec<CohortMember>, PostgresError> {
        let rows = sqlx::query(
            r#"
            SELECT cohort_id, donor_id, sequence_order, last_donation_date, next_scheduled_for
            FROM cohort_members
            WHERE cohort_id = $1
            ORDER BY sequence_order
            "#,
        )
        .bind(cohort_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    // --- transfusion schedules -----------------------------------------

    /// Current planned or booked row for a patient, if any
    pub async fn current_open_schedule(
        &self,
        patient_id: &str,
    ) -> Result<Option<TransfusionSchedule>, PostgresError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {SCHEDULE_COLUMNS}
            FROM transfusion_schedules
            WHERE patient_id = $1 AND status IN ('planned', 'booked')
            ORDER BY cycle_number DESC
            LIMIT 1
            "#
        ))
        .bind(patient_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(schedule_from_row).transpose()
    }

    /// Highest cycle planned so far plus its scheduled time
    pub async fn last_cycle(
        &self,
        patient_id: &str,
    ) -> Result<Option<(i32, Option<DateTime<Utc>>)>, PostgresError> {
        let row = sqlx::query(
            r#"
            SELECT cycle_number, scheduled_for
            FROM transfusion_schedules
            WHERE patient_id = $1
            ORDER BY cycle_number DESC
            LIMIT 1
            "#,
        )
        .bind(patient_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (r.get("cycle_number"), r.get("scheduled_for"))))
    }

    /// Insert a planned schedule row, stamping the assigned cohort slot in
    /// the same transaction. A concurrent plan for the same patient hits the
    /// open-schedule partial unique index.
    pub async fn insert_schedule(
        &self,
        new: &NewSchedule,
    ) -> Result<TransfusionSchedule, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO transfusion_schedules
                (id, patient_id, cohort_id, cycle_number, scheduled_for, status, component,
                 units, hospital_id, assigned_donor_id, assigned_donor_name,
                 used_emergency_backup, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'planned', $6, $7, NULL, $8, $9, $10, NOW(), NOW())
            RETURNING {SCHEDULE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.patient_id)
        .bind(new.cohort_id)
        .bind(new.cycle_number)
        .bind(new.scheduled_for)
        .bind(new.component.as_str())
        .bind(new.units)
        .bind(&new.assigned_donor_id)
        .bind(&new.assigned_donor_name)
        .bind(new.used_emergency_backup)
        .fetch_one(&mut *tx)
        .await?;

        let schedule = schedule_from_row(&row)?;

        if let Some(position) = new.member_position {
            sqlx::query(
                r#"
                UPDATE cohort_members
                SET next_scheduled_for = $1
                WHERE cohort_id = $2 AND sequence_order = $3
                "#,
            )
            .bind(new.scheduled_for)
            .bind(new.cohort_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Planned cycle {} for patient {} on {} (backup: {})",
            schedule.cycle_number,
            schedule.patient_id,
            new.scheduled_for,
            schedule.used_emergency_backup
        );

        Ok(schedule)
    }

    pub async fn get_schedule(
        &self,
        id: Uuid,
    ) -> Result<Option<TransfusionSchedule>, PostgresError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {SCHEDULE_COLUMNS}
            FROM transfusion_schedules
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(schedule_from_row).transpose()
    }

    /// Guarded booking transition: only a planned row may be booked.
    /// Returns None when the guard did not match.
    pub async fn book_schedule(
        &self,
        schedule_id: Uuid,
        hospital_id: Uuid,
        scheduled_for: DateTime<Utc>,
    ) -> Result<Option<TransfusionSchedule>, PostgresError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE transfusion_schedules
            SET status = 'booked', hospital_id = $2, scheduled_for = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'planned'
            RETURNING {SCHEDULE_COLUMNS}
            "#
        ))
        .bind(schedule_id)
        .bind(hospital_id)
        .bind(scheduled_for)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(schedule_from_row).transpose()
    }

    /// Guarded completion transition hook for the external confirmation
    /// event: only a booked row may complete.
    pub async fn complete_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Option<TransfusionSchedule>, PostgresError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE transfusion_schedules
            SET status = 'completed', updated_at = NOW()
            WHERE id = $1 AND status = 'booked'
            RETURNING {SCHEDULE_COLUMNS}
            "#
        ))
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(schedule_from_row).transpose()
    }

    /// All schedule rows for a patient, newest first, with hospital names
    pub async fn list_schedules(
        &self,
        patient_id: &str,
    ) -> Result<Vec<(TransfusionSchedule, Option<String>)>, PostgresError> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.patient_id, s.cohort_id, s.cycle_number, s.scheduled_for, s.status,
                   s.component, s.units, s.hospital_id, s.assigned_donor_id,
                   s.assigned_donor_name, s.used_emergency_backup, s.created_at, s.updated_at,
                   h.name AS hospital_name
            FROM transfusion_schedules s
            LEFT JOIN hospitals h ON h.id = s.hospital_id
            WHERE s.patient_id = $1
            ORDER BY s.scheduled_for DESC NULLS LAST
            "#,
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((schedule_from_row(row)?, row.get("hospital_name"))))
            .collect()
    }

    /// Completed transfusions, newest first
    pub async fn list_history(
        &self,
        patient_id: &str,
        limit: i64,
    ) -> Result<Vec<(TransfusionSchedule, Option<String>)>, PostgresError> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.patient_id, s.cohort_id, s.cycle_number, s.scheduled_for, s.status,
                   s.component, s.units, s.hospital_id, s.assigned_donor_id,
                   s.assigned_donor_name, s.used_emergency_backup, s.created_at, s.updated_at,
                   h.name AS hospital_name
            FROM transfusion_schedules s
            LEFT JOIN hospitals h ON h.id = s.hospital_id
            WHERE s.patient_id = $1 AND s.status = 'completed'
            ORDER BY s.scheduled_for DESC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(patient_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((schedule_from_row(row)?, row.get("hospital_name"))))
            .collect()
    }

    // --- hospitals ------------------------------------------------------

    /// All hospitals with their stock lines
    pub async fn list_hospitals(&self) -> Result<Vec<Hospital>, PostgresError> {
        let hospital_rows = sqlx::query(
            r#"
            SELECT id, name, address, contact, verified, latitude, longitude
            FROM hospitals
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let stock_rows = sqlx::query(
            r#"
            SELECT hospital_id, component, blood_group, units, freshness_days
            FROM hospital_stock
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stock_by_hospital: HashMap<Uuid, Vec<HospitalStock>> = HashMap::new();
        for row in &stock_rows {
            let hospital_id: Uuid = row.get("hospital_id");
            stock_by_hospital
                .entry(hospital_id)
                .or_default()
                .push(HospitalStock {
                    component: parse_component(row.get("component"))?,
                    blood_group: parse_group(row.get("blood_group"))?,
                    units: row.get("units"),
                    freshness_days: row.get("freshness_days"),
                });
        }

        Ok(hospital_rows
            .iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                Hospital {
                    id,
                    name: row.get("name"),
                    address: row.get("address"),
                    contact: row.get("contact"),
                    verified: row.get("verified"),
                    latitude: row.get("latitude"),
                    longitude: row.get("longitude"),
                    stock: stock_by_hospital.remove(&id).unwrap_or_default(),
                }
            })
            .collect())
    }

    pub async fn get_hospital(&self, id: Uuid) -> Result<Option<Hospital>, PostgresError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, address, contact, verified, latitude, longitude
            FROM hospitals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Hospital {
            id: row.get("id"),
            name: row.get("name"),
            address: row.get("address"),
            contact: row.get("contact"),
            verified: row.get("verified"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            stock: Vec::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips() {
        assert!(matches!(parse_group("A+"), Ok(BloodGroup::APos)));
        assert!(parse_group("Z+").is_err());
        assert!(matches!(
            parse_schedule_status("planned"),
            Ok(ScheduleStatus::Planned)
        ));
        assert!(parse_schedule_status("Planned").is_err());
        assert!(matches!(
            parse_component("red_cells"),
            Ok(Component::RedCells)
        ));
    }
}
