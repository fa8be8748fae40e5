//! Evidence ledger: append-only observations about businesses.
//!
//! Nothing in this module updates or deletes an observation. Corrections are
//! new observations; readers decide which one wins.

use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use super::models::{CountRow, LastInsertRowId, NewObservationRecord, ObservationRecord};
use super::pool::{DbPool, DieselError};
use super::util::format_datetime;
use super::{parse_datetime, StoreError};
use crate::models::{NewObservation, Observation, ObservationField, ESTIMATE_SOURCE_PREFIX};
use crate::schema::observations;
use crate::with_conn;

impl From<ObservationRecord> for Observation {
    fn from(record: ObservationRecord) -> Self {
        Observation {
            id: record.id,
            business_id: record.business_id,
            source_url: record.source_url,
            field: ObservationField::from(record.field.as_str()),
            value: record.value,
            confidence: record.confidence,
            observed_at: parse_datetime(&record.observed_at),
            http_status: record.http_status,
            error: record.error,
        }
    }
}

/// Diesel-based evidence ledger.
#[derive(Clone)]
pub struct DieselEvidenceRepository {
    pool: DbPool,
}

impl DieselEvidenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append one observation and return its id.
    pub async fn record_observation(
        &self,
        business_id: &str,
        source_url: &str,
        field: ObservationField,
        value: Option<&str>,
        confidence: f64,
    ) -> Result<i64, StoreError> {
        self.record(&NewObservation::new(
            business_id,
            source_url,
            field,
            value.map(str::to_string),
            confidence,
        ))
        .await
    }

    /// Append an observation, including fetch status and error text.
    ///
    /// Confidence outside `[0, 1]` (or NaN) is rejected before touching the
    /// database.
    pub async fn record(&self, observation: &NewObservation) -> Result<i64, StoreError> {
        if !(0.0..=1.0).contains(&observation.confidence) {
            return Err(StoreError::InvalidConfidence(observation.confidence));
        }

        let observed_at = format_datetime(&observation.observed_at);

        let mut conn = self.pool.get().await?;
        let id = conn
            .transaction::<_, DieselError, _>(|conn| {
                Box::pin(async move {
                    diesel::insert_into(observations::table)
                        .values(NewObservationRecord {
                            business_id: &observation.business_id,
                            source_url: &observation.source_url,
                            field: observation.field.as_str(),
                            value: observation.value.as_deref(),
                            confidence: observation.confidence,
                            observed_at: &observed_at,
                            http_status: observation.http_status,
                            error: observation.error.as_deref(),
                        })
                        .execute(conn)
                        .await?;
                    let row: LastInsertRowId = diesel::sql_query("SELECT last_insert_rowid()")
                        .get_result(conn)
                        .await?;
                    Ok(row.id)
                })
            })
            .await?;

        debug!(
            business_id = %observation.business_id,
            "Recorded {} from {} (id {})",
            observation.field,
            observation.source_url,
            id
        );
        Ok(id)
    }

    /// Observations for a business, optionally for one field, oldest first.
    pub async fn get_observations(
        &self,
        business_id: &str,
        field: Option<&ObservationField>,
    ) -> Result<Vec<Observation>, DieselError> {
        let field = field.map(|f| f.as_str().to_string());

        with_conn!(self.pool, conn, {
            let mut query = observations::table
                .filter(observations::business_id.eq(business_id))
                .order((observations::observed_at.asc(), observations::id.asc()))
                .select(ObservationRecord::as_select())
                .into_boxed();

            if let Some(ref field) = field {
                query = query.filter(observations::field.eq(field));
            }

            query
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(Observation::from).collect())
        })
    }

    /// Number of distinct sources that reported a non-blank value for a field.
    /// Estimate rows are derived, not sources, and are not counted.
    pub async fn count_independent_sources(
        &self,
        business_id: &str,
        field: &ObservationField,
    ) -> Result<i64, DieselError> {
        with_conn!(self.pool, conn, {
            let row: CountRow = diesel::sql_query(
                "SELECT COUNT(DISTINCT source_url) AS count FROM observations \
                 WHERE business_id = ? AND field = ? \
                 AND value IS NOT NULL AND TRIM(value, char(32, 9, 10, 11, 12, 13)) <> '' \
                 AND substr(source_url, 1, ?) <> ?",
            )
            .bind::<Text, _>(business_id)
            .bind::<Text, _>(field.as_str())
            .bind::<Integer, _>(ESTIMATE_SOURCE_PREFIX.len() as i32)
            .bind::<Text, _>(ESTIMATE_SOURCE_PREFIX)
            .get_result(&mut conn)
            .await?;
            Ok(row.count)
        })
    }

    /// Total observations recorded for a business, failed fetches included.
    pub async fn count_for_business(&self, business_id: &str) -> Result<i64, DieselError> {
        use diesel::dsl::count_star;

        with_conn!(self.pool, conn, {
            observations::table
                .filter(observations::business_id.eq(business_id))
                .select(count_star())
                .first(&mut conn)
                .await
        })
    }
}
