//! Validation runs, exclusion audit rows and final status assignment.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::info;

use super::business::{load_record, set_status_checked};
use super::models::{ExclusionRecord, NewExclusionRecord, NewValidationRecord, ValidationRecord};
use super::pool::{DbPool, DieselError, SqliteConn};
use super::util::format_datetime;
use super::{format_id_list, parse_column, parse_datetime, parse_id_list, StoreError};
use crate::gates::GateOutcome;
use crate::models::{
    BusinessStatus, Exclusion, GateAction, TransitionError, Validation, REVIEW_EXPIRY_RULE_ID,
};
use crate::schema::{businesses, exclusions, validations};
use crate::with_conn;

impl From<ValidationRecord> for Validation {
    fn from(record: ValidationRecord) -> Self {
        Validation {
            id: record.id,
            business_id: record.business_id,
            rule_id: record.rule_id,
            passed: record.passed != 0,
            action: parse_column(&record.action, GateAction::ReviewRequired),
            reason: record.reason,
            evidence_ids: parse_id_list(&record.evidence_ids),
            validation_version: record.validation_version,
            validated_at: parse_datetime(&record.validated_at),
        }
    }
}

impl From<ExclusionRecord> for Exclusion {
    fn from(record: ExclusionRecord) -> Self {
        Exclusion {
            id: record.id,
            business_id: record.business_id,
            rule_id: record.rule_id,
            reason: record.reason,
            evidence_ids: parse_id_list(&record.evidence_ids),
            validation_version: record.validation_version,
            excluded_at: parse_datetime(&record.excluded_at),
        }
    }
}

/// What a finalized run wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeOutcome {
    pub status: BusinessStatus,
    pub validation_version: i32,
    /// Rule ids that produced exclusion rows.
    pub excluded_by: Vec<String>,
}

/// Diesel-based validation repository.
#[derive(Clone)]
pub struct DieselValidationRepository {
    pool: DbPool,
}

impl DieselValidationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist one pipeline run for a business and assign its final status.
    ///
    /// In one transaction: the business moves ENRICHED -> VALIDATED ->
    /// `status`, one validation row per gate is written under the next
    /// version number, and when `status` is EXCLUDED one exclusion row is
    /// written per AUTO_EXCLUDE gate. With `requalify`, a business already
    /// QUALIFIED or EXCLUDED is re-finalized directly. A business in
    /// REVIEW_REQUIRED gets a fresh validation run but keeps its status,
    /// since only an override takes it out of review. The returned outcome
    /// carries the status actually stored. Manually overridden businesses are
    /// never touched.
    pub async fn finalize(
        &self,
        business_id: &str,
        outcomes: &[GateOutcome],
        status: BusinessStatus,
        requalify: bool,
    ) -> Result<FinalizeOutcome, StoreError> {
        if !matches!(
            status,
            BusinessStatus::Qualified | BusinessStatus::Excluded | BusinessStatus::ReviewRequired
        ) {
            return Err(TransitionError::Illegal {
                business_id: business_id.to_string(),
                from: BusinessStatus::Validated,
                to: status,
            }
            .into());
        }

        let now = format_datetime(&Utc::now());

        let mut conn = self.pool.get().await?;
        let outcome = conn
            .transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let status = if requalify {
                        requalify_status(conn, business_id, status, &now).await?
                    } else {
                        set_status_checked(conn, business_id, BusinessStatus::Validated, &now)
                            .await?;
                        ensure_not_overridden(conn, business_id, status).await?;
                        set_status_checked(conn, business_id, status, &now).await?;
                        status
                    };

                    let version = max_version(conn, business_id).await?.unwrap_or(0) + 1;

                    for outcome in outcomes {
                        let evidence = format_id_list(&outcome.evidence_ids);
                        diesel::insert_into(validations::table)
                            .values(NewValidationRecord {
                                business_id,
                                rule_id: &outcome.rule_id,
                                passed: i32::from(outcome.passed),
                                action: outcome.action.as_str(),
                                reason: &outcome.reason,
                                evidence_ids: &evidence,
                                validation_version: version,
                                validated_at: &now,
                            })
                            .execute(conn)
                            .await?;
                    }

                    let mut excluded_by = Vec::new();
                    if status == BusinessStatus::Excluded {
                        for outcome in outcomes
                            .iter()
                            .filter(|o| o.action == GateAction::AutoExclude)
                        {
                            let evidence = format_id_list(&outcome.evidence_ids);
                            diesel::insert_into(exclusions::table)
                                .values(NewExclusionRecord {
                                    business_id,
                                    rule_id: &outcome.rule_id,
                                    reason: &outcome.reason,
                                    evidence_ids: &evidence,
                                    validation_version: version,
                                    excluded_at: &now,
                                })
                                .execute(conn)
                                .await?;
                            excluded_by.push(outcome.rule_id.clone());
                        }
                    }

                    Ok(FinalizeOutcome {
                        status,
                        validation_version: version,
                        excluded_by,
                    })
                })
            })
            .await?;

        Ok(outcome)
    }

    /// Exclude a business left in REVIEW_REQUIRED past the review window.
    ///
    /// Returns `false` when the business is no longer awaiting review (for
    /// example after an override), in which case nothing is written.
    pub async fn expire_review(
        &self,
        business_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DieselError> {
        let now = format_datetime(&now);

        let mut conn = self.pool.get().await?;
        let expired = conn
            .transaction::<_, DieselError, _>(|conn| {
                Box::pin(async move {
                    let updated = diesel::update(
                        businesses::table
                            .find(business_id)
                            .filter(businesses::status.eq(BusinessStatus::ReviewRequired.as_str()))
                            .filter(businesses::manual_override.eq(0)),
                    )
                    .set((
                        businesses::status.eq(BusinessStatus::Excluded.as_str()),
                        businesses::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .await?;
                    if updated == 0 {
                        return Ok(false);
                    }

                    let version = max_version(conn, business_id).await?.unwrap_or(1);
                    diesel::insert_into(exclusions::table)
                        .values(NewExclusionRecord {
                            business_id,
                            rule_id: REVIEW_EXPIRY_RULE_ID,
                            reason,
                            evidence_ids: "[]",
                            validation_version: version,
                            excluded_at: &now,
                        })
                        .execute(conn)
                        .await?;
                    Ok(true)
                })
            })
            .await?;

        if expired {
            info!(business_id = %business_id, "Review expired: {}", reason);
        }
        Ok(expired)
    }

    /// Highest validation version written for a business.
    pub async fn latest_version(&self, business_id: &str) -> Result<Option<i32>, DieselError> {
        with_conn!(self.pool, conn, { max_version(&mut conn, business_id).await })
    }

    /// Validation rows of one run; the latest run when `version` is `None`.
    pub async fn validations(
        &self,
        business_id: &str,
        version: Option<i32>,
    ) -> Result<Vec<Validation>, DieselError> {
        with_conn!(self.pool, conn, {
            let version = match version {
                Some(v) => v,
                None => match max_version(&mut conn, business_id).await? {
                    Some(v) => v,
                    None => return Ok(Vec::new()),
                },
            };

            validations::table
                .filter(validations::business_id.eq(business_id))
                .filter(validations::validation_version.eq(version))
                .order(validations::id.asc())
                .select(ValidationRecord::as_select())
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(Validation::from).collect())
        })
    }

    /// Every exclusion row for a business, oldest first.
    pub async fn exclusions(&self, business_id: &str) -> Result<Vec<Exclusion>, DieselError> {
        with_conn!(self.pool, conn, {
            exclusions::table
                .filter(exclusions::business_id.eq(business_id))
                .order(exclusions::id.asc())
                .select(ExclusionRecord::as_select())
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(Exclusion::from).collect())
        })
    }
}

async fn max_version(conn: &mut SqliteConn, business_id: &str) -> Result<Option<i32>, DieselError> {
    validations::table
        .filter(validations::business_id.eq(business_id))
        .select(diesel::dsl::max(validations::validation_version))
        .first::<Option<i32>>(conn)
        .await
}

async fn ensure_not_overridden(
    conn: &mut SqliteConn,
    business_id: &str,
    to: BusinessStatus,
) -> Result<(), StoreError> {
    let record = load_record(conn, business_id)
        .await?
        .ok_or_else(|| StoreError::from(TransitionError::NotFound(business_id.to_string())))?;
    if record.manual_override != 0 {
        return Err(TransitionError::Illegal {
            business_id: record.id,
            from: parse_column(&record.status, BusinessStatus::Discovered),
            to,
        }
        .into());
    }
    Ok(())
}

/// Re-finalize a business from any pipeline status past ENRICHED.
///
/// Returns the status the business ends up in. REVIEW_REQUIRED is left as
/// is, together with `updated_at`, so the review window keeps running.
async fn requalify_status(
    conn: &mut SqliteConn,
    business_id: &str,
    to: BusinessStatus,
    now: &str,
) -> Result<BusinessStatus, StoreError> {
    let record = load_record(conn, business_id)
        .await?
        .ok_or_else(|| StoreError::from(TransitionError::NotFound(business_id.to_string())))?;
    let from = parse_column(&record.status, BusinessStatus::Discovered);
    if from == BusinessStatus::ReviewRequired && record.manual_override == 0 {
        return Ok(BusinessStatus::ReviewRequired);
    }

    let allowed = vec![
        BusinessStatus::Enriched.as_str(),
        BusinessStatus::Validated.as_str(),
        BusinessStatus::Qualified.as_str(),
        BusinessStatus::Excluded.as_str(),
    ];

    let updated = diesel::update(
        businesses::table
            .find(business_id)
            .filter(businesses::status.eq_any(allowed))
            .filter(businesses::manual_override.eq(0)),
    )
    .set((
        businesses::status.eq(to.as_str()),
        businesses::updated_at.eq(now),
    ))
    .execute(conn)
    .await?;

    if updated == 1 {
        return Ok(to);
    }

    Err(TransitionError::Illegal {
        business_id: record.id,
        from,
        to,
    }
    .into())
}
