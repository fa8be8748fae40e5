//! Business repository: deduplicated inserts, status transitions, overrides
//! and export links.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::{debug, info};

use super::models::{BusinessRecord, ExportRecord, LastInsertRowId, NewBusiness, NewExportRecord};
use super::pool::{DbPool, DieselError, SqliteConn};
use super::util::format_datetime;
use super::{parse_column, parse_datetime, StoreError};
use crate::models::{Business, BusinessStatus, Export, TransitionError};
use crate::schema::{businesses, exports};
use crate::with_conn;

/// Convert a database record to a domain model.
impl From<BusinessRecord> for Business {
    fn from(record: BusinessRecord) -> Self {
        Business {
            id: record.id,
            fingerprint: record.fingerprint,
            normalized_name: record.normalized_name,
            original_name: record.original_name,
            street: record.street,
            city: record.city,
            postal_code: record.postal_code,
            province: record.province,
            phone: record.phone,
            website: record.website,
            latitude: record.latitude,
            longitude: record.longitude,
            distance_km: record.distance_km,
            place_types: serde_json::from_str(&record.place_types).unwrap_or_default(),
            status: parse_column(&record.status, BusinessStatus::Discovered),
            manual_override: record.manual_override != 0,
            override_reason: record.override_reason,
            override_by: record.override_by,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

impl From<ExportRecord> for Export {
    fn from(record: ExportRecord) -> Self {
        Export {
            id: record.id,
            business_id: record.business_id,
            export_file: record.export_file,
            exported_at: parse_datetime(&record.exported_at),
        }
    }
}

/// Result of ingesting one discovery event.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The stored business after insert or merge.
    pub business: Business,
    /// False when the fingerprint already existed and the event was merged.
    pub created: bool,
}

/// Diesel-based business repository.
#[derive(Clone)]
pub struct DieselBusinessRepository {
    pool: DbPool,
}

impl DieselBusinessRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a business, or merge it into the row that already has its fingerprint.
    ///
    /// The insert is an `INSERT OR IGNORE` against the unique fingerprint
    /// index, so concurrent ingests of the same identity leave one row. On
    /// merge, stored non-null fields win and only missing fields are filled
    /// in. Status is never changed by a merge.
    pub async fn insert_or_merge(&self, candidate: &Business) -> Result<IngestOutcome, DieselError> {
        let place_types =
            serde_json::to_string(&candidate.place_types).unwrap_or_else(|_| "[]".to_string());
        let created_at = format_datetime(&candidate.created_at);
        let now = format_datetime(&Utc::now());

        let mut conn = self.pool.get().await?;
        let (record, created) = conn
            .transaction::<_, DieselError, _>(|conn| {
                Box::pin(async move {
                    let inserted = diesel::insert_or_ignore_into(businesses::table)
                        .values(NewBusiness {
                            id: &candidate.id,
                            fingerprint: &candidate.fingerprint,
                            normalized_name: &candidate.normalized_name,
                            original_name: &candidate.original_name,
                            street: candidate.street.as_deref(),
                            city: candidate.city.as_deref(),
                            postal_code: candidate.postal_code.as_deref(),
                            province: candidate.province.as_deref(),
                            phone: candidate.phone.as_deref(),
                            website: candidate.website.as_deref(),
                            latitude: candidate.latitude,
                            longitude: candidate.longitude,
                            distance_km: candidate.distance_km,
                            place_types: &place_types,
                            status: BusinessStatus::Discovered.as_str(),
                            manual_override: 0,
                            override_reason: None,
                            override_by: None,
                            created_at: &created_at,
                            updated_at: &created_at,
                        })
                        .execute(conn)
                        .await?;

                    let existing: BusinessRecord = businesses::table
                        .filter(businesses::fingerprint.eq(&candidate.fingerprint))
                        .select(BusinessRecord::as_select())
                        .first(conn)
                        .await?;

                    if inserted == 1 {
                        return Ok((existing, true));
                    }

                    let Some(mut merged) = merge_record(&existing, candidate) else {
                        return Ok((existing, false));
                    };
                    merged.updated_at = now;

                    diesel::update(businesses::table.find(&merged.id))
                        .set((
                            businesses::street.eq(&merged.street),
                            businesses::city.eq(&merged.city),
                            businesses::postal_code.eq(&merged.postal_code),
                            businesses::province.eq(&merged.province),
                            businesses::phone.eq(&merged.phone),
                            businesses::website.eq(&merged.website),
                            businesses::latitude.eq(merged.latitude),
                            businesses::longitude.eq(merged.longitude),
                            businesses::distance_km.eq(merged.distance_km),
                            businesses::place_types.eq(&merged.place_types),
                            businesses::updated_at.eq(&merged.updated_at),
                        ))
                        .execute(conn)
                        .await?;

                    Ok((merged, false))
                })
            })
            .await?;

        if created {
            debug!(business_id = %record.id, "Inserted business {}", record.fingerprint);
        } else {
            debug!(business_id = %record.id, "Merged discovery into {}", record.fingerprint);
        }

        Ok(IngestOutcome {
            business: Business::from(record),
            created,
        })
    }

    /// Get a business by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Business>, DieselError> {
        with_conn!(self.pool, conn, {
            load_record(&mut conn, id)
                .await
                .map(|opt| opt.map(Business::from))
        })
    }

    /// Get a business by fingerprint.
    pub async fn get_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Business>, DieselError> {
        with_conn!(self.pool, conn, {
            businesses::table
                .filter(businesses::fingerprint.eq(fingerprint))
                .select(BusinessRecord::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Business::from))
        })
    }

    /// Businesses sharing a normalized name (candidates for a possible-duplicate warning).
    pub async fn find_by_normalized_name(&self, name: &str) -> Result<Vec<Business>, DieselError> {
        with_conn!(self.pool, conn, {
            businesses::table
                .filter(businesses::normalized_name.eq(name))
                .order(businesses::created_at.asc())
                .select(BusinessRecord::as_select())
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(Business::from).collect())
        })
    }

    /// Businesses in one status, oldest first.
    pub async fn list_by_status(
        &self,
        status: BusinessStatus,
        limit: Option<usize>,
    ) -> Result<Vec<Business>, DieselError> {
        self.list_by_statuses(&[status], limit).await
    }

    /// Businesses in any of the given statuses, oldest first.
    pub async fn list_by_statuses(
        &self,
        statuses: &[BusinessStatus],
        limit: Option<usize>,
    ) -> Result<Vec<Business>, DieselError> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        with_conn!(self.pool, conn, {
            let mut query = businesses::table
                .filter(businesses::status.eq_any(statuses))
                .order((businesses::created_at.asc(), businesses::id.asc()))
                .select(BusinessRecord::as_select())
                .into_boxed();

            if let Some(limit) = limit {
                query = query.limit(limit as i64);
            }

            query
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(Business::from).collect())
        })
    }

    /// REVIEW_REQUIRED businesses untouched since `cutoff` and never overridden.
    pub async fn list_stale_reviews(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Business>, DieselError> {
        let cutoff = format_datetime(&cutoff);

        with_conn!(self.pool, conn, {
            businesses::table
                .filter(businesses::status.eq(BusinessStatus::ReviewRequired.as_str()))
                .filter(businesses::manual_override.eq(0))
                .filter(businesses::updated_at.lt(&cutoff))
                .order(businesses::updated_at.asc())
                .select(BusinessRecord::as_select())
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(Business::from).collect())
        })
    }

    /// Number of businesses per status.
    pub async fn count_by_status(&self) -> Result<Vec<(BusinessStatus, i64)>, DieselError> {
        use diesel::dsl::count_star;

        let rows: Vec<(String, i64)> = with_conn!(self.pool, conn, {
            businesses::table
                .group_by(businesses::status)
                .select((businesses::status, count_star()))
                .order(businesses::status.asc())
                .load(&mut conn)
                .await
        })?;

        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| status.parse::<BusinessStatus>().ok().map(|s| (s, count)))
            .collect())
    }

    /// Store resolved coordinates and distance from the reference point.
    pub async fn set_location(
        &self,
        id: &str,
        latitude: f64,
        longitude: f64,
        distance_km: f64,
    ) -> Result<(), DieselError> {
        let now = format_datetime(&Utc::now());

        with_conn!(self.pool, conn, {
            diesel::update(businesses::table.find(id))
                .set((
                    businesses::latitude.eq(Some(latitude)),
                    businesses::longitude.eq(Some(longitude)),
                    businesses::distance_km.eq(Some(distance_km)),
                    businesses::updated_at.eq(&now),
                ))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    /// Move a business to `to`, refusing edges the state machine does not allow.
    ///
    /// Transitioning to the current status is a no-op.
    pub async fn transition(&self, id: &str, to: BusinessStatus) -> Result<Business, StoreError> {
        let now = format_datetime(&Utc::now());

        let mut conn = self.pool.get().await?;
        let record = conn
            .transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    set_status_checked(conn, id, to, &now).await?;
                    load_record(conn, id)
                        .await?
                        .ok_or_else(|| StoreError::from(TransitionError::NotFound(id.to_string())))
                })
            })
            .await?;

        Ok(Business::from(record))
    }

    /// Force a business to QUALIFIED or EXCLUDED on a reviewer's decision.
    ///
    /// Allowed from any status. Audit rows are left in place.
    pub async fn apply_override(
        &self,
        id: &str,
        status: BusinessStatus,
        reason: &str,
        by: &str,
    ) -> Result<Business, StoreError> {
        if !status.is_override_target() {
            return Err(TransitionError::InvalidOverride(status).into());
        }
        let reason = reason.trim();
        let by = by.trim();
        if reason.is_empty() || by.is_empty() {
            return Err(TransitionError::MissingOverrideDetails.into());
        }

        let now = format_datetime(&Utc::now());

        let mut conn = self.pool.get().await?;
        let record = conn
            .transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let updated = diesel::update(businesses::table.find(id))
                        .set((
                            businesses::status.eq(status.as_str()),
                            businesses::manual_override.eq(1),
                            businesses::override_reason.eq(Some(reason)),
                            businesses::override_by.eq(Some(by)),
                            businesses::updated_at.eq(&now),
                        ))
                        .execute(conn)
                        .await?;
                    if updated == 0 {
                        return Err(StoreError::from(TransitionError::NotFound(id.to_string())));
                    }

                    load_record(conn, id)
                        .await?
                        .ok_or_else(|| StoreError::from(TransitionError::NotFound(id.to_string())))
                })
            })
            .await?;

        info!(business_id = %id, "Override to {} by {}: {}", status, by, reason);
        Ok(Business::from(record))
    }

    /// Link QUALIFIED or EXCLUDED businesses to an export file and mark them
    /// EXPORTED, all or none.
    ///
    /// `publish` runs last inside the transaction; if it fails, or any
    /// business is no longer exportable, nothing is marked.
    pub async fn mark_exported<F>(
        &self,
        ids: &[String],
        export_file: &str,
        publish: F,
    ) -> Result<Vec<Export>, StoreError>
    where
        F: FnOnce() -> std::io::Result<()> + Send,
    {
        let now = format_datetime(&Utc::now());

        let mut conn = self.pool.get().await?;
        let exports = conn
            .transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let mut exports = Vec::with_capacity(ids.len());
                    for id in ids {
                        set_status_checked(conn, id, BusinessStatus::Exported, &now).await?;

                        diesel::insert_into(exports::table)
                            .values(NewExportRecord {
                                business_id: id,
                                export_file,
                                exported_at: &now,
                            })
                            .execute(conn)
                            .await?;
                        let row: LastInsertRowId = diesel::sql_query("SELECT last_insert_rowid()")
                            .get_result(conn)
                            .await?;

                        exports.push(Export {
                            id: row.id,
                            business_id: id.clone(),
                            export_file: export_file.to_string(),
                            exported_at: parse_datetime(&now),
                        });
                    }

                    publish().map_err(StoreError::Publish)?;
                    Ok(exports)
                })
            })
            .await?;

        debug!("Marked {} business(es) exported to {}", exports.len(), export_file);
        Ok(exports)
    }

    /// Export links for a business, oldest first.
    pub async fn exports_for(&self, id: &str) -> Result<Vec<Export>, DieselError> {
        with_conn!(self.pool, conn, {
            exports::table
                .filter(exports::business_id.eq(id))
                .order(exports::id.asc())
                .select(ExportRecord::as_select())
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(Export::from).collect())
        })
    }
}

pub(crate) async fn load_record(
    conn: &mut SqliteConn,
    id: &str,
) -> Result<Option<BusinessRecord>, DieselError> {
    businesses::table
        .find(id)
        .select(BusinessRecord::as_select())
        .first(conn)
        .await
        .optional()
}

/// Apply a state-machine checked status change.
///
/// The guarded `UPDATE` runs first so the surrounding transaction takes the
/// write lock before reading anything.
pub(crate) async fn set_status_checked(
    conn: &mut SqliteConn,
    id: &str,
    to: BusinessStatus,
    now: &str,
) -> Result<(), StoreError> {
    let allowed: Vec<&str> = BusinessStatus::predecessors(to)
        .into_iter()
        .map(|s| s.as_str())
        .collect();

    let updated = diesel::update(
        businesses::table
            .find(id)
            .filter(businesses::status.eq_any(allowed)),
    )
    .set((
        businesses::status.eq(to.as_str()),
        businesses::updated_at.eq(now),
    ))
    .execute(conn)
    .await?;

    if updated == 1 {
        return Ok(());
    }

    let record = load_record(conn, id)
        .await?
        .ok_or_else(|| TransitionError::NotFound(id.to_string()))?;
    let from = parse_column(&record.status, BusinessStatus::Discovered);
    if from == to {
        return Ok(());
    }
    Err(TransitionError::Illegal {
        business_id: record.id,
        from,
        to,
    }
    .into())
}

/// Fill fields missing on `existing` from `candidate`.
///
/// Returns `None` when nothing changes.
fn merge_record(existing: &BusinessRecord, candidate: &Business) -> Option<BusinessRecord> {
    let mut merged = existing.clone();

    fill(&mut merged.street, &candidate.street);
    fill(&mut merged.city, &candidate.city);
    fill(&mut merged.postal_code, &candidate.postal_code);
    fill(&mut merged.province, &candidate.province);
    fill(&mut merged.phone, &candidate.phone);
    fill(&mut merged.website, &candidate.website);

    // Coordinates only move as a pair.
    if merged.latitude.is_none() && merged.longitude.is_none() {
        if let Some((lat, lon)) = candidate.coordinates() {
            merged.latitude = Some(lat);
            merged.longitude = Some(lon);
        }
    }
    if merged.distance_km.is_none() {
        merged.distance_km = candidate.distance_km;
    }

    let mut types: Vec<String> = serde_json::from_str(&existing.place_types).unwrap_or_default();
    let before = types.len();
    for t in &candidate.place_types {
        if !types.contains(t) {
            types.push(t.clone());
        }
    }
    if types.len() != before {
        merged.place_types = serde_json::to_string(&types).unwrap_or_else(|_| "[]".to_string());
    }

    let changed = merged.street != existing.street
        || merged.city != existing.city
        || merged.postal_code != existing.postal_code
        || merged.province != existing.province
        || merged.phone != existing.phone
        || merged.website != existing.website
        || merged.latitude != existing.latitude
        || merged.longitude != existing.longitude
        || merged.distance_km != existing.distance_km
        || merged.place_types != existing.place_types;

    changed.then_some(merged)
}

fn fill(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint_record;
    use crate::models::DiscoveryRecord;
    use crate::repository::test_context;

    fn discovered(record: &DiscoveryRecord) -> Business {
        let fingerprint = fingerprint_record(record).unwrap();
        Business::discovered(fingerprint, record, Utc::now())
    }

    fn abc(postal: &str) -> DiscoveryRecord {
        DiscoveryRecord {
            street: Some("123 Main St".into()),
            city: Some("Hamilton".into()),
            postal_code: Some(postal.into()),
            ..DiscoveryRecord::new("ABC Inc.", "https://directory.example/abc")
        }
    }

    #[tokio::test]
    async fn test_insert_then_merge_keeps_one_row() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.businesses();

        let first = repo.insert_or_merge(&discovered(&abc("L8H3R2"))).await.unwrap();
        assert!(first.created);
        assert!(first.business.phone.is_none());

        let mut second_record = DiscoveryRecord {
            street: Some("123 Main Street".into()),
            postal_code: Some("L8H 3R2".into()),
            phone: Some("905-555-1234".into()),
            city: Some("Stoney Creek".into()),
            ..DiscoveryRecord::new("ABC", "https://maps.example/abc")
        };
        second_record.place_types = vec!["manufacturer".into()];
        let second = repo.insert_or_merge(&discovered(&second_record)).await.unwrap();

        assert!(!second.created);
        assert_eq!(second.business.id, first.business.id);
        // Existing values win, missing ones are filled.
        assert_eq!(second.business.city.as_deref(), Some("Hamilton"));
        assert_eq!(second.business.phone.as_deref(), Some("9055551234"));
        assert_eq!(second.business.place_types, vec!["manufacturer"]);
        assert_eq!(second.business.status, BusinessStatus::Discovered);

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(counts, vec![(BusinessStatus::Discovered, 1)]);
    }

    #[tokio::test]
    async fn test_merge_does_not_touch_status() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.businesses();

        let first = repo.insert_or_merge(&discovered(&abc("L8H3R2"))).await.unwrap();
        repo.transition(&first.business.id, BusinessStatus::Enriched)
            .await
            .unwrap();

        let again = repo.insert_or_merge(&discovered(&abc("L8H3R2"))).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.business.status, BusinessStatus::Enriched);
    }

    #[tokio::test]
    async fn test_concurrent_ingest_of_same_identity() {
        let (ctx, _dir) = test_context().await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = ctx.businesses();
            let mut record = abc("L8H3R2");
            if i % 2 == 0 {
                record.phone = Some(format!("905555{:04}", i));
            }
            handles.push(tokio::spawn(async move {
                repo.insert_or_merge(&discovered(&record)).await
            }));
        }

        let mut created = 0;
        let mut ids = Vec::new();
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            if outcome.created {
                created += 1;
            }
            ids.push(outcome.business.id);
        }

        assert_eq!(created, 1);
        ids.dedup();
        assert_eq!(ids.len(), 1);
        let counts = ctx.businesses().count_by_status().await.unwrap();
        assert_eq!(counts, vec![(BusinessStatus::Discovered, 1)]);
    }

    #[tokio::test]
    async fn test_illegal_transition_is_rejected() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.businesses();
        let id = repo
            .insert_or_merge(&discovered(&abc("L8H3R2")))
            .await
            .unwrap()
            .business
            .id;

        let err = repo
            .transition(&id, BusinessStatus::Qualified)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Transition(TransitionError::Illegal { .. })
        ));

        let missing = repo
            .transition("nope", BusinessStatus::Geocoded)
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            StoreError::Transition(TransitionError::NotFound(_))
        ));

        let geocoded = repo.transition(&id, BusinessStatus::Geocoded).await.unwrap();
        assert_eq!(geocoded.status, BusinessStatus::Geocoded);
    }

    #[tokio::test]
    async fn test_override_records_reviewer() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.businesses();
        let id = repo
            .insert_or_merge(&discovered(&abc("L8H3R2")))
            .await
            .unwrap()
            .business
            .id;

        assert!(matches!(
            repo.apply_override(&id, BusinessStatus::Exported, "x", "y").await,
            Err(StoreError::Transition(TransitionError::InvalidOverride(_)))
        ));
        assert!(matches!(
            repo.apply_override(&id, BusinessStatus::Qualified, " ", "analyst").await,
            Err(StoreError::Transition(TransitionError::MissingOverrideDetails))
        ));

        let business = repo
            .apply_override(&id, BusinessStatus::Qualified, "verified by phone", "analyst")
            .await
            .unwrap();
        assert_eq!(business.status, BusinessStatus::Qualified);
        assert!(business.manual_override);

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.override_reason.as_deref(), Some("verified by phone"));
        assert_eq!(stored.override_by.as_deref(), Some("analyst"));
    }

    #[tokio::test]
    async fn test_mark_exported_requires_final_status() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.businesses();
        let id = repo
            .insert_or_merge(&discovered(&abc("L8H3R2")))
            .await
            .unwrap()
            .business
            .id;
        let ids = vec![id.clone()];

        assert!(repo.mark_exported(&ids, "leads.json", || Ok(())).await.is_err());
        assert!(repo.exports_for(&id).await.unwrap().is_empty());

        repo.apply_override(&id, BusinessStatus::Qualified, "ok", "analyst")
            .await
            .unwrap();
        let exports = repo.mark_exported(&ids, "leads.json", || Ok(())).await.unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].export_file, "leads.json");

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, BusinessStatus::Exported);
        let links = repo.exports_for(&id).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, exports[0].id);
    }

    #[tokio::test]
    async fn test_mark_exported_is_all_or_nothing() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.businesses();
        let ready = repo
            .insert_or_merge(&discovered(&abc("L8H3R2")))
            .await
            .unwrap()
            .business
            .id;
        let pending = repo
            .insert_or_merge(&discovered(&abc("L8H3R3")))
            .await
            .unwrap()
            .business
            .id;
        repo.apply_override(&ready, BusinessStatus::Qualified, "ok", "analyst")
            .await
            .unwrap();

        let published = std::sync::atomic::AtomicBool::new(false);
        let result = repo
            .mark_exported(&[ready.clone(), pending.clone()], "leads.json", || {
                published.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Transition(_))));
        assert!(!std::sync::atomic::AtomicBool::load(&published, std::sync::atomic::Ordering::SeqCst));

        let result = repo
            .mark_exported(&[ready.clone()], "leads.json", || {
                Err(std::io::Error::other("disk full"))
            })
            .await;
        assert!(matches!(result, Err(StoreError::Publish(_))));

        assert_eq!(repo.get(&ready).await.unwrap().unwrap().status, BusinessStatus::Qualified);
        assert_eq!(repo.get(&pending).await.unwrap().unwrap().status, BusinessStatus::Discovered);
        assert!(repo.exports_for(&ready).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_location_and_listing() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.businesses();
        let a = repo
            .insert_or_merge(&discovered(&abc("L8H3R2")))
            .await
            .unwrap()
            .business;
        let b = repo
            .insert_or_merge(&discovered(&abc("L8H3R3")))
            .await
            .unwrap()
            .business;

        repo.set_location(&a.id, 43.25, -79.87, 1.2).await.unwrap();
        repo.transition(&a.id, BusinessStatus::Geocoded).await.unwrap();

        let geocoded = repo
            .list_by_status(BusinessStatus::Geocoded, None)
            .await
            .unwrap();
        assert_eq!(geocoded.len(), 1);
        assert_eq!(geocoded[0].coordinates(), Some((43.25, -79.87)));
        assert_eq!(geocoded[0].distance_km, Some(1.2));

        let both = repo
            .list_by_statuses(&[BusinessStatus::Discovered, BusinessStatus::Geocoded], Some(5))
            .await
            .unwrap();
        assert_eq!(both.len(), 2);

        let named = repo.find_by_normalized_name("abc").await.unwrap();
        assert_eq!(named.len(), 2);
        assert!(repo.get_by_fingerprint(&b.fingerprint).await.unwrap().is_some());
    }
}
