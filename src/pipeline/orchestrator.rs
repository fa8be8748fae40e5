use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use super::estimate::derive_benchmark_estimate;
use super::{
    EnrichReport, IngestReport, PipelineError, ProcessOutcome, RunOptions, RunReport, SkipReason,
    Stage, StageExt,
};
use crate::config::QualificationConfig;
use crate::fingerprint::fingerprint_record;
use crate::gates::{combine_outcomes, haversine_km, run_all, standard_gates, Gate, GateInput};
use crate::lookup::{Geocoder, LookupOutcome, RetryPolicy, WebsiteAgeLookup};
use crate::models::{
    Business, BusinessStatus, DiscoveryRecord, EnrichmentSignal, NewObservation, ObservationField,
    SignalTarget, TransitionError,
};
use crate::normalize::compare_addresses;
use crate::repository::{DbContext, FinalizeOutcome, IngestOutcome, StoreError};

/// Confidence given to fields copied from a directory listing.
const DIRECTORY_CONFIDENCE: f64 = 0.8;

/// Confidence given to geocoder coordinates.
const GEOCODE_CONFIDENCE: f64 = 0.9;

/// Address similarity above which a same-name business is logged as a possible duplicate.
const POSSIBLE_DUPLICATE_SIMILARITY: f64 = 0.6;

/// Runs businesses through the qualification state machine.
///
/// Configuration is validated and the gates are built once, at
/// construction. Lookups are optional; without a geocoder a business that
/// arrived without coordinates stays unlocated and the geography gate
/// excludes it.
pub struct Orchestrator {
    ctx: DbContext,
    config: Arc<QualificationConfig>,
    gates: Arc<[Box<dyn Gate>]>,
    geocoder: Option<Arc<dyn Geocoder>>,
    website_age: Option<Arc<dyn WebsiteAgeLookup>>,
    retry: RetryPolicy,
}

impl Orchestrator {
    /// Validate `config` and build the gate set.
    pub fn new(ctx: DbContext, config: QualificationConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let gates: Arc<[Box<dyn Gate>]> = standard_gates(&config)?.into();
        let retry = RetryPolicy::from_config(&config.lookup);

        Ok(Self {
            ctx,
            config: Arc::new(config),
            gates,
            geocoder: None,
            website_age: None,
            retry,
        })
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_website_age(mut self, lookup: Arc<dyn WebsiteAgeLookup>) -> Self {
        self.website_age = Some(lookup);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &QualificationConfig {
        &self.config
    }

    pub fn context(&self) -> &DbContext {
        &self.ctx
    }

    // ---- Ingest ----

    /// Fingerprint a discovery record and insert or merge it.
    ///
    /// Returns `None` when the record lacks the identity fields needed for a
    /// fingerprint; such records are logged and never stored.
    pub async fn ingest(&self, record: &DiscoveryRecord) -> Result<Option<IngestOutcome>, StoreError> {
        let fingerprint = match fingerprint_record(record) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!(source_url = %record.source_url, "Skipping discovery record: {}", e);
                return Ok(None);
            }
        };

        let candidate = Business::discovered(fingerprint, record, Utc::now());
        let outcome = self.ctx.businesses().insert_or_merge(&candidate).await?;

        if outcome.created {
            debug!(business_id = %outcome.business.id, "Discovered {}", outcome.business.original_name);
            self.flag_possible_duplicates(&outcome.business).await?;
        } else {
            debug!(
                business_id = %outcome.business.id,
                "Merged discovery from {} into existing business",
                record.source_url
            );
        }

        self.record_discovery(&outcome.business.id, record).await?;
        Ok(Some(outcome))
    }

    pub async fn ingest_batch(&self, records: &[DiscoveryRecord]) -> Result<IngestReport, PipelineError> {
        let mut report = IngestReport::default();
        for record in records {
            let outcome = self
                .ingest(record)
                .await
                .stage(Stage::Ingest)
                .map_err(|e| e.with_processed(report.created + report.merged))?;
            match outcome {
                Some(IngestOutcome { created: true, .. }) => report.created += 1,
                Some(_) => report.merged += 1,
                None => report.skipped += 1,
            }
        }
        info!(
            "Ingested {} record(s): {} new, {} merged, {} skipped",
            records.len(),
            report.created,
            report.merged,
            report.skipped
        );
        Ok(report)
    }

    /// Same normalized name, different fingerprint, similar address.
    async fn flag_possible_duplicates(&self, business: &Business) -> Result<(), StoreError> {
        let address = address_line(business);
        if address.is_empty() {
            return Ok(());
        }

        let namesakes = self
            .ctx
            .businesses()
            .find_by_normalized_name(&business.normalized_name)
            .await?;
        for other in namesakes.iter().filter(|b| b.id != business.id) {
            let similarity = compare_addresses(&address, &address_line(other));
            if similarity >= POSSIBLE_DUPLICATE_SIMILARITY {
                warn!(
                    business_id = %business.id,
                    "Possible duplicate of {} ({:.2} address similarity)",
                    other.id,
                    similarity
                );
            }
        }
        Ok(())
    }

    async fn record_discovery(&self, business_id: &str, record: &DiscoveryRecord) -> Result<(), StoreError> {
        let mut fields: Vec<(ObservationField, String)> = Vec::new();
        if let Some(name) = present(&record.name) {
            fields.push((ObservationField::Name, name));
        }
        for place_type in record.place_types.iter().map(|t| t.trim()) {
            if !place_type.is_empty() {
                fields.push((ObservationField::PlaceType, place_type.to_string()));
            }
        }
        if let Some(phone) = present(&record.phone) {
            fields.push((ObservationField::Phone, phone));
        }
        if let Some(website) = present(&record.website) {
            fields.push((ObservationField::Website, website));
        }
        let address: Vec<String> = [&record.street, &record.city, &record.postal_code]
            .into_iter()
            .filter_map(present)
            .collect();
        if !address.is_empty() {
            fields.push((ObservationField::Address, address.join(", ")));
        }
        if let (Some(lat), Some(lon)) = (record.latitude, record.longitude) {
            if lat.is_finite() && lon.is_finite() {
                fields.push((ObservationField::Coordinates, format!("{},{}", lat, lon)));
            }
        }

        let evidence = self.ctx.evidence();
        for (field, value) in fields {
            evidence
                .record_observation(business_id, &record.source_url, field, Some(&value), DIRECTORY_CONFIDENCE)
                .await?;
        }
        Ok(())
    }

    // ---- Enrichment signals ----

    /// Append one enrichment signal to the ledger of its target business.
    ///
    /// Returns `None` when no business matches the target.
    pub async fn apply_signal(&self, signal: &EnrichmentSignal) -> Result<Option<i64>, StoreError> {
        let businesses = self.ctx.businesses();
        let business = match &signal.target {
            SignalTarget::BusinessId(id) => businesses.get(id).await?,
            SignalTarget::Fingerprint(fingerprint) => businesses.get_by_fingerprint(fingerprint).await?,
        };
        let Some(business) = business else {
            warn!("No business for enrichment signal {:?} from {}", signal.target, signal.source_url);
            return Ok(None);
        };

        let observation = NewObservation::new(
            &business.id,
            &signal.source_url,
            ObservationField::from(signal.field.trim()),
            signal.value.clone(),
            signal.confidence,
        );
        let id = self.ctx.evidence().record(&observation).await?;
        Ok(Some(id))
    }

    pub async fn enrich_batch(&self, signals: &[EnrichmentSignal]) -> Result<EnrichReport, PipelineError> {
        let mut report = EnrichReport::default();
        for signal in signals {
            match self.apply_signal(signal).await {
                Ok(Some(_)) => report.recorded += 1,
                Ok(None) => report.unmatched += 1,
                Err(StoreError::InvalidConfidence(confidence)) => {
                    warn!(
                        "Rejected {} signal from {}: confidence {} outside [0, 1]",
                        signal.field, signal.source_url, confidence
                    );
                    report.rejected += 1;
                }
                Err(e) => {
                    return Err(PipelineError::Stage {
                        stage: Stage::Enrich,
                        processed: report.recorded,
                        source: e,
                    })
                }
            }
        }
        Ok(report)
    }

    // ---- Qualification ----

    /// Run one business through locate, enrich and the gates.
    pub async fn process(&self, business_id: &str, requalify: bool) -> Result<ProcessOutcome, PipelineError> {
        let business = self
            .ctx
            .businesses()
            .get(business_id)
            .await
            .stage(Stage::Qualify)?
            .ok_or_else(|| TransitionError::NotFound(business_id.to_string()))
            .stage(Stage::Qualify)?;
        self.process_business(business, requalify).await
    }

    /// Process every pending business, with bounded fan-out.
    ///
    /// Stops at the first infrastructure failure; businesses finalized
    /// before it keep their status.
    pub async fn run_batch(&self, options: RunOptions) -> Result<RunReport, PipelineError> {
        let mut statuses = vec![
            BusinessStatus::Discovered,
            BusinessStatus::Geocoded,
            BusinessStatus::Enriched,
            BusinessStatus::Validated,
        ];
        // Businesses awaiting review wait for a reviewer, not a rerun.
        if options.requalify {
            statuses.extend([BusinessStatus::Qualified, BusinessStatus::Excluded]);
        }

        let pending = self
            .ctx
            .businesses()
            .list_by_statuses(&statuses, options.limit)
            .await
            .stage(Stage::Qualify)?;
        info!("Qualifying {} business(es)", pending.len());

        let mut report = RunReport::default();
        let mut results = stream::iter(pending)
            .map(|business| async move {
                let id = business.id.clone();
                (id, self.process_business(business, options.requalify).await)
            })
            .buffer_unordered(self.config.pipeline.concurrency);

        while let Some((id, result)) = results.next().await {
            match result {
                Ok(outcome) => {
                    if let ProcessOutcome::Skipped(reason) = &outcome {
                        debug!(business_id = %id, "Skipped: {}", reason);
                    }
                    report.record(&outcome);
                }
                Err(e) => {
                    error!(business_id = %id, "Run stopped: {}", e);
                    return Err(e.with_processed(report.finalized()));
                }
            }
        }

        info!(
            "Run complete: {} qualified, {} excluded, {} for review, {} skipped",
            report.qualified, report.excluded, report.review_required, report.skipped
        );
        Ok(report)
    }

    async fn process_business(&self, business: Business, requalify: bool) -> Result<ProcessOutcome, PipelineError> {
        if business.manual_override {
            return Ok(ProcessOutcome::Skipped(SkipReason::ManualOverride));
        }
        if business.status == BusinessStatus::Exported {
            return Ok(ProcessOutcome::Skipped(SkipReason::Exported));
        }
        if business.status.is_final() && !requalify {
            return Ok(ProcessOutcome::Skipped(SkipReason::AlreadyFinal(business.status)));
        }

        let business = self.locate(business).await.stage(Stage::Geocode)?;
        let business = self.enrich(business).await.stage(Stage::Enrich)?;

        let ready = matches!(
            business.status,
            BusinessStatus::Enriched | BusinessStatus::Validated
        ) || business.status.is_final();
        if !ready {
            return Ok(ProcessOutcome::Skipped(SkipReason::NoEvidence));
        }

        let outcome = self.qualify(&business, requalify).await.stage(Stage::Qualify)?;
        Ok(ProcessOutcome::Finalized(outcome))
    }

    /// DISCOVERED -> GEOCODED once coordinates are known.
    async fn locate(&self, business: Business) -> Result<Business, StoreError> {
        if business.status != BusinessStatus::Discovered {
            return Ok(business);
        }

        let point = match business.coordinates() {
            Some(point) => Some(point),
            None => self.geocode(&business).await?,
        };
        let Some((lat, lon)) = point else {
            debug!(business_id = %business.id, "No coordinates for {}", business.original_name);
            return Ok(business);
        };

        let geography = &self.config.geography;
        let distance = haversine_km(geography.reference_lat, geography.reference_lon, lat, lon);
        let businesses = self.ctx.businesses();
        businesses.set_location(&business.id, lat, lon, distance).await?;
        businesses.transition(&business.id, BusinessStatus::Geocoded).await
    }

    async fn geocode(&self, business: &Business) -> Result<Option<(f64, f64)>, StoreError> {
        let Some(geocoder) = &self.geocoder else {
            return Ok(None);
        };

        let source = geocoder.source_url();
        let outcome = self
            .retry
            .run("geocode", || geocoder.geocode(business))
            .await;

        let field = ObservationField::Coordinates;
        let observation = match &outcome {
            LookupOutcome::Found((lat, lon)) => NewObservation::new(
                &business.id,
                &source,
                field,
                Some(format!("{},{}", lat, lon)),
                GEOCODE_CONFIDENCE,
            ),
            LookupOutcome::NotFound => {
                NewObservation::failed(&business.id, &source, field, None, "no geocoding result")
            }
            LookupOutcome::Unavailable {
                error, http_status, ..
            } => NewObservation::failed(
                &business.id,
                &source,
                field,
                http_status.map(i32::from),
                error.clone(),
            ),
        };
        self.ctx.evidence().record(&observation).await?;

        Ok(outcome.found())
    }

    /// Website age, derived estimates, then GEOCODED/DISCOVERED -> ENRICHED.
    async fn enrich(&self, business: Business) -> Result<Business, StoreError> {
        let evidence = self.ctx.evidence();
        let observations = evidence.get_observations(&business.id, None).await?;

        let has_snapshot = observations
            .iter()
            .any(|o| o.field == ObservationField::WebsiteFirstSeen && o.present_value().is_some());
        if !has_snapshot {
            self.lookup_website_age(&business).await?;
        }

        if let Some(estimate) = derive_benchmark_estimate(&business.id, &observations) {
            debug!(business_id = %business.id, "Recorded benchmark revenue estimate");
            evidence.record(&estimate).await?;
        }

        let has_contact = observations
            .iter()
            .any(|o| o.field.is_contact_or_category() && o.present_value().is_some());
        if has_contact
            && matches!(
                business.status,
                BusinessStatus::Discovered | BusinessStatus::Geocoded
            )
        {
            return self
                .ctx
                .businesses()
                .transition(&business.id, BusinessStatus::Enriched)
                .await;
        }
        Ok(business)
    }

    async fn lookup_website_age(&self, business: &Business) -> Result<(), StoreError> {
        let (Some(lookup), Some(domain)) = (&self.website_age, business.website.as_deref()) else {
            return Ok(());
        };

        let source = lookup.source_url(domain);
        let field = ObservationField::WebsiteFirstSeen;
        let observation = match self.retry.run("website age", || lookup.first_seen(domain)).await {
            LookupOutcome::Found(first_seen) => NewObservation::new(
                &business.id,
                &source,
                field,
                Some(first_seen.to_rfc3339()),
                1.0,
            ),
            LookupOutcome::NotFound => {
                NewObservation::failed(&business.id, &source, field, None, "no archive snapshot")
            }
            LookupOutcome::Unavailable {
                error, http_status, ..
            } => NewObservation::failed(
                &business.id,
                &source,
                field,
                http_status.map(i32::from),
                error,
            ),
        };
        self.ctx.evidence().record(&observation).await?;
        Ok(())
    }

    /// Run every gate over one snapshot of the ledger and persist the result.
    async fn qualify(&self, business: &Business, requalify: bool) -> Result<FinalizeOutcome, StoreError> {
        let observations = self
            .ctx
            .evidence()
            .get_observations(&business.id, None)
            .await?;
        let input = GateInput::new(business, &observations, Utc::now());
        let outcomes = run_all(&self.gates, &input);
        let status = combine_outcomes(&outcomes);

        let result = self
            .ctx
            .validations()
            .finalize(&business.id, &outcomes, status, requalify)
            .await?;

        info!(
            business_id = %business.id,
            "{} -> {} (run {})",
            business.original_name,
            result.status,
            result.validation_version
        );
        for rule_id in &result.excluded_by {
            debug!(business_id = %business.id, rule_id = %rule_id, "Excluded");
        }
        Ok(result)
    }

    // ---- Review policy ----

    /// Exclude REVIEW_REQUIRED businesses older than the review window.
    ///
    /// A no-op when `review.expiry_days` is unset.
    pub async fn expire_stale_reviews(&self, now: DateTime<Utc>) -> Result<usize, PipelineError> {
        let Some(days) = self.config.review.expiry_days else {
            debug!("Review expiry disabled");
            return Ok(0);
        };

        let cutoff = now - chrono::Duration::days(i64::from(days));
        let stale = self
            .ctx
            .businesses()
            .list_stale_reviews(cutoff)
            .await
            .stage(Stage::Expire)?;

        let reason = format!("review not completed within {} days", days);
        let validations = self.ctx.validations();
        let mut expired = 0;
        for business in stale {
            let done = validations
                .expire_review(&business.id, &reason, now)
                .await
                .stage(Stage::Expire)
                .map_err(|e| e.with_processed(expired))?;
            if done {
                expired += 1;
            }
        }

        if expired > 0 {
            info!("Expired {} stale review(s)", expired);
        }
        Ok(expired)
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn address_line(business: &Business) -> String {
    [&business.street, &business.city, &business.postal_code]
        .into_iter()
        .filter_map(present)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupError;
    use crate::models::GateAction;
    use crate::repository::test_context;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct FixedAge {
        years: f64,
        calls: AtomicU32,
    }

    #[async_trait]
    impl WebsiteAgeLookup for FixedAge {
        fn source_url(&self, domain: &str) -> String {
            format!("https://archive.test/cdx?url={}", domain)
        }

        async fn first_seen(&self, _domain: &str) -> Result<Option<DateTime<Utc>>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let secs = (self.years * 365.25 * 86_400.0) as i64;
            Ok(Some(Utc::now() - chrono::Duration::seconds(secs)))
        }
    }

    struct DownArchive;

    #[async_trait]
    impl WebsiteAgeLookup for DownArchive {
        fn source_url(&self, domain: &str) -> String {
            format!("https://archive.test/cdx?url={}", domain)
        }

        async fn first_seen(&self, _domain: &str) -> Result<Option<DateTime<Utc>>, LookupError> {
            Err(LookupError::Status(503))
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            multiplier: 2.0,
            timeout: Duration::from_millis(200),
        }
    }

    fn manufacturer() -> DiscoveryRecord {
        DiscoveryRecord {
            street: Some("45 Kenilworth Ave N".into()),
            city: Some("Hamilton".into()),
            postal_code: Some("L8H 4R6".into()),
            website: Some("https://www.bartontool.example".into()),
            latitude: Some(43.2500),
            longitude: Some(-79.7800),
            place_types: vec!["machine_shop".into(), "manufacturing".into()],
            ..DiscoveryRecord::new("Barton Tool & Die Ltd.", "https://maps.test/barton")
        }
    }

    async fn add_signal(orch: &Orchestrator, business_id: &str, source: &str, field: &str, value: &str, confidence: f64) {
        orch.apply_signal(&EnrichmentSignal {
            target: SignalTarget::BusinessId(business_id.to_string()),
            source_url: source.into(),
            field: field.into(),
            value: Some(value.into()),
            confidence,
        })
        .await
        .unwrap()
        .unwrap();
    }

    async fn qualifying_evidence(orch: &Orchestrator, business_id: &str) {
        add_signal(orch, business_id, "https://maps.test/barton", "category", "Manufacturing", 0.8).await;
        add_signal(orch, business_id, "https://canada411.test/barton", "category", "manufacturing", 0.7).await;
        add_signal(orch, business_id, "https://linkedin.test/barton", "staff_count", "14", 0.7).await;
        add_signal(orch, business_id, "https://dnb.test/barton", "revenue_estimate", "2100000", 0.75).await;
    }

    #[tokio::test]
    async fn test_full_run_qualifies_corroborated_manufacturer() {
        let (ctx, _dir) = test_context().await;
        let archive = Arc::new(FixedAge { years: 12.0, calls: AtomicU32::new(0) });
        let orch = Orchestrator::new(ctx.clone(), QualificationConfig::default())
            .unwrap()
            .with_website_age(archive.clone())
            .with_retry_policy(fast_retry());

        let business = orch.ingest(&manufacturer()).await.unwrap().unwrap().business;
        qualifying_evidence(&orch, &business.id).await;

        let report = orch.run_batch(RunOptions::default()).await.unwrap();
        assert_eq!(report.qualified, 1);

        let stored = ctx.businesses().get(&business.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BusinessStatus::Qualified);
        assert!(stored.distance_km.unwrap() < 25.0);
        assert_eq!(ctx.validations().validations(&business.id, None).await.unwrap().len(), 5);
        assert_eq!(archive.calls.load(Ordering::SeqCst), 1);

        // A second run leaves final businesses alone.
        let report = orch.run_batch(RunOptions::default()).await.unwrap();
        assert_eq!(report, RunReport::default());

        // Requalifying reaches the same status without refetching the archive.
        let report = orch
            .run_batch(RunOptions { requalify: true, limit: None })
            .await
            .unwrap();
        assert_eq!(report.qualified, 1);
        assert_eq!(ctx.validations().latest_version(&business.id).await.unwrap(), Some(2));
        assert_eq!(archive.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_archive_is_recorded_and_excludes() {
        let (ctx, _dir) = test_context().await;
        let orch = Orchestrator::new(ctx.clone(), QualificationConfig::default())
            .unwrap()
            .with_website_age(Arc::new(DownArchive))
            .with_retry_policy(fast_retry());

        let business = orch.ingest(&manufacturer()).await.unwrap().unwrap().business;
        qualifying_evidence(&orch, &business.id).await;

        let outcome = orch.process(&business.id, false).await.unwrap();
        let ProcessOutcome::Finalized(outcome) = outcome else {
            panic!("expected a finalized business");
        };
        assert_eq!(outcome.status, BusinessStatus::Excluded);
        assert_eq!(outcome.excluded_by, vec!["website_age".to_string()]);

        let failed = ctx
            .evidence()
            .get_observations(&business.id, Some(&ObservationField::WebsiteFirstSeen))
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].value.is_none());
        assert_eq!(failed[0].http_status, Some(503));

        let validations = ctx.validations().validations(&business.id, None).await.unwrap();
        let age = validations.iter().find(|v| v.rule_id == "website_age").unwrap();
        assert_eq!(age.action, GateAction::AutoExclude);
        assert!(age.reason.contains("cannot verify longevity"));
    }

    #[tokio::test]
    async fn test_insufficient_identity_is_skipped() {
        let (ctx, _dir) = test_context().await;
        let orch = Orchestrator::new(ctx.clone(), QualificationConfig::default()).unwrap();

        let report = orch
            .ingest_batch(&[
                DiscoveryRecord::new("", "https://maps.test/empty"),
                manufacturer(),
                manufacturer(),
            ])
            .await
            .unwrap();
        assert_eq!(
            report,
            IngestReport { created: 1, merged: 1, skipped: 1 }
        );
    }

    #[tokio::test]
    async fn test_override_is_never_requalified() {
        let (ctx, _dir) = test_context().await;
        let orch = Orchestrator::new(ctx.clone(), QualificationConfig::default()).unwrap();

        let record = DiscoveryRecord {
            place_types: vec!["convenience_store".into()],
            ..DiscoveryRecord::new("Eastgate Variety", "https://maps.test/eastgate")
        };
        let business = orch.ingest(&record).await.unwrap().unwrap().business;
        orch.run_batch(RunOptions::default()).await.unwrap();

        ctx.businesses()
            .apply_override(&business.id, BusinessStatus::Qualified, "owner-run shop", "jdoe")
            .await
            .unwrap();

        let outcome = orch.process(&business.id, true).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Skipped(SkipReason::ManualOverride));
        let stored = ctx.businesses().get(&business.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BusinessStatus::Qualified);
        assert!(!ctx.validations().exclusions(&business.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_and_invalid_signals() {
        let (ctx, _dir) = test_context().await;
        let orch = Orchestrator::new(ctx.clone(), QualificationConfig::default()).unwrap();
        let business = orch.ingest(&manufacturer()).await.unwrap().unwrap().business;

        let signal = |target: SignalTarget, confidence: f64| EnrichmentSignal {
            target,
            source_url: "https://linkedin.test".into(),
            field: "staff_count".into(),
            value: Some("9".into()),
            confidence,
        };
        let report = orch
            .enrich_batch(&[
                signal(SignalTarget::Fingerprint(business.fingerprint.clone()), 0.7),
                signal(SignalTarget::BusinessId("missing".into()), 0.7),
                signal(SignalTarget::BusinessId(business.id.clone()), 1.5),
            ])
            .await
            .unwrap();
        assert_eq!(
            report,
            EnrichReport { recorded: 1, unmatched: 1, rejected: 1 }
        );
    }

    #[tokio::test]
    async fn test_review_expiry() {
        let (ctx, _dir) = test_context().await;
        let mut config = QualificationConfig::default();
        let young_site = Arc::new(FixedAge { years: 2.8, calls: AtomicU32::new(0) });

        let orch = Orchestrator::new(ctx.clone(), config.clone())
            .unwrap()
            .with_website_age(young_site);
        let business = orch.ingest(&manufacturer()).await.unwrap().unwrap().business;
        qualifying_evidence(&orch, &business.id).await;
        let outcome = orch.process(&business.id, false).await.unwrap();
        assert_eq!(outcome.status(), Some(BusinessStatus::ReviewRequired));

        let later = Utc::now() + chrono::Duration::days(45);
        assert_eq!(orch.expire_stale_reviews(later).await.unwrap(), 0);

        config.review.expiry_days = Some(30);
        let orch = Orchestrator::new(ctx.clone(), config).unwrap();

        // Reviews younger than the window stay.
        assert_eq!(orch.expire_stale_reviews(Utc::now()).await.unwrap(), 0);
        let stored = ctx.businesses().get(&business.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BusinessStatus::ReviewRequired);
        assert!(ctx.validations().exclusions(&business.id).await.unwrap().is_empty());

        assert_eq!(orch.expire_stale_reviews(later).await.unwrap(), 1);
        let stored = ctx.businesses().get(&business.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BusinessStatus::Excluded);
        let exclusions = ctx.validations().exclusions(&business.id).await.unwrap();
        assert_eq!(exclusions.len(), 1);
        assert_eq!(exclusions[0].rule_id, "review_expiry");
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("unused.db"));
        let mut config = QualificationConfig::default();
        config.revenue.confidence_threshold = 1.5;
        assert!(matches!(
            Orchestrator::new(ctx, config),
            Err(PipelineError::Config(_))
        ));
    }
}
