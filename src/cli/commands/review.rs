//! Human review commands.

use chrono::Utc;
use console::style;

use super::helpers::{build_orchestrator, open_context};
use crate::config::{Config, Settings};
use crate::models::{BusinessStatus, GateAction};

/// List businesses awaiting review with the gates that held them.
pub async fn cmd_review_list(settings: &Settings, config: &Config, limit: usize) -> anyhow::Result<()> {
    let ctx = open_context(settings).await?;
    let pending = ctx
        .businesses()
        .list_by_status(BusinessStatus::ReviewRequired, (limit > 0).then_some(limit))
        .await?;

    if pending.is_empty() {
        println!("{} Nothing awaiting review", style("✓").green());
        return Ok(());
    }

    let key_field = &config.qualification.corroboration.key_field;
    let validations = ctx.validations();
    let evidence = ctx.evidence();
    for business in &pending {
        let sources = evidence.count_independent_sources(&business.id, key_field).await?;
        println!(
            "{}  {}  {}  ({} independent {} source(s))",
            style(&business.id).dim(),
            style(&business.original_name).bold(),
            business.city.as_deref().unwrap_or("-"),
            sources,
            key_field
        );
        for validation in validations.validations(&business.id, None).await? {
            if validation.action == GateAction::ReviewRequired {
                println!(
                    "    {} {}: {}",
                    style("?").yellow(),
                    validation.rule_id,
                    validation.reason
                );
            }
        }
    }
    println!("\n{} business(es) awaiting review", pending.len());
    Ok(())
}

/// Record a reviewer's decision.
pub async fn cmd_review_override(
    settings: &Settings,
    id: &str,
    status: BusinessStatus,
    reason: &str,
    by: &str,
) -> anyhow::Result<()> {
    let ctx = open_context(settings).await?;
    let business = ctx.businesses().apply_override(id, status, reason, by).await?;
    println!(
        "{} {} is now {} (by {})",
        style("✓").green(),
        business.original_name,
        business.status,
        by
    );
    Ok(())
}

/// Apply the review expiry policy.
pub async fn cmd_review_expire(settings: &Settings, config: &Config) -> anyhow::Result<()> {
    if config.qualification.review.expiry_days.is_none() {
        println!(
            "{} Review expiry is disabled (set review.expiry_days to enable)",
            style("!").yellow()
        );
        return Ok(());
    }

    let orchestrator = build_orchestrator(settings, config, true).await?;
    let expired = orchestrator.expire_stale_reviews(Utc::now()).await?;
    println!("{} Expired {} review(s)", style("✓").green(), expired);
    Ok(())
}
