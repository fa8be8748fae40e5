//! Status and show commands.

use console::style;

use super::helpers::open_context;
use crate::config::Settings;
use crate::models::{BusinessStatus, GateAction};
use crate::repository::util::redact_url_password;

/// Show business counts by status.
pub async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    if !settings.database_exists() {
        println!(
            "{} System not initialized. Run 'leadgate init' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    let ctx = open_context(settings).await?;
    let counts = ctx.businesses().count_by_status().await?;

    println!("\n{}", style("leadgate status").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Database:", redact_url_password(&settings.database_url()));

    let mut total = 0;
    for status in BusinessStatus::ALL {
        let count = counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        total += count;
        println!("{:<20} {}", format!("{}:", status), count);
    }
    println!("{:<20} {}", "Total:", total);
    Ok(())
}

/// Show one business with its evidence and latest gate results.
pub async fn cmd_show(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let ctx = open_context(settings).await?;
    let businesses = ctx.businesses();

    let business = match businesses.get(id).await? {
        Some(business) => business,
        None => match businesses.get_by_fingerprint(id).await? {
            Some(business) => business,
            None => anyhow::bail!("Business not found: {}", id),
        },
    };

    println!("\n{}", style(&business.original_name).bold());
    println!("{}", "-".repeat(60));
    println!("{:<14} {}", "ID:", business.id);
    println!("{:<14} {}", "Fingerprint:", business.fingerprint);
    println!("{:<14} {}", "Status:", business.status);
    let address: Vec<&str> = [&business.street, &business.city, &business.postal_code]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .collect();
    println!("{:<14} {}", "Address:", address.join(", "));
    if let Some(phone) = &business.phone {
        println!("{:<14} {}", "Phone:", phone);
    }
    if let Some(website) = &business.website {
        println!("{:<14} {}", "Website:", website);
    }
    if let Some(distance) = business.distance_km {
        println!("{:<14} {:.1} km", "Distance:", distance);
    }
    if business.manual_override {
        println!(
            "{:<14} {} by {}",
            "Override:",
            business.override_reason.as_deref().unwrap_or("-"),
            business.override_by.as_deref().unwrap_or("-")
        );
    }

    let observations = ctx.evidence().get_observations(&business.id, None).await?;
    println!("\n{} ({})", style("Evidence").bold(), observations.len());
    for observation in &observations {
        let value = match (&observation.value, &observation.error) {
            (Some(value), _) => value.clone(),
            (None, Some(error)) => style(format!("failed: {}", error)).red().to_string(),
            (None, None) => "-".to_string(),
        };
        println!(
            "  [{}] {:<20} {:<40} {:.2}  {}",
            observation.id,
            observation.field,
            value,
            observation.confidence,
            style(&observation.source_url).dim()
        );
    }

    let validations = ctx.validations();
    let latest = validations.validations(&business.id, None).await?;
    if let Some(first) = latest.first() {
        println!("\n{} (run {})", style("Gates").bold(), first.validation_version);
        for validation in &latest {
            let marker = match validation.action {
                GateAction::Pass => style("✓").green(),
                GateAction::ReviewRequired => style("?").yellow(),
                GateAction::AutoExclude => style("✗").red(),
            };
            println!(
                "  {} {:<14} {}  evidence {:?}",
                marker, validation.rule_id, validation.reason, validation.evidence_ids
            );
        }
    }

    let exclusions = validations.exclusions(&business.id).await?;
    if !exclusions.is_empty() {
        println!("\n{}", style("Exclusions").bold());
        for exclusion in &exclusions {
            println!(
                "  run {} {}: {}",
                exclusion.validation_version, exclusion.rule_id, exclusion.reason
            );
        }
    }

    for export in businesses.exports_for(&business.id).await? {
        println!(
            "\nExported to {} at {}",
            export.export_file,
            export.exported_at.to_rfc3339()
        );
    }
    Ok(())
}
