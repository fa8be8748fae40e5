use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0002_ledger_indexes")
        .depends_on(&["0001_initial_schema"])
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "CREATE INDEX IF NOT EXISTS idx_observations_business_field ON observations(business_id, field, observed_at)",
        ))
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "CREATE INDEX IF NOT EXISTS idx_validations_business_version ON validations(business_id, validation_version)",
        ))
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "CREATE INDEX IF NOT EXISTS idx_exclusions_business ON exclusions(business_id)",
        ))
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "CREATE INDEX IF NOT EXISTS idx_businesses_status ON businesses(status)",
        ))
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "CREATE INDEX IF NOT EXISTS idx_businesses_normalized_name ON businesses(normalized_name)",
        ))
}
