//! Diesel ORM models for database tables.
//!
//! Records mirror the SQLite columns one to one; conversion into the domain
//! types in `crate::models` happens in the repositories.

use diesel::prelude::*;

use crate::schema;

/// Business record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::businesses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BusinessRecord {
    pub id: String,
    pub fingerprint: String,
    pub normalized_name: String,
    pub original_name: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_km: Option<f64>,
    /// JSON array of directory place types.
    pub place_types: String,
    pub status: String,
    pub manual_override: i32,
    pub override_reason: Option<String>,
    pub override_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// New business for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::businesses)]
pub struct NewBusiness<'a> {
    pub id: &'a str,
    pub fingerprint: &'a str,
    pub normalized_name: &'a str,
    pub original_name: &'a str,
    pub street: Option<&'a str>,
    pub city: Option<&'a str>,
    pub postal_code: Option<&'a str>,
    pub province: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub website: Option<&'a str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_km: Option<f64>,
    pub place_types: &'a str,
    pub status: &'a str,
    pub manual_override: i32,
    pub override_reason: Option<&'a str>,
    pub override_by: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Observation record from the evidence ledger.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::observations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ObservationRecord {
    pub id: i64,
    pub business_id: String,
    pub source_url: String,
    pub field: String,
    pub value: Option<String>,
    pub confidence: f64,
    pub observed_at: String,
    pub http_status: Option<i32>,
    pub error: Option<String>,
}

/// New observation for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::observations)]
pub struct NewObservationRecord<'a> {
    pub business_id: &'a str,
    pub source_url: &'a str,
    pub field: &'a str,
    pub value: Option<&'a str>,
    pub confidence: f64,
    pub observed_at: &'a str,
    pub http_status: Option<i32>,
    pub error: Option<&'a str>,
}

/// Validation record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::validations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ValidationRecord {
    pub id: i64,
    pub business_id: String,
    pub rule_id: String,
    pub passed: i32,
    pub action: String,
    pub reason: String,
    /// JSON array of observation ids.
    pub evidence_ids: String,
    pub validation_version: i32,
    pub validated_at: String,
}

/// New validation for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::validations)]
pub struct NewValidationRecord<'a> {
    pub business_id: &'a str,
    pub rule_id: &'a str,
    pub passed: i32,
    pub action: &'a str,
    pub reason: &'a str,
    pub evidence_ids: &'a str,
    pub validation_version: i32,
    pub validated_at: &'a str,
}

/// Exclusion record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::exclusions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExclusionRecord {
    pub id: i64,
    pub business_id: String,
    pub rule_id: String,
    pub reason: String,
    pub evidence_ids: String,
    pub validation_version: i32,
    pub excluded_at: String,
}

/// New exclusion for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::exclusions)]
pub struct NewExclusionRecord<'a> {
    pub business_id: &'a str,
    pub rule_id: &'a str,
    pub reason: &'a str,
    pub evidence_ids: &'a str,
    pub validation_version: i32,
    pub excluded_at: &'a str,
}

/// Export record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::exports)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExportRecord {
    pub id: i64,
    pub business_id: String,
    pub export_file: String,
    pub exported_at: String,
}

/// New export link for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::exports)]
pub struct NewExportRecord<'a> {
    pub business_id: &'a str,
    pub export_file: &'a str,
    pub exported_at: &'a str,
}

/// Row id of the last insert on a connection.
#[derive(QueryableByName, Debug)]
pub(crate) struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt, column_name = "last_insert_rowid()")]
    pub id: i64,
}

/// Generic count row for raw aggregate queries.
#[derive(QueryableByName, Debug)]
pub(crate) struct CountRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub count: i64,
}
