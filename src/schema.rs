// Diesel table definitions, kept in sync with the cetane migrations in
// `crate::migrations`.

diesel::table! {
    businesses (id) {
        id -> Text,
        fingerprint -> Text,
        normalized_name -> Text,
        original_name -> Text,
        street -> Nullable<Text>,
        city -> Nullable<Text>,
        postal_code -> Nullable<Text>,
        province -> Nullable<Text>,
        phone -> Nullable<Text>,
        website -> Nullable<Text>,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
        distance_km -> Nullable<Double>,
        place_types -> Text,
        status -> Text,
        manual_override -> Integer,
        override_reason -> Nullable<Text>,
        override_by -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    observations (id) {
        id -> BigInt,
        business_id -> Text,
        source_url -> Text,
        field -> Text,
        value -> Nullable<Text>,
        confidence -> Double,
        observed_at -> Text,
        http_status -> Nullable<Integer>,
        error -> Nullable<Text>,
    }
}

diesel::table! {
    validations (id) {
        id -> BigInt,
        business_id -> Text,
        rule_id -> Text,
        passed -> Integer,
        action -> Text,
        reason -> Text,
        evidence_ids -> Text,
        validation_version -> Integer,
        validated_at -> Text,
    }
}

diesel::table! {
    exclusions (id) {
        id -> BigInt,
        business_id -> Text,
        rule_id -> Text,
        reason -> Text,
        evidence_ids -> Text,
        validation_version -> Integer,
        excluded_at -> Text,
    }
}

diesel::table! {
    exports (id) {
        id -> BigInt,
        business_id -> Text,
        export_file -> Text,
        exported_at -> Text,
    }
}

diesel::table! {
    storage_meta (key) {
        key -> Text,
        value -> Text,
    }
}

diesel::joinable!(observations -> businesses (business_id));
diesel::joinable!(validations -> businesses (business_id));
diesel::joinable!(exclusions -> businesses (business_id));
diesel::joinable!(exports -> businesses (business_id));

diesel::allow_tables_to_appear_in_same_query!(
    businesses,
    observations,
    validations,
    exclusions,
    exports,
    storage_meta,
);
