//! Esquema Diesel (mantenido a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    external_identity_links (tenant_id, provider, external_user_id) {
        tenant_id -> Text,
        provider -> Text,
        external_user_id -> Text,
        status -> Text,
        person_id -> Nullable<Text>,
        first_seen_at -> Timestamptz,
        last_seen_at -> Timestamptz,
        seen_count -> BigInt,
        last_seen_payload -> Jsonb,
    }
}

diesel::table! {
    punch_events (id) {
        id -> Uuid,
        tenant_id -> Text,
        person_id -> Text,
        provider -> Text,
        request_id -> Text,
        punch_type -> Text,
        punched_at -> Timestamptz,
        payload -> Jsonb,
        raw_payload -> Jsonb,
        device_info -> Jsonb,
        initiator_id -> Text,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    external_identity_links,
    punch_events,
);
