//! Default client-identity generation. A context's `uuid` defaults to a
//! freshly generated v4 UUID unless the caller sets one explicitly via
//! `set_uuid`.

pub fn generate() -> String {
    uuid::Uuid::new_v4().to_string()
}
