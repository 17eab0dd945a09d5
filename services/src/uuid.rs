use uuid::Uuid;

/// Deterministic UUIDv5 from an arbitrary string id (URL namespace).
pub fn stable_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}

/// Fresh random request identifier (UUIDv4, hyphenated).
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}
