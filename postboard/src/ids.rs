//! Identifiers for requests and stored entities
//!
//! Request ids follow the TypeID format (`req_<base32 uuidv7>`) so they sort by
//! time in logs. Entity ids are plain hyphenated UUIDv7 strings, which is what
//! the `id` columns store.

use std::fmt;

use http::Request;
use mti::prelude::*;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};

/// Time-sortable identifier attached to every inbound request
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    pub const PREFIX: &'static str = "req";

    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `MakeRequestId` for tower-http's `SetRequestIdLayer`
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let id = RequestId::new();
        let header_value = http::HeaderValue::from_str(id.as_str()).ok()?;
        Some(TowerRequestId::new(header_value))
    }
}

/// Fresh primary key for a new row
#[must_use]
pub fn new_entity_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_format() {
        let id = RequestId::new();
        assert!(id.as_str().starts_with("req_"));
        // prefix (3) + underscore (1) + suffix (26)
        assert_eq!(id.as_str().len(), 30);
    }

    #[test]
    fn test_make_typed_request_id() {
        let mut maker = MakeTypedRequestId;
        let request = http::Request::builder().body(()).unwrap();

        let header_value = maker.make_request_id(&request).unwrap().into_header_value();
        assert!(header_value.to_str().unwrap().starts_with("req_"));
    }

    #[test]
    fn test_entity_ids_are_unique_uuids() {
        let a = new_entity_id();
        let b = new_entity_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }
}
