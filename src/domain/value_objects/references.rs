use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A related-entity field as it arrives on the wire: one reference string,
/// a list of reference strings, or an inline payload to create the entity.
/// Untagged so request bodies can carry any of the three shapes directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef<P> {
    Reference(String),
    References(Vec<String>),
    Inline(P),
}

/// Storage identifiers produced by resolving an [`EntityRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRef {
    One(Uuid),
    Many(Vec<Uuid>),
}
