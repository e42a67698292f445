//! The contract every collection schema implements.
//!
//! An [`Entity`] is the typed body of one collection. The shared CRUD
//! service drives every write through the same pipeline: split metadata
//! from the payload, reject server-managed fields, decode, normalise,
//! validate, then check references and uniqueness against the store.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::document::{Collection, DocumentId};
use super::validation::ValidationError;

/// Payload keys owned by the document metadata and never writable.
pub const SERVER_MANAGED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt", "deletedAt"];

/// How a query-string filter value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Matched as a string.
    Text,
    /// Parsed as a document identifier.
    Id,
    /// Parsed as `true` or `false`.
    Bool,
    /// Parsed as a whole number.
    Integer,
}

/// A body field that `getByX` queries may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    pub name: &'static str,
    pub kind: FilterKind,
}

impl FilterField {
    /// Text filter on `name`.
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FilterKind::Text,
        }
    }

    /// Identifier filter on `name`.
    #[must_use]
    pub const fn id(name: &'static str) -> Self {
        Self {
            name,
            kind: FilterKind::Id,
        }
    }

    /// Boolean filter on `name`.
    #[must_use]
    pub const fn flag(name: &'static str) -> Self {
        Self {
            name,
            kind: FilterKind::Bool,
        }
    }

    /// Integer filter on `name`.
    #[must_use]
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FilterKind::Integer,
        }
    }

    /// Convert a raw query-string value into the JSON value stored in bodies.
    ///
    /// # Errors
    /// [`ValidationError::InvalidFormat`] when the raw value does not parse.
    pub fn parse(&self, raw: &str) -> Result<Value, ValidationError> {
        let invalid = |expected| ValidationError::InvalidFormat {
            field: self.name,
            expected,
        };
        match self.kind {
            FilterKind::Text => Ok(Value::String(raw.to_owned())),
            FilterKind::Id => raw
                .parse::<DocumentId>()
                .map(|id| Value::String(id.to_string()))
                .map_err(|_| invalid("a document id")),
            FilterKind::Bool => raw
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|_| invalid("true or false")),
            FilterKind::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| invalid("a whole number")),
        }
    }
}

/// Whether a uniqueness rule also partitions by organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueScope {
    /// Unique across the whole store.
    Global,
    /// Unique within the document's organisation.
    Organisation,
}

/// A value that must not repeat among live documents of the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueKey {
    pub field: &'static str,
    pub value: Value,
    /// Additional equality constraints narrowing the scope (e.g. parent id).
    pub within: Vec<(&'static str, Value)>,
    pub scope: UniqueScope,
}

impl UniqueKey {
    /// Unique text value scoped by organisation.
    #[must_use]
    pub fn per_organisation(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: Value::String(value.to_owned()),
            within: Vec::new(),
            scope: UniqueScope::Organisation,
        }
    }

    /// Unique text value across every organisation.
    #[must_use]
    pub fn global(field: &'static str, value: &str) -> Self {
        Self {
            scope: UniqueScope::Global,
            ..Self::per_organisation(field, value)
        }
    }

    /// Unique value beneath a parent document.
    #[must_use]
    pub fn within_parent(
        field: &'static str,
        value: Value,
        parent_field: &'static str,
        parent: DocumentId,
    ) -> Self {
        Self {
            field,
            value,
            within: vec![(parent_field, Value::String(parent.to_string()))],
            scope: UniqueScope::Global,
        }
    }

    /// Every field/value pair the query must match.
    #[must_use]
    pub fn filters(&self) -> Vec<(String, Value)> {
        std::iter::once((self.field, self.value.clone()))
            .chain(self.within.iter().cloned())
            .map(|(name, value)| (name.to_owned(), value))
            .collect()
    }

    /// Human-readable value for error messages.
    #[must_use]
    pub fn display_value(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// A foreign-key style pointer that must resolve to a live document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub collection: Collection,
    pub id: DocumentId,
}

impl Reference {
    /// Required reference.
    #[must_use]
    pub const fn to(field: &'static str, collection: Collection, id: DocumentId) -> Self {
        Self {
            field,
            collection,
            id,
        }
    }

    /// Optional reference, skipped when absent.
    #[must_use]
    pub fn maybe(
        field: &'static str,
        collection: Collection,
        id: Option<DocumentId>,
    ) -> Option<Self> {
        id.map(|id| Self::to(field, collection, id))
    }
}

/// Typed body of one collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the entity is stored in.
    const COLLECTION: Collection;
    /// Body fields accepted as `getByX` filters.
    const FILTERS: &'static [FilterField] = &[];
    /// Body fields computed by the server and rejected in payloads.
    const DERIVED_FIELDS: &'static [&'static str] = &[];
    /// Whether the generic create/update/remove surface refuses writes.
    const READ_ONLY: bool = false;

    /// Check invariants that depend only on the body itself.
    ///
    /// # Errors
    /// The first violated rule.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Trim text and recompute derived fields before validation.
    fn normalise(&mut self) {}

    /// Values that must be unique among live documents.
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Documents this body points at.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}

/// Metadata supplied alongside a body in a create or update payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetaPatch {
    pub organisation_id: Option<DocumentId>,
    pub is_active: Option<bool>,
}

/// Split a client payload into metadata and body fields.
///
/// # Errors
/// [`ValidationError::ReadOnlyField`] for server-managed or derived keys and
/// [`ValidationError::InvalidPayload`] when the payload is not an object or
/// the metadata values have the wrong type.
pub fn split_payload(
    payload: Value,
    derived: &[&str],
) -> Result<(MetaPatch, Map<String, Value>), ValidationError> {
    let Value::Object(mut body) = payload else {
        return Err(ValidationError::InvalidPayload {
            message: "payload must be a JSON object".to_owned(),
        });
    };
    if let Some(field) = body
        .keys()
        .find(|key| SERVER_MANAGED_FIELDS.contains(&key.as_str()) || derived.contains(&key.as_str()))
    {
        return Err(ValidationError::ReadOnlyField {
            field: field.clone(),
        });
    }
    let mut meta = MetaPatch::default();
    if let Some(value) = body.remove("organisationId") {
        meta.organisation_id = serde_json::from_value(value).map_err(|err| {
            ValidationError::InvalidPayload {
                message: format!("organisationId: {err}"),
            }
        })?;
    }
    if let Some(value) = body.remove("isActive") {
        meta.is_active = Some(value.as_bool().ok_or_else(|| ValidationError::InvalidPayload {
            message: "isActive must be a boolean".to_owned(),
        })?);
    }
    Ok((meta, body))
}

/// Apply a top-level JSON merge patch; `null` removes the key.
pub fn merge_patch(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}

/// Decode, normalise and validate a body.
///
/// # Errors
/// Decoding failures or the first violated rule.
pub fn prepare<T: Entity>(body: Map<String, Value>) -> Result<T, ValidationError> {
    let mut entity: T =
        serde_json::from_value(Value::Object(body)).map_err(|err| ValidationError::InvalidPayload {
            message: err.to_string(),
        })?;
    entity.normalise();
    entity.validate()?;
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn split_moves_metadata_out_of_the_body() {
        let org = DocumentId::random();
        let (meta, body) = split_payload(
            json!({ "name": "Computing", "organisationId": org.to_string(), "isActive": false }),
            &[],
        )
        .expect("valid payload");
        assert_eq!(meta.organisation_id, Some(org));
        assert_eq!(meta.is_active, Some(false));
        assert_eq!(Value::Object(body), json!({ "name": "Computing" }));
    }

    #[rstest]
    #[case(json!({ "id": "x" }), "id")]
    #[case(json!({ "createdAt": "x" }), "createdAt")]
    #[case(json!({ "capacity": 10 }), "capacity")]
    fn split_rejects_managed_fields(#[case] payload: Value, #[case] field: &str) {
        let err = split_payload(payload, &["capacity"]).expect_err("rejected");
        assert_eq!(
            err,
            ValidationError::ReadOnlyField {
                field: field.to_owned()
            }
        );
    }

    #[rstest]
    fn split_rejects_non_objects() {
        assert!(matches!(
            split_payload(json!([1, 2]), &[]),
            Err(ValidationError::InvalidPayload { .. })
        ));
    }

    #[rstest]
    fn merge_patch_overwrites_and_clears() {
        let Value::Object(mut target) = json!({ "a": 1, "b": 2 }) else {
            panic!("fixture is an object");
        };
        let Value::Object(patch) = json!({ "a": 5, "b": null, "c": 3 }) else {
            panic!("fixture is an object");
        };
        merge_patch(&mut target, patch);
        assert_eq!(Value::Object(target), json!({ "a": 5, "c": 3 }));
    }

    #[rstest]
    #[case(FilterField::integer("level"), "6", json!(6))]
    #[case(FilterField::flag("isCore"), "true", json!(true))]
    #[case(FilterField::text("code"), "COMP", json!("COMP"))]
    fn filters_parse_into_body_values(
        #[case] filter: FilterField,
        #[case] raw: &str,
        #[case] expected: Value,
    ) {
        assert_eq!(filter.parse(raw).expect("parses"), expected);
    }

    #[rstest]
    fn id_filters_reject_garbage() {
        assert!(FilterField::id("teamId").parse("nope").is_err());
    }
}
