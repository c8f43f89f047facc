//! Meta-schema: composes per-segment schemas into one request/response
//! schema.
//!
//! A wire message is made of named segments (for HTTP: path, query, body,
//! headers), each owned by its own [`Schema`]. The [`MetaSchema`] routes
//! call fields to the segment that declares them on the way out, and
//! merges per-segment fields back into one flat map on the way in.
//!
//! Segments must declare disjoint field keys. That is validated exactly
//! once, when [`MetaSchemaBuilder::build`] runs, so per-call serialization
//! never re-checks and an ambiguous composition fails before the first
//! request is made.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::schema::{FieldMap, Schema};
use crate::{Error, Result};

/// Serialized wire payloads, keyed by segment name.
pub type SegmentMap = BTreeMap<String, Value>;

/// An ordered composition of named segment schemas with disjoint keys.
#[derive(Clone)]
pub struct MetaSchema {
    segments: Arc<[Segment]>,
}

/// One segment with its owned keys, computed once at build time.
struct Segment {
    name: String,
    schema: Arc<dyn Schema>,
    keys: Vec<String>,
}

impl fmt::Debug for MetaSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.segments.iter().map(|s| s.name.as_str()).collect();
        f.debug_struct("MetaSchema").field("segments", &names).finish()
    }
}

impl MetaSchema {
    /// Starts an empty composition.
    pub fn builder() -> MetaSchemaBuilder {
        MetaSchemaBuilder::default()
    }

    /// All field keys owned across all segments.
    pub fn keys(&self) -> Vec<String> {
        self.segments
            .iter()
            .flat_map(|segment| segment.keys.iter().cloned())
            .collect()
    }

    /// Routes each field to the segment owning it and serializes every
    /// segment, omitting segments with nothing to contribute.
    ///
    /// Fields no segment owns are dropped, not errors: one field map may
    /// feed request and response schemas with different vocabularies.
    pub fn serialize(&self, fields: &FieldMap) -> Result<SegmentMap> {
        let mut payloads = SegmentMap::new();
        for segment in self.segments.iter() {
            let subset: FieldMap = fields
                .iter()
                .filter(|(field, _)| segment.keys.iter().any(|key| key == *field))
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect();
            if let Some(payload) = segment.schema.serialize(&subset)? {
                payloads.insert(segment.name.clone(), payload);
            }
        }
        Ok(payloads)
    }

    /// Deserializes every segment's payload and merges the results.
    ///
    /// A segment absent from `payloads` is deserialized from nothing,
    /// which its schema may accept or reject. Fields a schema reports as
    /// absent are dropped from the merged map. Segment names no schema
    /// claims are ignored.
    pub fn deserialize(&self, payloads: &SegmentMap) -> Result<FieldMap> {
        let mut fields = FieldMap::new();
        for segment in self.segments.iter() {
            for (field, value) in segment.schema.deserialize(payloads.get(&segment.name))? {
                if let Some(value) = value {
                    fields.insert(field, value);
                }
            }
        }
        Ok(fields)
    }
}

/// Accumulates named segments and validates key disjointness on build.
#[derive(Default)]
pub struct MetaSchemaBuilder {
    segments: Vec<(String, Arc<dyn Schema>, Option<Vec<String>>)>,
}

impl MetaSchemaBuilder {
    /// Adds a segment owning the keys its schema declares. Order is
    /// preserved and becomes the serialization order.
    pub fn segment(mut self, name: impl Into<String>, schema: impl Schema + 'static) -> Self {
        self.segments.push((name.into(), Arc::new(schema), None));
        self
    }

    /// Adds a segment behind an existing shared schema.
    pub fn shared_segment(mut self, name: impl Into<String>, schema: Arc<dyn Schema>) -> Self {
        self.segments.push((name.into(), schema, None));
        self
    }

    /// Adds a segment with an explicit owned-key set instead of the keys
    /// the schema declares.
    ///
    /// For schemas that cannot report their keys, such as ad hoc
    /// passthroughs written against a single endpoint. Overridden keys
    /// participate in routing and collision detection exactly like
    /// declared ones.
    pub fn segment_with_keys(
        mut self,
        name: impl Into<String>,
        schema: impl Schema + 'static,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let keys = keys.into_iter().map(Into::into).collect();
        self.segments.push((name.into(), Arc::new(schema), Some(keys)));
        self
    }

    /// Validates that segment names are unique and field keys disjoint,
    /// then freezes the composition.
    ///
    /// Key ownership is computed here, exactly once; serialization never
    /// re-derives it.
    pub fn build(self) -> Result<MetaSchema> {
        let mut seen_segments: Vec<&str> = Vec::new();
        for (name, _, _) in &self.segments {
            if seen_segments.contains(&name.as_str()) {
                return Err(Error::Config(format!(
                    "segment {name:?} registered more than once"
                )));
            }
            seen_segments.push(name);
        }

        let mut effective: Vec<Vec<String>> = Vec::with_capacity(self.segments.len());
        for (_, schema, keys) in &self.segments {
            effective.push(match keys {
                Some(keys) => keys.clone(),
                None => schema.keys(),
            });
        }

        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        for ((name, _, _), keys) in self.segments.iter().zip(&effective) {
            let mut collided: Vec<String> = Vec::new();
            let mut first = "";
            for key in keys {
                match owners.get(key.as_str()) {
                    Some(owner) => {
                        first = owner;
                        collided.push(key.clone());
                    }
                    None => {
                        owners.insert(key, name);
                    }
                }
            }
            if !collided.is_empty() {
                return Err(Error::SchemaCollision {
                    first: first.to_string(),
                    second: name.clone(),
                    keys: collided,
                });
            }
        }

        let segments: Vec<Segment> = self
            .segments
            .into_iter()
            .zip(effective)
            .map(|((name, schema, _), keys)| Segment { name, schema, keys })
            .collect();
        Ok(MetaSchema {
            segments: segments.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{to_fields, EmptySchema, ObjectSchema, SegmentFields, ValueSchema};
    use serde_json::json;

    /// A schema that forwards whatever it is given and declares no keys.
    #[derive(Debug)]
    struct Passthrough;

    impl Schema for Passthrough {
        fn serialize(&self, fields: &FieldMap) -> Result<Option<Value>> {
            if fields.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Value::Object(fields.clone())))
            }
        }

        fn deserialize(&self, raw: Option<&Value>) -> Result<SegmentFields> {
            let mut fields = SegmentFields::new();
            if let Some(Value::Object(map)) = raw {
                for (key, value) in map {
                    fields.insert(key.clone(), Some(value.clone()));
                }
            }
            Ok(fields)
        }
    }

    fn sample() -> MetaSchema {
        MetaSchema::builder()
            .segment("path", ObjectSchema::new().required("id"))
            .segment("query", ObjectSchema::new().optional("filter"))
            .segment("body", ValueSchema::new("content"))
            .build()
            .unwrap()
    }

    #[test]
    fn serialize_routes_fields_to_their_segments() {
        let schema = sample();
        let fields = to_fields(json!({
            "id": "volume-1",
            "filter": "active",
            "content": { "size": 10 },
        }))
        .unwrap();

        let payloads = schema.serialize(&fields).unwrap();
        assert_eq!(payloads.get("path"), Some(&json!({ "id": "volume-1" })));
        assert_eq!(payloads.get("query"), Some(&json!({ "filter": "active" })));
        assert_eq!(payloads.get("body"), Some(&json!({ "size": 10 })));
    }

    #[test]
    fn serialize_omits_segments_with_nothing_to_say() {
        let schema = sample();
        let fields = to_fields(json!({ "id": "volume-1" })).unwrap();

        let payloads = schema.serialize(&fields).unwrap();
        assert!(payloads.contains_key("path"));
        assert!(!payloads.contains_key("query"));
        assert!(!payloads.contains_key("body"));
    }

    #[test]
    fn serialize_drops_undeclared_fields() {
        let schema = sample();
        let fields = to_fields(json!({ "id": "v", "undeclared": true })).unwrap();

        let payloads = schema.serialize(&fields).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads.get("path"), Some(&json!({ "id": "v" })));
    }

    #[test]
    fn deserialize_merges_segments_and_drops_absent_fields() {
        let schema = MetaSchema::builder()
            .segment("body", ObjectSchema::new().required("id").optional("tag"))
            .segment("headers", ObjectSchema::new().optional("etag"))
            .build()
            .unwrap();

        let mut payloads = SegmentMap::new();
        payloads.insert("body".into(), json!({ "id": "v", "extra": 1 }));
        payloads.insert("unclaimed".into(), json!("ignored"));

        let fields = schema.deserialize(&payloads).unwrap();
        assert_eq!(fields.get("id"), Some(&json!("v")));
        assert!(!fields.contains_key("tag"));
        assert!(!fields.contains_key("etag"));
        assert!(!fields.contains_key("extra"));
        assert!(!fields.contains_key("unclaimed"));
    }

    #[test]
    fn deserialize_still_enforces_required_fields() {
        let schema = MetaSchema::builder()
            .segment("body", ObjectSchema::new().required("id"))
            .build()
            .unwrap();

        let err = schema.deserialize(&SegmentMap::new()).unwrap_err();
        assert!(matches!(err, Error::MissingField { field } if field == "id"));
    }

    #[test]
    fn build_rejects_overlapping_segment_keys() {
        let err = MetaSchema::builder()
            .segment("query", ObjectSchema::new().optional("id"))
            .segment("body", ObjectSchema::new().required("id"))
            .build()
            .unwrap_err();

        match err {
            Error::SchemaCollision { first, second, keys } => {
                assert_eq!(first, "query");
                assert_eq!(second, "body");
                assert_eq!(keys, vec!["id".to_string()]);
            }
            other => panic!("expected a collision, got {other:?}"),
        }
    }

    #[test]
    fn build_rejects_duplicate_segment_names() {
        let err = MetaSchema::builder()
            .segment("body", EmptySchema)
            .segment("body", EmptySchema)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn keyless_segments_never_collide() {
        let schema = MetaSchema::builder()
            .segment("body", EmptySchema)
            .segment("headers", ObjectSchema::new().optional("etag"))
            .build();
        assert!(schema.is_ok());
    }

    #[test]
    fn single_segment_fields_survive_a_round_trip() {
        let schema = MetaSchema::builder()
            .segment("body", ObjectSchema::new().required("id").optional("tag"))
            .build()
            .unwrap();
        let fields = to_fields(json!({ "id": "v-1", "tag": "hot" })).unwrap();

        let payloads = schema.serialize(&fields).unwrap();
        assert_eq!(schema.deserialize(&payloads).unwrap(), fields);
    }

    #[test]
    fn key_overrides_route_fields_to_schemas_that_declare_none() {
        let schema = MetaSchema::builder()
            .segment("path", ObjectSchema::new().required("id"))
            .segment_with_keys("auth", Passthrough, ["token"])
            .build()
            .unwrap();
        let fields = to_fields(json!({ "id": "v", "token": "t-1" })).unwrap();

        let payloads = schema.serialize(&fields).unwrap();
        assert_eq!(payloads.get("auth"), Some(&json!({ "token": "t-1" })));
        assert_eq!(schema.keys(), vec!["id".to_string(), "token".to_string()]);
    }

    #[test]
    fn overridden_keys_collide_like_declared_ones() {
        let err = MetaSchema::builder()
            .segment("path", ObjectSchema::new().required("id"))
            .segment_with_keys("auth", Passthrough, ["id"])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::SchemaCollision { .. }));
    }
}
