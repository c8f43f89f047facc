//! Schemas convert between named call fields and wire payloads.
//!
//! A [`Schema`] is the capability pair every other component composes
//! around: `serialize` turns call fields into one wire payload,
//! `deserialize` turns one wire payload back into named fields. Schemas
//! declare the field keys they own via [`Schema::keys`], which is how a
//! [`MetaSchema`](crate::MetaSchema) routes fields to segments and detects
//! collisions.
//!
//! Absence is modelled with `Option`, never with in-band sentinel values:
//! a serializer returning `None` contributed nothing to the wire, and a
//! deserialized field mapped to `None` was declared but absent from the
//! response.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{Error, Result};

/// Named call fields: the currency between callers, schemas, and servlets.
pub type FieldMap = serde_json::Map<String, Value>;

/// Fields produced by deserializing one wire payload.
///
/// `None` marks a field the schema declares but the payload did not carry;
/// such fields are dropped when segments are merged.
pub type SegmentFields = BTreeMap<String, Option<Value>>;

/// Converts a JSON value into a [`FieldMap`], failing on non-objects.
///
/// # Examples
///
/// ```
/// use apiweave::to_fields;
/// use serde_json::json;
///
/// let fields = to_fields(json!({ "id": "x" })).unwrap();
/// assert_eq!(fields.get("id"), Some(&json!("x")));
///
/// assert!(to_fields(json!(42)).is_err());
/// ```
pub fn to_fields(value: Value) -> Result<FieldMap> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Serialize {
            detail: format!("call arguments must be an object, got {other}"),
        }),
    }
}

/// The serialize/deserialize capability pair.
///
/// Implementations are plugged into a [`MetaSchema`](crate::MetaSchema)
/// segment or written ad hoc for one API. They must be stateless with
/// respect to calls: one schema instance is shared across every request a
/// client makes.
pub trait Schema: Send + Sync {
    /// The field keys this schema declares.
    ///
    /// Used once at composition time for routing and collision detection.
    /// Schemas that pass payloads through wholesale may declare nothing.
    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Serializes the given fields into one wire payload.
    ///
    /// Returns `Ok(None)` when there is nothing to put on the wire, in
    /// which case the segment is omitted from the request entirely.
    fn serialize(&self, fields: &FieldMap) -> Result<Option<Value>>;

    /// Deserializes one wire payload back into named fields.
    ///
    /// `raw` is `None` when the response carried no payload for this
    /// segment at all.
    fn deserialize(&self, raw: Option<&Value>) -> Result<SegmentFields>;
}

/// A schema that declares nothing and produces nothing.
///
/// Useful as the request schema of argument-less calls or the response
/// schema of calls whose body is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySchema;

impl Schema for EmptySchema {
    fn serialize(&self, _fields: &FieldMap) -> Result<Option<Value>> {
        Ok(None)
    }

    fn deserialize(&self, _raw: Option<&Value>) -> Result<SegmentFields> {
        Ok(SegmentFields::new())
    }
}

/// A schema that moves one segment payload wholesale under a single field
/// name, without inspecting it.
///
/// Serializing takes the named field's value as the entire payload;
/// deserializing hands the entire payload back under that name. This is
/// the escape hatch for endpoints whose bodies are opaque to the caller.
///
/// # Examples
///
/// ```
/// use apiweave::{Schema, ValueSchema};
/// use serde_json::json;
///
/// let schema = ValueSchema::new("content");
/// let fields = apiweave::to_fields(json!({ "content": [1, 2, 3] })).unwrap();
///
/// let payload = schema.serialize(&fields).unwrap();
/// assert_eq!(payload, Some(json!([1, 2, 3])));
/// ```
#[derive(Debug, Clone)]
pub struct ValueSchema {
    name: String,
}

impl ValueSchema {
    /// Creates a schema owning the single field `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Schema for ValueSchema {
    fn keys(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn serialize(&self, fields: &FieldMap) -> Result<Option<Value>> {
        Ok(fields.get(&self.name).cloned())
    }

    fn deserialize(&self, raw: Option<&Value>) -> Result<SegmentFields> {
        let mut fields = SegmentFields::new();
        fields.insert(self.name.clone(), raw.cloned());
        Ok(fields)
    }
}

/// A schema for JSON-object payloads with declared, individually required
/// or optional fields.
///
/// Serializing picks the declared fields out of the input and errors on a
/// missing required field; when nothing applies the whole payload is
/// absent. Deserializing reads the declared fields out of the payload
/// object, marks missing optional fields absent, and ignores undeclared
/// keys.
///
/// # Examples
///
/// ```
/// use apiweave::{ObjectSchema, Schema};
/// use serde_json::json;
///
/// let schema = ObjectSchema::new().required("id").optional("tag");
/// let fields = apiweave::to_fields(json!({ "id": "x", "ignored": 9 })).unwrap();
///
/// let payload = schema.serialize(&fields).unwrap();
/// assert_eq!(payload, Some(json!({ "id": "x" })));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, bool)>,
}

impl ObjectSchema {
    /// Creates a schema with no fields; chain [`required`](Self::required)
    /// and [`optional`](Self::optional) to declare them.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field that must be present on both sides.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.fields.push((name.into(), true));
        self
    }

    /// Declares a field that may be absent on either side.
    pub fn optional(mut self, name: impl Into<String>) -> Self {
        self.fields.push((name.into(), false));
        self
    }
}

impl Schema for ObjectSchema {
    fn keys(&self) -> Vec<String> {
        self.fields.iter().map(|(name, _)| name.clone()).collect()
    }

    fn serialize(&self, fields: &FieldMap) -> Result<Option<Value>> {
        let mut out = FieldMap::new();
        for (name, required) in &self.fields {
            match fields.get(name) {
                Some(value) => {
                    out.insert(name.clone(), value.clone());
                }
                None if *required => {
                    return Err(Error::MissingField {
                        field: name.clone(),
                    })
                }
                None => {}
            }
        }
        if out.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Value::Object(out)))
        }
    }

    fn deserialize(&self, raw: Option<&Value>) -> Result<SegmentFields> {
        let object = match raw {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(Error::Deserialize {
                    detail: format!("expected an object payload, got {other}"),
                })
            }
        };

        let mut fields = SegmentFields::new();
        for (name, required) in &self.fields {
            let value = object.and_then(|map| map.get(name));
            match value {
                Some(value) => {
                    fields.insert(name.clone(), Some(value.clone()));
                }
                None if *required => {
                    return Err(Error::MissingField {
                        field: name.clone(),
                    })
                }
                None => {
                    fields.insert(name.clone(), None);
                }
            }
        }
        Ok(fields)
    }
}
