//! Node Shape Classification
//!
//! Classifies a schema node once into a tagged shape so the parser can
//! dispatch exhaustively instead of re-testing structure at every decision
//! point. This is pure pattern detection; no codegen decisions happen here.

use serde_json::{Map, Value};

/// JSON scalar type (before lowering to a builder)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl PrimitiveKind {
    pub fn from_type_name(type_str: &str) -> Option<Self> {
        match type_str {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }
}

/// Combinator keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinatorKind {
    AllOf,
    AnyOf,
    OneOf,
}

/// Shape of one schema node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeShape<'a> {
    /// Boolean schema: `true` admits anything, `false` admits nothing
    Bool(bool),
    /// `{"$ref": "..."}`
    Ref(&'a str),
    /// `allOf` / `anyOf` / `oneOf`
    Combinator(CombinatorKind, &'a Vec<Value>),
    /// `{"enum": [...]}`
    Enum(&'a Vec<Value>),
    /// `{"const": ...}`
    Const(&'a Value),
    /// `{"not": {...}}`
    Not(&'a Value),
    /// `if`/`then`/`else`
    Conditional {
        then: Option<&'a Value>,
        otherwise: Option<&'a Value>,
    },
    /// Object schema (has `type: object` or `properties`)
    Object(&'a Map<String, Value>),
    /// Array schema (has `type: array` or `items`)
    Array(&'a Map<String, Value>),
    /// Scalar type
    Primitive(PrimitiveKind),
    /// Anything not recognized above
    Unknown,
}

/// Classify a schema node. Performed once per node, before dispatch.
pub fn classify(node: &Value) -> NodeShape<'_> {
    let obj = match node {
        Value::Bool(b) => return NodeShape::Bool(*b),
        Value::Object(obj) => obj,
        _ => return NodeShape::Unknown,
    };

    if let Some(target) = obj.get("$ref").and_then(|v| v.as_str()) {
        return NodeShape::Ref(target);
    }

    if let Some(values) = obj.get("enum").and_then(|v| v.as_array()) {
        return NodeShape::Enum(values);
    }

    if let Some(value) = obj.get("const") {
        return NodeShape::Const(value);
    }

    for (keyword, kind) in [
        ("allOf", CombinatorKind::AllOf),
        ("anyOf", CombinatorKind::AnyOf),
        ("oneOf", CombinatorKind::OneOf),
    ] {
        if let Some(items) = obj.get(keyword).and_then(|v| v.as_array()) {
            return NodeShape::Combinator(kind, items);
        }
    }

    if obj.contains_key("if") {
        return NodeShape::Conditional {
            then: obj.get("then"),
            otherwise: obj.get("else"),
        };
    }

    if let Some(inner) = obj.get("not") {
        return NodeShape::Not(inner);
    }

    let type_name = obj.get("type").and_then(|v| v.as_str());

    if type_name == Some("object") || obj.contains_key("properties") {
        return NodeShape::Object(obj);
    }

    if type_name == Some("array") || obj.contains_key("items") {
        return NodeShape::Array(obj);
    }

    if let Some(kind) = type_name.and_then(PrimitiveKind::from_type_name) {
        return NodeShape::Primitive(kind);
    }

    NodeShape::Unknown
}
