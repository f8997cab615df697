//! The CWL type system: basic kinds, recursive arrays, and the native
//! values that can be bound to them.
//!
//! CWL writes types in three shapes — a bare name (`string`), a compact
//! suffix notation (`string[]`, `int?`) and an explicit mapping
//! (`{type: array, items: …}`). Optionality is encoded as a two-element
//! `[null, T]` union and lives on the parameter, not on the type itself.

use std::fmt;
use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};

// =============================================================================
// BASIC KINDS
// =============================================================================

/// The closed set of scalar CWL types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    File,
    Directory,
}

impl BasicKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasicKind::Null => "null",
            BasicKind::Boolean => "boolean",
            BasicKind::Int => "int",
            BasicKind::Long => "long",
            BasicKind::Float => "float",
            BasicKind::Double => "double",
            BasicKind::String => "string",
            BasicKind::File => "File",
            BasicKind::Directory => "Directory",
        }
    }

    pub fn from_name(name: &str) -> Option<BasicKind> {
        match name {
            "null" => Some(BasicKind::Null),
            "boolean" => Some(BasicKind::Boolean),
            "int" => Some(BasicKind::Int),
            "long" => Some(BasicKind::Long),
            "float" => Some(BasicKind::Float),
            "double" => Some(BasicKind::Double),
            "string" => Some(BasicKind::String),
            "File" => Some(BasicKind::File),
            "Directory" => Some(BasicKind::Directory),
            _ => None,
        }
    }

    /// Check whether a native value is an instance of this kind.
    fn is_valid(&self, value: &CwlValue) -> bool {
        match self {
            BasicKind::String => matches!(value, CwlValue::Str(_)),
            BasicKind::Int | BasicKind::Long => matches!(value, CwlValue::Int(_)),
            BasicKind::Float | BasicKind::Double => matches!(value, CwlValue::Float(_)),
            BasicKind::File | BasicKind::Directory => matches!(value, CwlValue::Path(_)),
            BasicKind::Boolean => matches!(value, CwlValue::Bool(_)),
            BasicKind::Null => false,
        }
    }

    /// Serialize a native value to its CWL job-input representation.
    ///
    /// File-like kinds become `{class, location}` mappings, everything else
    /// passes through unchanged.
    fn serialize_value(&self, value: &CwlValue) -> Value {
        match (self, value) {
            (BasicKind::File, CwlValue::Path(path)) => file_literal("File", path),
            (BasicKind::Directory, CwlValue::Path(path)) => file_literal("Directory", path),
            _ => value.to_value(),
        }
    }
}

fn file_literal(class: &str, path: &PathBuf) -> Value {
    let mut map = Mapping::new();
    map.insert(Value::from("class"), Value::from(class));
    map.insert(
        Value::from("location"),
        Value::from(path.to_string_lossy().into_owned()),
    );
    Value::Mapping(map)
}

// =============================================================================
// TYPES
// =============================================================================

/// A CWL type: a basic kind or an arbitrarily nested array.
///
/// Equality is structural — two `string[][]` values compare equal
/// regardless of how they were built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CwlType {
    Basic(BasicKind),
    Array(Box<CwlType>),
}

impl CwlType {
    pub fn basic(kind: BasicKind) -> CwlType {
        CwlType::Basic(kind)
    }

    pub fn array(items: CwlType) -> CwlType {
        CwlType::Array(Box::new(items))
    }

    /// Parse a type from its document representation.
    ///
    /// Accepts the bare-name, suffix and mapping shapes. The `[null, T]`
    /// union is handled one level up by [`parse_param_type`], so a list is
    /// always an error here.
    pub fn from_value(raw: &Value) -> Result<CwlType> {
        match raw {
            Value::String(name) => Self::from_notation(name),
            Value::Mapping(map) => {
                let kind = map.get("type").and_then(Value::as_str);
                if kind != Some("array") {
                    return Err(Error::UnexpectedType(format!("{raw:?}")));
                }
                let items = map
                    .get("items")
                    .ok_or_else(|| Error::UnexpectedType(format!("{raw:?}")))?;
                Ok(CwlType::array(Self::from_value(items)?))
            }
            other => Err(Error::UnexpectedType(format!("{other:?}"))),
        }
    }

    /// Parse the compact textual notation (`string`, `File[]`, `int[][]`).
    pub fn from_notation(name: &str) -> Result<CwlType> {
        if let Some(inner) = name.strip_suffix("[]") {
            return Ok(CwlType::array(Self::from_notation(inner)?));
        }
        BasicKind::from_name(name)
            .map(CwlType::Basic)
            .ok_or_else(|| Error::UnexpectedType(name.to_string()))
    }

    /// Serialize back to the document representation: a name string for
    /// basic kinds, a `{type: array, items}` mapping for arrays.
    pub fn to_value(&self) -> Value {
        match self {
            CwlType::Basic(kind) => Value::from(kind.as_str()),
            CwlType::Array(items) => {
                let mut map = Mapping::new();
                map.insert(Value::from("type"), Value::from("array"));
                map.insert(Value::from("items"), items.to_value());
                Value::Mapping(map)
            }
        }
    }

    /// Check whether a native value is an instance of this type.
    ///
    /// Arrays validate only against homogeneous lists: every element must
    /// satisfy the item type.
    pub fn is_valid(&self, value: &CwlValue) -> bool {
        match self {
            CwlType::Basic(kind) => kind.is_valid(value),
            CwlType::Array(items) => match value {
                CwlValue::List(elems) => elems.iter().all(|elem| items.is_valid(elem)),
                _ => false,
            },
        }
    }

    /// Serialize a native value to the CWL job-input representation.
    pub fn serialize_value(&self, value: &CwlValue) -> Value {
        match self {
            CwlType::Basic(kind) => kind.serialize_value(value),
            CwlType::Array(items) => match value {
                CwlValue::List(elems) => {
                    Value::Sequence(elems.iter().map(|elem| items.serialize_value(elem)).collect())
                }
                other => other.to_value(),
            },
        }
    }
}

/// Parse a parameter type declaration, deriving optionality.
///
/// A `T?` suffix or a two-element `[null, T]` union marks the parameter
/// optional; any other list shape is an error.
pub fn parse_param_type(raw: &Value) -> Result<(CwlType, bool)> {
    if let Value::String(name) = raw {
        if let Some(inner) = name.strip_suffix('?') {
            let ty = CwlType::from_notation(inner)?;
            return Ok((ty, true));
        }
    }
    if let Value::Sequence(members) = raw {
        if members.len() == 2 && is_null_marker(&members[0]) {
            let ty = CwlType::from_value(&members[1])?;
            return Ok((ty, true));
        }
        return Err(Error::UnexpectedType(format!("{raw:?}")));
    }
    Ok((CwlType::from_value(raw)?, false))
}

/// Re-emit a parameter type declaration, restoring the `[null, T]` union
/// for optional parameters.
pub fn serialize_param_type(ty: &CwlType, optional: bool) -> Value {
    if optional {
        Value::Sequence(vec![Value::from("null"), ty.to_value()])
    } else {
        ty.to_value()
    }
}

fn is_null_marker(value: &Value) -> bool {
    matches!(value, Value::Null) || value.as_str() == Some("null")
}

impl fmt::Display for CwlType {
    /// Render the compact notation, e.g. `string` or `Directory[][]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CwlType::Basic(kind) => write!(f, "{}", kind.as_str()),
            CwlType::Array(items) => write!(f, "{}[]", items),
        }
    }
}

// =============================================================================
// NATIVE VALUES
// =============================================================================

/// A native value assignable to a step input.
#[derive(Debug, Clone, PartialEq)]
pub enum CwlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    List(Vec<CwlValue>),
}

impl CwlValue {
    /// The raw document representation, ignoring any declared type.
    pub fn to_value(&self) -> Value {
        match self {
            CwlValue::Null => Value::Null,
            CwlValue::Bool(b) => Value::from(*b),
            CwlValue::Int(i) => Value::from(*i),
            CwlValue::Float(x) => Value::from(*x),
            CwlValue::Str(s) => Value::from(s.as_str()),
            CwlValue::Path(p) => Value::from(p.to_string_lossy().into_owned()),
            CwlValue::List(elems) => {
                Value::Sequence(elems.iter().map(CwlValue::to_value).collect())
            }
        }
    }
}

impl From<bool> for CwlValue {
    fn from(v: bool) -> Self {
        CwlValue::Bool(v)
    }
}

impl From<i64> for CwlValue {
    fn from(v: i64) -> Self {
        CwlValue::Int(v)
    }
}

impl From<f64> for CwlValue {
    fn from(v: f64) -> Self {
        CwlValue::Float(v)
    }
}

impl From<&str> for CwlValue {
    fn from(v: &str) -> Self {
        CwlValue::Str(v.to_string())
    }
}

impl From<String> for CwlValue {
    fn from(v: String) -> Self {
        CwlValue::Str(v)
    }
}

impl From<PathBuf> for CwlValue {
    fn from(v: PathBuf) -> Self {
        CwlValue::Path(v)
    }
}

impl From<&std::path::Path> for CwlValue {
    fn from(v: &std::path::Path) -> Self {
        CwlValue::Path(v.to_path_buf())
    }
}

impl<T: Into<CwlValue>> From<Vec<T>> for CwlValue {
    fn from(v: Vec<T>) -> Self {
        CwlValue::List(v.into_iter().map(Into::into).collect())
    }
}
