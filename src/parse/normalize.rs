//! Canonicalization of raw CWL YAML, standing in for the reference parser.
//!
//! CWL allows several equivalent spellings for the same document: map-form
//! or list-form `inputs`/`outputs`/`steps`, bare-type input entries,
//! compact type suffixes, string step outputs, a single-string `scatter`,
//! and map-form `requirements`. Everything downstream (model construction
//! and round-trip comparison) works on the canonical form produced here:
//! list-form entries carrying `id` fields, `[null, T]` unions and
//! `{type: array, items}` mappings, `out` as a list of id strings.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::model::process::path_to_uri;
use crate::model::types::{parse_param_type, serialize_param_type};

/// Read, parse and canonicalize a CWL file.
///
/// The file's `file://` URI becomes the document id when the document does
/// not declare one.
pub fn normalize_path(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)?;
    let raw: Value = serde_yaml::from_str(&text).map_err(|err| Error::BadCwlProcessFile {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    normalize_document(raw, &path_to_uri(path))
}

/// Canonicalize an already-parsed document.
pub fn normalize_document(doc: Value, uri: &str) -> Result<Value> {
    let Value::Mapping(mut map) = doc else {
        return Err(Error::UnexpectedType(format!("{doc:?}")));
    };

    if !map.contains_key("id") {
        map.insert(Value::from("id"), Value::from(uri));
    }
    if !map.contains_key("cwlVersion") {
        map.insert(Value::from("cwlVersion"), Value::from("v1.2"));
    }

    if let Some(raw) = map.remove("requirements") {
        map.insert(Value::from("requirements"), normalize_requirements(raw)?);
    }
    for field in ["inputs", "outputs"] {
        if let Some(raw) = map.remove(field) {
            map.insert(Value::from(field), normalize_params(raw)?);
        }
    }
    if let Some(raw) = map.remove("steps") {
        map.insert(Value::from("steps"), normalize_steps(raw)?);
    }

    Ok(Value::Mapping(map))
}

/// Expand a map-form listing (`id -> entry`) into list form, folding the
/// key into an `id` field. A non-mapping entry value becomes `bare_field`.
fn listify(raw: Value, bare_field: &'static str) -> Result<Vec<Mapping>> {
    match raw {
        Value::Sequence(entries) => entries
            .into_iter()
            .map(|entry| match entry {
                Value::Mapping(map) => Ok(map),
                other => Err(Error::UnexpectedType(format!("{other:?}"))),
            })
            .collect(),
        Value::Mapping(entries) => {
            let mut listed = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                let id = key
                    .as_str()
                    .ok_or_else(|| Error::UnexpectedType(format!("{key:?}")))?
                    .to_string();
                let mut entry = Mapping::new();
                entry.insert(Value::from("id"), Value::from(id));
                match value {
                    Value::Mapping(body) => {
                        for (k, v) in body {
                            entry.insert(k, v);
                        }
                    }
                    bare => {
                        entry.insert(Value::from(bare_field), bare);
                    }
                }
                listed.push(entry);
            }
            Ok(listed)
        }
        other => Err(Error::UnexpectedType(format!("{other:?}"))),
    }
}

/// Canonicalize a parameter listing: list form plus canonical `type`.
fn normalize_params(raw: Value) -> Result<Value> {
    let mut entries = listify(raw, "type")?;
    for entry in &mut entries {
        if let Some(raw_type) = entry.remove("type") {
            let (ty, optional) = parse_param_type(&raw_type)?;
            entry.insert(Value::from("type"), serialize_param_type(&ty, optional));
        }
    }
    Ok(Value::Sequence(entries.into_iter().map(Value::Mapping).collect()))
}

fn normalize_steps(raw: Value) -> Result<Value> {
    let mut steps = listify(raw, "run")?;
    for step in &mut steps {
        if let Some(raw_in) = step.remove("in") {
            let entries = listify(raw_in, "source")?;
            step.insert(
                Value::from("in"),
                Value::Sequence(entries.into_iter().map(Value::Mapping).collect()),
            );
        }
        if let Some(raw_out) = step.remove("out") {
            let Value::Sequence(raw_out) = raw_out else {
                return Err(Error::UnexpectedType(format!("{raw_out:?}")));
            };
            let outputs = raw_out
                .into_iter()
                .map(|entry| match entry {
                    Value::String(id) => Ok(Value::from(id)),
                    Value::Mapping(map) => map
                        .get("id")
                        .and_then(Value::as_str)
                        .map(Value::from)
                        .ok_or_else(|| Error::MissingField {
                            context: "step output".into(),
                            field: "id",
                        }),
                    other => Err(Error::UnexpectedType(format!("{other:?}"))),
                })
                .collect::<Result<Vec<_>>>()?;
            step.insert(Value::from("out"), Value::Sequence(outputs));
        }
        // Single strings are allowed in CWL, so wrap them in a list.
        let single_scatter = match step.get("scatter") {
            Some(Value::String(scattered)) => Some(scattered.clone()),
            _ => None,
        };
        if let Some(scattered) = single_scatter {
            step.insert(Value::from("scatter"), Value::Sequence(vec![Value::from(scattered)]));
        }
    }
    Ok(Value::Sequence(steps.into_iter().map(Value::Mapping).collect()))
}

fn normalize_requirements(raw: Value) -> Result<Value> {
    match raw {
        Value::Sequence(_) => Ok(raw),
        Value::Mapping(entries) => {
            let mut listed = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                let class = key
                    .as_str()
                    .ok_or_else(|| Error::UnexpectedType(format!("{key:?}")))?
                    .to_string();
                let mut entry = Mapping::new();
                entry.insert(Value::from("class"), Value::from(class));
                if let Value::Mapping(body) = value {
                    for (k, v) in body {
                        entry.insert(k, v);
                    }
                }
                listed.push(Value::Mapping(entry));
            }
            Ok(Value::Sequence(listed))
        }
        other => Err(Error::UnexpectedType(format!("{other:?}"))),
    }
}
