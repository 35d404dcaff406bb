//! Noise-aware structural JSON comparison.
//!
//! Two documents match when, after removing their noisy fields, objects
//! have the same key sets with matching values, arrays hold the same
//! elements (as a multiset by default, positionally under
//! [`ArrayMatch::Strict`]) and scalars are equal.

pub mod http;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Noise;

/// Why a comparison could not be performed.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// One side is not valid JSON.
    #[error("{side} is not valid json: {source}")]
    InvalidJson {
        /// `expected` or `actual`.
        side: &'static str,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },

    /// The two documents have different top-level types.
    #[error("type mismatch: expected {expected}, actual {actual}")]
    TypeMismatch {
        /// Type of the expected document.
        expected: &'static str,
        /// Type of the actual document.
        actual: &'static str,
    },

    /// A value kind with no JSON counterpart.
    #[error("type not registered for json: {0}")]
    TypeNotRegistered(String),

    /// A noise hint is not a valid regular expression.
    #[error("invalid noise hint `{pattern}` for `{path}`: {source}")]
    InvalidHint {
        /// Noise path the hint belongs to.
        path: String,
        /// Offending pattern.
        pattern: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },
}

/// How arrays are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayMatch {
    /// Each expected element pairs with a distinct actual element.
    #[default]
    Unordered,
    /// Elements are compared position by position.
    Strict,
}

/// One noise entry split into segments, with compiled hints.
struct NoisePath {
    segments: Vec<String>,
    hints: Vec<Regex>,
}

/// Borrowed view of a [`NoisePath`] shifted to the current depth.
type Shifted<'a> = (&'a [String], &'a [Regex]);

fn compile(noise: &Noise) -> Result<Vec<NoisePath>, MatchError> {
    noise
        .iter()
        .map(|(path, hints)| {
            let hints = hints
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|source| MatchError::InvalidHint {
                        path: path.clone(),
                        pattern: pattern.clone(),
                        source,
                    })
                })
                .collect::<Result<_, _>>()?;
            let segments = path.split('.').filter(|s| !s.is_empty()).map(String::from).collect();
            Ok(NoisePath { segments, hints })
        })
        .collect()
}

fn shifted(paths: &[NoisePath]) -> Vec<Shifted<'_>> {
    paths.iter().map(|p| (p.segments.as_slice(), p.hints.as_slice())).collect()
}

/// Text a hint is matched against.
fn hint_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn hinted(value: &Value, hints: &[Regex]) -> bool {
    hints.is_empty() || {
        let text = hint_text(value);
        hints.iter().any(|re| re.is_match(&text))
    }
}

/// Removes noisy fields from `value`, and the same fields from `twin` when
/// one is given. Hints are checked against `value` only.
fn strip(value: &mut Value, mut twin: Option<&mut Value>, paths: &[Shifted<'_>]) {
    match value {
        Value::Object(map) => {
            for (segments, hints) in paths {
                let [key] = segments else { continue };
                let noisy = match map.get(key) {
                    Some(v) => hinted(v, hints),
                    None => hints.is_empty(),
                };
                if noisy {
                    map.remove(key);
                    if let Some(Value::Object(other)) = twin.as_deref_mut() {
                        other.remove(key);
                    }
                }
            }
            for (key, child) in map.iter_mut() {
                let nested: Vec<Shifted<'_>> = paths
                    .iter()
                    .filter(|(segments, _)| segments.len() > 1 && segments[0] == *key)
                    .map(|(segments, hints)| (&segments[1..], *hints))
                    .collect();
                if nested.is_empty() {
                    continue;
                }
                let other = match twin.as_deref_mut() {
                    Some(Value::Object(other)) => other.get_mut(key),
                    _ => None,
                };
                strip(child, other, &nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip(item, None, paths);
            }
            if let Some(Value::Array(others)) = twin {
                for item in others {
                    strip(item, None, paths);
                }
            }
        }
        _ => {}
    }
}

/// Removes every noisy field from `value`.
///
/// A path whose segments are exhausted removes the field (only when its
/// value matches one of the hints, if any are given); longer paths descend
/// into the named field. Arrays apply the same paths to every element.
///
/// # Errors
///
/// Returns an error if a hint is not a valid regular expression.
pub fn remove_noisy(value: &mut Value, noise: &Noise) -> Result<(), MatchError> {
    let paths = compile(noise)?;
    strip(value, None, &shifted(&paths));
    Ok(())
}

/// Name of a JSON value's type.
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse(text: &str, side: &'static str) -> Result<Value, MatchError> {
    serde_json::from_str(text).map_err(|source| MatchError::InvalidJson { side, source })
}

/// Compares two JSON documents, ignoring `noise_paths` entirely.
///
/// Paths may be given relative to the document or with a leading `body.`
/// segment; `body` alone ignores the whole document.
///
/// # Errors
///
/// Returns an error if either side is not valid JSON or the top-level
/// types differ.
pub fn match_json(expected: &str, actual: &str, noise_paths: &[String]) -> Result<bool, MatchError> {
    let noise: Noise = noise_paths.iter().map(|p| (p.clone(), Vec::new())).collect();
    match_json_with(expected, actual, &noise, ArrayMatch::default())
}

/// Compares two JSON documents under a noise map and array policy.
///
/// # Errors
///
/// See [`match_json`]; also fails on an invalid noise hint.
pub fn match_json_with(
    expected: &str,
    actual: &str,
    noise: &Noise,
    arrays: ArrayMatch,
) -> Result<bool, MatchError> {
    let expected = parse(expected, "expected")?;
    let actual = parse(actual, "actual")?;
    match_values(expected, actual, &body_relative(noise), arrays)
}

/// Re-roots `body.`-prefixed noise at the document.
fn body_relative(noise: &Noise) -> Noise {
    noise
        .iter()
        .map(|(path, hints)| {
            let path = match path.strip_prefix("body") {
                Some("") => String::new(),
                Some(rest) if rest.starts_with('.') => rest[1..].to_string(),
                _ => path.clone(),
            };
            (path, hints.clone())
        })
        .collect()
}

/// Compares two parsed documents.
///
/// An empty path in `noise` ignores the whole document.
///
/// # Errors
///
/// Returns an error if the top-level types differ or a hint is invalid.
pub fn match_values(
    mut expected: Value,
    mut actual: Value,
    noise: &Noise,
    arrays: ArrayMatch,
) -> Result<bool, MatchError> {
    if type_name(&expected) != type_name(&actual) {
        return Err(MatchError::TypeMismatch {
            expected: type_name(&expected),
            actual: type_name(&actual),
        });
    }
    let paths = compile(noise)?;
    if paths.iter().any(|p| p.segments.is_empty() && hinted(&expected, &p.hints)) {
        return Ok(true);
    }
    strip(&mut expected, Some(&mut actual), &shifted(&paths));
    Ok(equal(&expected, &actual, arrays))
}

fn equal(expected: &Value, actual: &Value, arrays: ArrayMatch) -> bool {
    match (expected, actual) {
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| equal(v, w, arrays)))
        }
        (Value::Array(x), Value::Array(y)) => {
            if x.len() != y.len() {
                return false;
            }
            match arrays {
                ArrayMatch::Strict => x.iter().zip(y).all(|(v, w)| equal(v, w, arrays)),
                ArrayMatch::Unordered => {
                    let mut used = vec![false; y.len()];
                    x.iter().all(|v| {
                        let found = y
                            .iter()
                            .enumerate()
                            .position(|(j, w)| !used[j] && equal(v, w, arrays));
                        match found {
                            Some(j) => {
                                used[j] = true;
                                true
                            }
                            None => false,
                        }
                    })
                }
            }
        }
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        _ => expected == actual,
    }
}

/// Converts a YAML value to JSON for comparison.
///
/// # Errors
///
/// Tagged values and non-scalar mapping keys have no JSON counterpart and
/// return [`MatchError::TypeNotRegistered`].
pub fn yaml_to_json(value: &serde_yaml::Value) -> Result<Value, MatchError> {
    use serde_yaml::Value as Yaml;
    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map_or(Value::Null, Value::from)
            }
        }
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(items.iter().map(yaml_to_json).collect::<Result<_, _>>()?),
        Yaml::Mapping(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                let key = match key {
                    Yaml::String(s) => s.clone(),
                    Yaml::Bool(b) => b.to_string(),
                    Yaml::Number(n) => n.to_string(),
                    other => return Err(MatchError::TypeNotRegistered(format!("mapping key {other:?}"))),
                };
                out.insert(key, yaml_to_json(child)?);
            }
            Value::Object(out)
        }
        Yaml::Tagged(tagged) => return Err(MatchError::TypeNotRegistered(format!("tag {}", tagged.tag))),
    })
}

/// Compares two YAML documents as JSON.
///
/// # Errors
///
/// See [`yaml_to_json`] and [`match_values`].
pub fn match_yaml(
    expected: &serde_yaml::Value,
    actual: &serde_yaml::Value,
    noise: &Noise,
    arrays: ArrayMatch,
) -> Result<bool, MatchError> {
    match_values(yaml_to_json(expected)?, yaml_to_json(actual)?, noise, arrays)
}
