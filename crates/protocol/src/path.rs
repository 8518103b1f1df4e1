//! Device path codec
//!
//! Translates between the three representations of a gNMI path:
//!
//! - human-readable strings: `/interfaces/interface[name=Gi0/0/0]/state`
//! - the structured `DevicePath` used throughout the pipeline
//! - the wire `gnmi::Path` / `gnmi::PathElem` messages
//!
//! Separators inside key brackets do not split elements, so key values such
//! as `Gi0/0/0` survive the round trip. Key constraints are kept in a
//! `BTreeMap` so equal paths always render identical strings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use gtel_proto::gnmi;

use crate::error::{CodecError, Result};

/// One element of a device path: a name plus optional key constraints
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathElem {
    /// Element name, never empty
    pub name: String,

    /// Key constraints (e.g. `name=Gi0/0/0`), ordered by key name
    pub keys: BTreeMap<String, String>,
}

impl PathElem {
    /// Create an element without keys
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: BTreeMap::new(),
        }
    }
}

/// Structured gNMI path with an optional origin
///
/// Invariant: round-trips losslessly to/from its string form; equal paths
/// produce equal string forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DevicePath {
    origin: Option<String>,
    elems: Vec<PathElem>,
}

impl DevicePath {
    /// Build a path from parts
    ///
    /// Callers are expected to provide non-empty element names; paths built
    /// from untrusted input should go through `FromStr` or `from_wire`.
    pub fn new(origin: Option<String>, elems: Vec<PathElem>) -> Self {
        Self { origin, elems }
    }

    /// Path origin (e.g. `openconfig`), if any
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Path elements, in order
    pub fn elems(&self) -> &[PathElem] {
        &self.elems
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// True if the path has no elements
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Encode to the wire representation
    pub fn to_wire(&self) -> gnmi::Path {
        gnmi::Path {
            origin: self.origin.clone().unwrap_or_default(),
            elem: self
                .elems
                .iter()
                .map(|e| gnmi::PathElem {
                    name: e.name.clone(),
                    key: e.keys.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                })
                .collect(),
            target: String::new(),
        }
    }

    /// Decode from the wire representation
    ///
    /// Element names must be non-empty. Key values are stripped of quote
    /// characters, which some implementations leave around string keys.
    pub fn from_wire(path: &gnmi::Path) -> Result<Self> {
        let mut elems = Vec::with_capacity(path.elem.len());
        for elem in &path.elem {
            if elem.name.is_empty() {
                return Err(CodecError::EmptyElementName {
                    path: format!("{:?}", path),
                });
            }
            let keys = elem
                .key
                .iter()
                .map(|(k, v)| (k.clone(), v.replace(['"', '\''], "")))
                .collect();
            elems.push(PathElem {
                name: elem.name.clone(),
                keys,
            });
        }
        let origin = if path.origin.is_empty() {
            None
        } else {
            Some(path.origin.clone())
        };
        Ok(Self { origin, elems })
    }

    /// Decode a notification prefix plus update path into one full path
    ///
    /// The prefix's origin wins if both carry one. An update with neither
    /// prefix nor path elements is an empty path and fails.
    pub fn join_wire(prefix: Option<&gnmi::Path>, path: Option<&gnmi::Path>) -> Result<Self> {
        let mut joined = match prefix {
            Some(p) => Self::from_wire(p)?,
            None => Self {
                origin: None,
                elems: Vec::new(),
            },
        };
        if let Some(p) = path {
            let rest = Self::from_wire(p)?;
            if joined.origin.is_none() {
                joined.origin = rest.origin;
            }
            joined.elems.extend(rest.elems);
        }
        if joined.elems.is_empty() {
            return Err(CodecError::EmptyPath);
        }
        Ok(joined)
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(origin) = &self.origin {
            write!(f, "{origin}:")?;
        }
        for elem in &self.elems {
            write!(f, "/{}", elem.name)?;
            for (k, v) in &elem.keys {
                write!(f, "[{k}={v}]")?;
            }
        }
        Ok(())
    }
}

impl FromStr for DevicePath {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CodecError::EmptyPath);
        }

        let (origin, rest) = split_origin(trimmed);

        let mut parts = split_elements(rest);
        // Leading and trailing separators are tolerated on input even though
        // the canonical rendering always starts with one.
        if parts.first() == Some(&"") {
            parts.remove(0);
        }
        if parts.last() == Some(&"") {
            parts.pop();
        }
        if parts.is_empty() {
            return Err(CodecError::EmptyPath);
        }

        let elems = parts
            .into_iter()
            .map(|part| parse_elem(part, trimmed))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            origin: origin.map(String::from),
            elems,
        })
    }
}

/// Split an optional `origin:` prefix off a path string
///
/// Only a colon immediately followed by `/` marks an origin; a colon inside
/// the first element (`Cisco-IOS-XR-shellutil-cfg:host-names`) is part of
/// the element name.
fn split_origin(s: &str) -> (Option<&str>, &str) {
    if let Some(idx) = s.find(':') {
        let head = &s[..idx];
        let tail = &s[idx + 1..];
        if !head.is_empty() && tail.starts_with('/') && !head.contains('/') && !head.contains('[')
        {
            return (Some(head), tail);
        }
    }
    (None, s)
}

/// Split a path on `/`, ignoring separators inside key brackets
fn split_elements(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, ch) in path.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&path[start..]);
    parts
}

/// Parse one element (`name` or `name[key=value]...`)
fn parse_elem(raw: &str, full_path: &str) -> Result<PathElem> {
    let name_end = raw.find('[').unwrap_or(raw.len());
    let name = &raw[..name_end];
    if name.is_empty() {
        return Err(CodecError::EmptyElementName {
            path: full_path.to_string(),
        });
    }

    let mut keys = BTreeMap::new();
    let mut rest = &raw[name_end..];
    while !rest.is_empty() {
        let Some(stripped) = rest.strip_prefix('[') else {
            return Err(CodecError::MalformedKey {
                elem: name.to_string(),
                key: rest.to_string(),
            });
        };
        let Some(close) = stripped.find(']') else {
            return Err(CodecError::MalformedKey {
                elem: name.to_string(),
                key: rest.to_string(),
            });
        };
        let group = &stripped[..close];
        let Some((key, value)) = group.split_once('=') else {
            return Err(CodecError::MalformedKey {
                elem: name.to_string(),
                key: group.to_string(),
            });
        };
        if keys.insert(key.to_string(), value.to_string()).is_some() {
            return Err(CodecError::DuplicateKey {
                elem: name.to_string(),
                key: key.to_string(),
            });
        }
        rest = &stripped[close + 1..];
    }

    Ok(PathElem {
        name: name.to_string(),
        keys,
    })
}

#[cfg(test)]
#[path = "path_test.rs"]
mod path_test;
