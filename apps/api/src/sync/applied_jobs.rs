//! `appliedJobIds` back-references stored inside resume vector metadata.
//!
//! Over time the field has been written as a JSON-encoded string (`'["a","b"]'`), a
//! bare string holding a single id (`"a"`) and a native array. All three are read
//! through [`AppliedJobIds::from_metadata`]; only the native array is ever written.

use serde_json::Value;

pub const APPLIED_JOB_IDS_KEY: &str = "appliedJobIds";

/// How the value was stored before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredShape {
    Missing,
    NativeArray,
    JsonString,
    BareString,
    /// Anything else (number, bool, object). Coerced best-effort.
    Unexpected,
}

/// Ordered set of job ids. Insertion order is kept, duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedJobIds {
    ids: Vec<String>,
    shape: Option<StoredShape>,
}

impl AppliedJobIds {
    pub fn from_metadata(value: Option<&Value>) -> Self {
        let (ids, shape) = match value {
            None | Some(Value::Null) => (Vec::new(), StoredShape::Missing),
            Some(Value::Array(items)) => (strings_of(items), StoredShape::NativeArray),
            Some(Value::String(raw)) => parse_string(raw),
            Some(Value::Number(n)) => (vec![n.to_string()], StoredShape::Unexpected),
            Some(_) => (Vec::new(), StoredShape::Unexpected),
        };

        let mut set = Self {
            ids: Vec::with_capacity(ids.len()),
            shape: Some(shape),
        };
        for id in ids {
            set.insert(&id);
        }
        set
    }

    /// Returns `true` if the id was not already present.
    pub fn insert(&mut self, job_id: &str) -> bool {
        if job_id.is_empty() || self.contains(job_id) {
            return false;
        }
        self.ids.push(job_id.to_string());
        true
    }

    /// Returns `true` if the id was present.
    pub fn remove(&mut self, job_id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| id != job_id);
        self.ids.len() != before
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.ids.iter().any(|id| id == job_id)
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether the stored value must be rewritten even without a membership change.
    pub fn needs_rewrite(&self) -> bool {
        !matches!(self.shape, Some(StoredShape::NativeArray) | None)
    }

    pub fn stored_shape(&self) -> Option<StoredShape> {
        self.shape
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.ids.iter().cloned().map(Value::String).collect())
    }
}

impl<S: Into<String>> FromIterator<S> for AppliedJobIds {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::default();
        for id in iter {
            set.insert(&id.into());
        }
        set
    }
}

fn parse_string(raw: &str) -> (Vec<String>, StoredShape) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (Vec::new(), StoredShape::BareString);
    }
    if trimmed.starts_with('[') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
            return (strings_of(&items), StoredShape::JsonString);
        }
    }
    (vec![trimmed.to_string()], StoredShape::BareString)
}

fn strings_of(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}
