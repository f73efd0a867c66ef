use serde_json::Value as JsonValue;

use super::{json_type, InstanceState};

/// Instances from a single list response, in response order.
///
/// Consumed once: it reflects one point-in-time fetch and cannot be
/// restarted. Call `list` again for a fresh view.
#[derive(Debug)]
pub struct InstanceList {
    items: std::vec::IntoIter<InstanceState>,
}

impl InstanceList {
    pub(crate) fn new(items: Vec<InstanceState>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for InstanceList {
    type Item = InstanceState;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl ExactSizeIterator for InstanceList {}

/// Elements of a list response: a top-level array, the named property, or
/// the only array-valued property of the response object. Several
/// undeclared array properties are an error rather than a guess.
pub(crate) fn list_elements(body: Option<JsonValue>, items_key: Option<&str>) -> Result<Vec<JsonValue>, String> {
    let body = match body {
        None | Some(JsonValue::Null) => return Ok(Vec::new()),
        Some(b) => b,
    };
    match body {
        JsonValue::Array(items) => Ok(items),
        JsonValue::Object(mut obj) => {
            if let Some(key) = items_key {
                return match obj.remove(key) {
                    Some(JsonValue::Array(items)) => Ok(items),
                    None | Some(JsonValue::Null) => Ok(Vec::new()),
                    Some(other) => Err(format!("'{key}' is {}, expected an array", json_type(&other))),
                };
            }
            let arrays: Vec<String> = obj
                .iter()
                .filter(|(_, v)| v.is_array())
                .map(|(k, _)| k.clone())
                .collect();
            match arrays.as_slice() {
                [] => Ok(Vec::new()),
                [key] => match obj.remove(key) {
                    Some(JsonValue::Array(items)) => Ok(items),
                    _ => Ok(Vec::new()),
                },
                _ => Err(format!(
                    "response has several array properties ({}); declare the collection with x-restform-list-items",
                    arrays.join(", ")
                )),
            }
        }
        other => Err(format!("list response is {}", json_type(&other))),
    }
}
