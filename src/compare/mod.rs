//! Structural comparison of an expected and an actual value.
//!
//! Both values are serialized to [`serde_json::Value`] and walked side by
//! side. Every mismatch is reported with its location, the wanted value
//! (`-`) and the value that was received (`+`). An empty diff means the
//! values are equal under the given [`CompareOption`]s.

mod options;
mod path;

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;

use crate::errors::{Error, Result};

pub use options::{
    equate_approx_time, ignore_field, ignore_unexported, not_empty, sort_slices, CompareOption,
};
pub use path::FieldPath;

/// Returns a human-readable diff between `want` and `got`, empty when they
/// are equal.
pub fn diff<T: Serialize + ?Sized>(want: &T, got: &T, options: &[CompareOption]) -> Result<String> {
    let want = serde_json::to_value(want).map_err(|source| Error::CompareValue { source })?;
    let got = serde_json::to_value(got).map_err(|source| Error::CompareValue { source })?;
    Ok(diff_values(&want, &got, options))
}

pub fn diff_values(want: &Value, got: &Value, options: &[CompareOption]) -> String {
    let mut differ = Differ {
        options,
        fields: Vec::new(),
        differences: Vec::new(),
    };
    differ.walk("", Some(want), Some(got));
    differ
        .differences
        .iter()
        .map(Difference::render)
        .collect::<Vec<_>>()
        .join("\n")
}

struct Difference {
    location: String,
    want: Option<Value>,
    got: Option<Value>,
}

impl Difference {
    fn render(&self) -> String {
        let location = if self.location.is_empty() {
            "(root)"
        } else {
            &self.location
        };
        format!(
            "  {}:\n  \t-: {}\n  \t+: {}",
            location,
            show(self.want.as_ref()),
            show(self.got.as_ref())
        )
    }
}

fn show(value: Option<&Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "<missing>".to_string(),
    }
}

enum Verdict {
    Equal,
    Unequal,
    Walked,
    NotApplicable,
}

struct Differ<'a> {
    options: &'a [CompareOption],
    // field names from the root, without array indices
    fields: Vec<String>,
    differences: Vec<Difference>,
}

impl<'a> Differ<'a> {
    fn walk(&mut self, location: &str, want: Option<&Value>, got: Option<&Value>) {
        if self.ignores_field() {
            return;
        }
        for option in self.options {
            match self.apply(option, location, want, got) {
                Verdict::Equal | Verdict::Walked => return,
                Verdict::Unequal => return self.record(location, want, got),
                Verdict::NotApplicable => {}
            }
        }

        match (want, got) {
            (Some(Value::Object(want)), Some(Value::Object(got))) => {
                let hide_unexported = self.hides_unexported();
                let keys: BTreeSet<&String> = want
                    .keys()
                    .chain(got.keys())
                    .filter(|key| !(hide_unexported && key.starts_with('_')))
                    .collect();
                for key in keys {
                    let child = if location.is_empty() {
                        key.to_string()
                    } else {
                        format!("{}.{}", location, key)
                    };
                    self.fields.push(key.to_string());
                    self.walk(&child, want.get(key), got.get(key));
                    self.fields.pop();
                }
            }
            (Some(Value::Array(want)), Some(Value::Array(got))) => {
                self.walk_elements(location, want, got)
            }
            (Some(want), Some(got)) if want == got => {}
            _ => self.record(location, want, got),
        }
    }

    fn walk_elements(&mut self, location: &str, want: &[Value], got: &[Value]) {
        for index in 0..want.len().max(got.len()) {
            let child = format!("{}[{}]", location, index);
            self.walk(&child, want.get(index), got.get(index));
        }
    }

    fn apply(
        &mut self,
        option: &CompareOption,
        location: &str,
        want: Option<&Value>,
        got: Option<&Value>,
    ) -> Verdict {
        match option {
            CompareOption::NotEmpty(path) if path.matches(&self.fields) => match (want, got) {
                (Some(want), Some(got)) if !is_zero(want) && !is_zero(got) => Verdict::Equal,
                _ => Verdict::NotApplicable,
            },
            CompareOption::ApproxTime { margin } => match (timestamp(want), timestamp(got)) {
                (Some(want), Some(got)) if within(want, got, *margin) => Verdict::Equal,
                (Some(_), Some(_)) => Verdict::Unequal,
                _ => Verdict::NotApplicable,
            },
            CompareOption::SortSlices { path, sort } if path.matches(&self.fields) => {
                let (Some(Value::Array(want)), Some(Value::Array(got))) = (want, got) else {
                    return Verdict::NotApplicable;
                };
                match (sort(want.as_slice()), sort(got.as_slice())) {
                    (Some(want), Some(got)) => {
                        self.walk_elements(location, &want, &got);
                        Verdict::Walked
                    }
                    _ => Verdict::NotApplicable,
                }
            }
            _ => Verdict::NotApplicable,
        }
    }

    fn ignores_field(&self) -> bool {
        self.options.iter().any(|option| match option {
            CompareOption::IgnoreField(path) => path.matches(&self.fields),
            _ => false,
        })
    }

    fn hides_unexported(&self) -> bool {
        self.options.iter().any(|option| match option {
            CompareOption::IgnoreUnexported(paths) => {
                paths.iter().any(|path| path.matches(&self.fields))
            }
            _ => false,
        })
    }

    fn record(&mut self, location: &str, want: Option<&Value>, got: Option<&Value>) {
        self.differences.push(Difference {
            location: location.to_string(),
            want: want.cloned(),
            got: got.cloned(),
        });
    }
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<FixedOffset>> {
    match value {
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw).ok(),
        _ => None,
    }
}

fn within(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>, margin: Duration) -> bool {
    let delta = if a > b {
        a.signed_duration_since(b)
    } else {
        b.signed_duration_since(a)
    };
    delta.to_std().map(|delta| delta <= margin).unwrap_or(false)
}

/// Whether `value` is what an unset field serializes to.
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        // default chrono timestamps serialize as the Unix epoch
        Value::String(s) => {
            s.is_empty()
                || DateTime::parse_from_rfc3339(s)
                    .map(|t| t.timestamp() == 0 && t.timestamp_subsec_nanos() == 0)
                    .unwrap_or(false)
        }
        Value::Array(items) => items.is_empty(),
        Value::Object(members) => members.values().all(is_zero),
    }
}
