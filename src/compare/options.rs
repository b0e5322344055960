//! Named comparison directives accepted by
//! [`expect_json_response`](crate::expect_json_response).

use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::path::FieldPath;

pub type SortFn = Arc<dyn Fn(&[Value]) -> Option<Vec<Value>> + Send + Sync>;

/// A directive for the structural comparison of an expected and an actual
/// value.
///
/// An ignored field is never compared. The other directives that decide
/// whether two values are equal are tried in the order they were given; the
/// first one that applies to a value wins.
#[derive(Clone)]
pub enum CompareOption {
    ApproxTime { margin: Duration },
    IgnoreField(FieldPath),
    IgnoreUnexported(Vec<FieldPath>),
    NotEmpty(FieldPath),
    SortSlices { path: FieldPath, sort: SortFn },
}

impl Debug for CompareOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOption::ApproxTime { margin } => {
                f.debug_struct("ApproxTime").field("margin", margin).finish()
            }
            CompareOption::IgnoreField(path) => f.debug_tuple("IgnoreField").field(path).finish(),
            CompareOption::IgnoreUnexported(paths) => {
                f.debug_tuple("IgnoreUnexported").field(paths).finish()
            }
            CompareOption::NotEmpty(path) => f.debug_tuple("NotEmpty").field(path).finish(),
            CompareOption::SortSlices { path, .. } => {
                f.debug_struct("SortSlices").field("path", path).finish_non_exhaustive()
            }
        }
    }
}

/// Treats two RFC 3339 timestamps as equal when they are at most `margin`
/// apart, and as different otherwise, wherever they appear in the value.
pub fn equate_approx_time(margin: Duration) -> CompareOption {
    CompareOption::ApproxTime { margin }
}

/// Leaves the field at `path` (like `"msg"` or `"user.id"`) out of the
/// comparison, whatever other directives say about it.
pub fn ignore_field(path: &str) -> CompareOption {
    CompareOption::IgnoreField(FieldPath::parse(path))
}

/// Leaves out members whose name starts with `_` in the objects found at
/// `paths`. Use `""` for the top-level object.
pub fn ignore_unexported<'a>(paths: impl IntoIterator<Item = &'a str>) -> CompareOption {
    CompareOption::IgnoreUnexported(paths.into_iter().map(FieldPath::parse).collect())
}

/// Treats the values at `path` as equal when neither is empty (null, false,
/// zero, an empty string or collection, or the Unix epoch), whatever their
/// actual contents.
pub fn not_empty(path: &str) -> CompareOption {
    CompareOption::NotEmpty(FieldPath::parse(path))
}

/// Sorts both arrays found at `path` with `less` before comparing them, for
/// responses whose order is not deterministic. Only applies when every
/// element decodes as `E`.
pub fn sort_slices<E, F>(path: &str, less: F) -> CompareOption
where
    E: DeserializeOwned + 'static,
    F: Fn(&E, &E) -> bool + Send + Sync + 'static,
{
    let sort = move |items: &[Value]| -> Option<Vec<Value>> {
        let mut decoded = items
            .iter()
            .map(|item| E::deserialize(item).ok().map(|elem| (elem, item)))
            .collect::<Option<Vec<(E, &Value)>>>()?;
        decoded.sort_by(|(a, _), (b, _)| {
            if less(a, b) {
                Ordering::Less
            } else if less(b, a) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        });
        Some(decoded.into_iter().map(|(_, item)| item.clone()).collect())
    };
    CompareOption::SortSlices {
        path: FieldPath::parse(path),
        sort: Arc::new(sort),
    }
}
