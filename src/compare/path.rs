use std::fmt::{Display, Formatter};

/// Location of a field inside a compared value, as a sequence of field
/// names from the root. Array indices are not part of a path, so a path
/// such as `items.id` addresses the `id` of every element of `items`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn root() -> FieldPath {
        FieldPath(Vec::new())
    }

    /// Parses a dotted path like `"user.address.city"`. The empty string is
    /// the root.
    pub fn parse(dotted: &str) -> FieldPath {
        FieldPath(
            dotted
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn field(mut self, name: &str) -> FieldPath {
        self.0.push(name.to_string());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn matches(&self, fields: &[String]) -> bool {
        self.0.as_slice() == fields
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        FieldPath::parse(dotted)
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
