/// Represents a path in a nested schema.
///
/// The query surface writes nested paths as a single string with parts
/// joined by `,`.
#[derive(Clone, PartialEq, Debug, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnPath {
    parts: Vec<String>,
}

impl ColumnPath {
    /// Creates new column path from vector of field names.
    pub fn new(parts: Vec<String>) -> Self {
        ColumnPath { parts }
    }

    pub fn string(&self) -> String {
        self.parts.join(",")
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}

impl std::fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.string())
    }
}

impl From<Vec<String>> for ColumnPath {
    fn from(parts: Vec<String>) -> Self {
        ColumnPath { parts }
    }
}

impl<'a> From<&'a str> for ColumnPath {
    fn from(path: &str) -> Self {
        let parts = path.split(',').map(String::from).collect();
        ColumnPath { parts }
    }
}

impl From<String> for ColumnPath {
    fn from(path: String) -> Self {
        ColumnPath::from(path.as_str())
    }
}

impl AsRef<[String]> for ColumnPath {
    fn as_ref(&self) -> &[String] {
        &self.parts
    }
}
