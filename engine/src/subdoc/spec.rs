//! Subdocument spec constructors.
//!
//! Specs are plain values; a request is a `Vec` of them. Flag setters
//! consume and return the spec so they chain off the constructor:
//!
//! ```rust
//! use kvdoc_engine::MutateInSpec;
//! use serde_json::json;
//!
//! let specs = vec![
//!     MutateInSpec::upsert("profile.name", json!("Ada")).create_path(),
//!     MutateInSpec::counter("logins", 1),
//!     MutateInSpec::upsert("meta.cas", json!("${Mutation.CAS}")).xattr().expand_macros(),
//! ];
//! assert_eq!(specs.len(), 3);
//! ```

use serde_json::Value;

/// Read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Get,
    Exists,
    Count,
}

/// One path-addressed read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupInSpec {
    pub kind: LookupKind,
    pub path: String,
    pub xattr: bool,
}

impl LookupInSpec {
    /// Read the value at `path`. The empty path reads the whole document.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(LookupKind::Get, path)
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Self::new(LookupKind::Exists, path)
    }

    /// Number of elements of the array or object at `path`.
    pub fn count(path: impl Into<String>) -> Self {
        Self::new(LookupKind::Count, path)
    }

    fn new(kind: LookupKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            xattr: false,
        }
    }

    #[must_use]
    pub fn xattr(mut self) -> Self {
        self.xattr = true;
        self
    }
}

/// Write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutateKind {
    Insert,
    Upsert,
    Replace,
    Remove,
    ArrayAppend,
    ArrayPrepend,
    ArrayInsert,
    ArrayAddUnique,
    Counter,
    ReplaceFullDocument,
}

impl MutateKind {
    /// Kinds for which `create_path` means something.
    pub fn accepts_create_path(self) -> bool {
        matches!(
            self,
            MutateKind::Insert
                | MutateKind::Upsert
                | MutateKind::ArrayAppend
                | MutateKind::ArrayPrepend
                | MutateKind::ArrayInsert
                | MutateKind::ArrayAddUnique
                | MutateKind::Counter
        )
    }

    /// Kinds that may address the document root.
    pub fn accepts_root(self) -> bool {
        matches!(
            self,
            MutateKind::Insert
                | MutateKind::Upsert
                | MutateKind::Replace
                | MutateKind::ReplaceFullDocument
                | MutateKind::ArrayAppend
                | MutateKind::ArrayPrepend
                | MutateKind::ArrayAddUnique
        )
    }
}

/// One path-addressed write.
#[derive(Debug, Clone, PartialEq)]
pub struct MutateInSpec {
    pub kind: MutateKind,
    pub path: String,
    /// Values to write; several for multi-value array operations.
    pub values: Vec<Value>,
    /// Signed counter delta.
    pub delta: i64,
    pub xattr: bool,
    pub create_path: bool,
    pub expand_macros: bool,
}

impl MutateInSpec {
    /// Add a value at a path that must not exist yet.
    pub fn insert(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateKind::Insert, path, vec![value.into()])
    }

    /// Set a value, creating the last path component if needed. The empty
    /// path replaces the whole document.
    pub fn upsert(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateKind::Upsert, path, vec![value.into()])
    }

    /// Overwrite a value at a path that must exist.
    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateKind::Replace, path, vec![value.into()])
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::with_values(MutateKind::Remove, path, Vec::new())
    }

    /// Replace the document body with `value`.
    pub fn replace_full_document(value: impl Into<Value>) -> Self {
        Self::with_values(MutateKind::ReplaceFullDocument, "", vec![value.into()])
    }

    pub fn array_append(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateKind::ArrayAppend, path, vec![value.into()])
    }

    pub fn array_append_all(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self::with_values(MutateKind::ArrayAppend, path, values)
    }

    pub fn array_prepend(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateKind::ArrayPrepend, path, vec![value.into()])
    }

    pub fn array_prepend_all(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self::with_values(MutateKind::ArrayPrepend, path, values)
    }

    /// Insert before the element addressed by the final `[N]` of `path`.
    pub fn array_insert(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateKind::ArrayInsert, path, vec![value.into()])
    }

    pub fn array_insert_all(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self::with_values(MutateKind::ArrayInsert, path, values)
    }

    /// Append unless an equal primitive is already present.
    pub fn array_add_unique(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_values(MutateKind::ArrayAddUnique, path, vec![value.into()])
    }

    /// Adjust the number at `path` by `delta`; the result is returned.
    pub fn counter(path: impl Into<String>, delta: i64) -> Self {
        let mut spec = Self::with_values(MutateKind::Counter, path, Vec::new());
        spec.delta = delta;
        spec
    }

    fn with_values(kind: MutateKind, path: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            kind,
            path: path.into(),
            values,
            delta: 0,
            xattr: false,
            create_path: false,
            expand_macros: false,
        }
    }

    #[must_use]
    pub fn xattr(mut self) -> Self {
        self.xattr = true;
        self
    }

    /// Create missing intermediate components.
    #[must_use]
    pub fn create_path(mut self) -> Self {
        self.create_path = true;
        self
    }

    /// Substitute `${Mutation.*}` macros. Only valid on xattrs.
    #[must_use]
    pub fn expand_macros(mut self) -> Self {
        self.expand_macros = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_set_kind_and_value() {
        let spec = MutateInSpec::upsert("a.b", json!({"x": 1})).create_path();
        assert_eq!(spec.kind, MutateKind::Upsert);
        assert_eq!(spec.values, vec![json!({"x": 1})]);
        assert!(spec.create_path);
        assert!(!spec.xattr);

        let spec = MutateInSpec::counter("n", -5);
        assert_eq!(spec.kind, MutateKind::Counter);
        assert_eq!(spec.delta, -5);
        assert!(spec.values.is_empty());

        let spec = MutateInSpec::array_append_all("list", vec![json!(1), json!(2)]);
        assert_eq!(spec.values.len(), 2);
    }

    #[test]
    fn lookup_constructors() {
        let spec = LookupInSpec::count("list").xattr();
        assert_eq!(spec.kind, LookupKind::Count);
        assert!(spec.xattr);
    }

    #[test]
    fn root_and_create_path_rules() {
        assert!(MutateKind::Upsert.accepts_root());
        assert!(MutateKind::ArrayAppend.accepts_root());
        assert!(!MutateKind::Remove.accepts_root());
        assert!(!MutateKind::Counter.accepts_root());
        assert!(!MutateKind::Replace.accepts_create_path());
        assert!(MutateKind::Counter.accepts_create_path());
    }
}
