//! Map, list, set and queue views over single JSON documents.
//!
//! Each structure is one document: maps are JSON objects, the others JSON
//! arrays. Writes create the document on first use.

use crate::collection::Collection;
use crate::options::{GetOptions, LookupInOptions, MutateInOptions, StoreSemantics};
use crate::result::{MutateInResult, MutationResult};
use crate::status::Status;
use crate::subdoc::{LookupInSpec, MutateInSpec};
use crate::{error::Result, Error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn index_path(index: i64) -> String {
    format!("[{index}]")
}

/// Fail on the single spec's status, if it failed.
fn single(result: MutateInResult) -> Result<MutationResult> {
    if let Some(err) = result.entry(0)?.error() {
        return Err(err);
    }
    Ok(result.mutation())
}

impl Collection {
    fn mutate_one(&self, key: &str, spec: MutateInSpec, semantics: StoreSemantics) -> Result<MutateInResult> {
        self.mutate_in(key, &[spec], MutateInOptions::new().store_semantics(semantics))
    }

    fn lookup_one<T: DeserializeOwned>(&self, key: &str, path: String) -> Result<T> {
        let result = self.lookup_in(key, &[LookupInSpec::get(path)], LookupInOptions::default())?;
        result.content_as(0)
    }

    fn array_of(&self, key: &str) -> Result<Vec<Value>> {
        let doc = self.get(key, GetOptions::default())?;
        match doc.content_as::<Value>()? {
            Value::Array(items) => Ok(items),
            _ => Err(Error::PathMismatch(format!("document {key} is not a JSON array"))),
        }
    }

    // ---- map ----

    /// Set `field` of the map stored at `key`.
    pub fn map_add<T: Serialize + ?Sized>(&self, key: &str, field: &str, value: &T) -> Result<MutationResult> {
        let spec = MutateInSpec::upsert(field, to_value(value)?).create_path();
        single(self.mutate_one(key, spec, StoreSemantics::Upsert)?)
    }

    pub fn map_get<T: DeserializeOwned>(&self, key: &str, field: &str) -> Result<T> {
        self.lookup_one(key, field.to_string())
    }

    pub fn map_remove(&self, key: &str, field: &str) -> Result<MutationResult> {
        single(self.mutate_one(key, MutateInSpec::remove(field), StoreSemantics::Replace)?)
    }

    pub fn map_size(&self, key: &str) -> Result<usize> {
        let doc = self.get(key, GetOptions::default())?;
        match doc.content_as::<Value>()? {
            Value::Object(fields) => Ok(fields.len()),
            _ => Err(Error::PathMismatch(format!("document {key} is not a JSON object"))),
        }
    }

    // ---- list ----

    /// Append to the end of the list.
    pub fn list_push<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<MutationResult> {
        let spec = MutateInSpec::array_append("", to_value(value)?);
        single(self.mutate_one(key, spec, StoreSemantics::Upsert)?)
    }

    /// Insert at the front of the list.
    pub fn list_shift<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<MutationResult> {
        let spec = MutateInSpec::array_prepend("", to_value(value)?);
        single(self.mutate_one(key, spec, StoreSemantics::Upsert)?)
    }

    pub fn list_get<T: DeserializeOwned>(&self, key: &str, index: i64) -> Result<T> {
        self.lookup_one(key, index_path(index))
    }

    pub fn list_set<T: Serialize + ?Sized>(&self, key: &str, index: i64, value: &T) -> Result<MutationResult> {
        let spec = MutateInSpec::replace(index_path(index), to_value(value)?);
        single(self.mutate_one(key, spec, StoreSemantics::Replace)?)
    }

    pub fn list_remove(&self, key: &str, index: i64) -> Result<MutationResult> {
        let spec = MutateInSpec::remove(index_path(index));
        single(self.mutate_one(key, spec, StoreSemantics::Replace)?)
    }

    pub fn list_size(&self, key: &str) -> Result<usize> {
        Ok(self.array_of(key)?.len())
    }

    // ---- set ----

    /// Add a primitive value. Returns `false` when it was already present.
    pub fn set_add<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool> {
        let spec = MutateInSpec::array_add_unique("", to_value(value)?);
        let result = self.mutate_one(key, spec, StoreSemantics::Upsert)?;
        match result.status_at(0)? {
            Status::PathExists => Ok(false),
            _ => single(result).map(|_| true),
        }
    }

    pub fn set_exists<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool> {
        let needle = to_value(value)?;
        Ok(self.array_of(key)?.contains(&needle))
    }

    /// Remove a value from the set. Guarded by the CAS of the read, so a
    /// concurrent change surfaces as `CasMismatch`.
    pub fn set_remove<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<Option<MutationResult>> {
        let needle = to_value(value)?;
        let doc = self.get(key, GetOptions::default())?;
        let items = match doc.content_as::<Value>()? {
            Value::Array(items) => items,
            _ => return Err(Error::PathMismatch(format!("document {key} is not a JSON array"))),
        };
        let Some(position) = items.iter().position(|item| *item == needle) else {
            return Ok(None);
        };
        let result = self.mutate_in(
            key,
            &[MutateInSpec::remove(index_path(position as i64))],
            MutateInOptions::new().cas(doc.cas),
        )?;
        single(result).map(Some)
    }

    pub fn set_size(&self, key: &str) -> Result<usize> {
        self.list_size(key)
    }

    // ---- queue ----

    /// Enqueue at the front; [`Collection::queue_pop`] takes from the back.
    pub fn queue_push<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<MutationResult> {
        self.list_shift(key, value)
    }

    /// Dequeue the oldest element, or `None` when the queue is empty.
    pub fn queue_pop<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let lookup = self.lookup_in(key, &[LookupInSpec::get("[-1]")], LookupInOptions::default())?;
        if lookup.status_at(0)? == Status::PathNotFound {
            return Ok(None);
        }
        let value = lookup.content_as::<T>(0)?;
        let result = self.mutate_in(
            key,
            &[MutateInSpec::remove("[-1]")],
            MutateInOptions::new().cas(lookup.cas),
        )?;
        single(result)?;
        Ok(Some(value))
    }

    pub fn queue_size(&self, key: &str) -> Result<usize> {
        self.list_size(key)
    }
}
