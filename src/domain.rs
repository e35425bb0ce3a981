//! The sorted, de-duplicated values of one attribute.

use std::cmp::Ordering;

use crate::error::ValueError;
use crate::types::DataType;

/// A parsed value together with the spelling it was first seen with.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainValue<V> {
    pub raw: String,
    pub value: V,
    /// Further distinct spellings of the same value, in input order.
    pub aliases: Vec<String>,
}

impl<V> DomainValue<V> {
    /// Every distinct spelling, the first one first.
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.raw.as_str()).chain(self.aliases.iter().map(|s| s.as_str()))
    }
}

/// Distinct values of an attribute, sorted by the data type's comparator.
///
/// Immutable once built; editing sessions build a fresh domain per snapshot.
#[derive(Debug, Clone)]
pub struct ValueDomain<T: DataType> {
    data_type: T,
    entries: Vec<DomainValue<T::Value>>,
}

impl<T: DataType> ValueDomain<T> {
    /// Parse, sort and de-duplicate raw values.
    ///
    /// Spellings that parse to an equal value share one entry; each distinct
    /// spelling is kept. Fails on the first value that does not parse.
    pub fn new<I, S>(data_type: T, raw: I) -> Result<Self, ValueError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = raw
            .into_iter()
            .map(|raw| {
                let raw = raw.as_ref();
                data_type.parse(raw).map(|value| DomainValue {
                    raw: raw.to_string(),
                    value,
                    aliases: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Stable, so equal values keep their input order
        entries.sort_by(|a, b| data_type.compare(&a.value, &b.value));
        entries.dedup_by(|next, kept| {
            if data_type.compare(&next.value, &kept.value) != Ordering::Equal {
                return false;
            }
            if next.raw != kept.raw && !kept.aliases.contains(&next.raw) {
                kept.aliases.push(std::mem::take(&mut next.raw));
            }
            true
        });

        Ok(Self { data_type, entries })
    }

    pub fn data_type(&self) -> &T {
        &self.data_type
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn min(&self) -> Option<&T::Value> {
        self.entries.first().map(|e| &e.value)
    }

    pub fn max(&self) -> Option<&T::Value> {
        self.entries.last().map(|e| &e.value)
    }

    pub fn entries(&self) -> &[DomainValue<T::Value>] {
        &self.entries
    }

    pub fn values(&self) -> impl Iterator<Item = &T::Value> {
        self.entries.iter().map(|e| &e.value)
    }

    /// Every distinct spelling in value order.
    pub fn raw_values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().flat_map(|e| e.spellings())
    }

    /// Find the entry whose raw spelling or parsed value matches `raw`.
    pub fn find(&self, raw: &str) -> Option<&DomainValue<T::Value>> {
        if let Some(entry) = self.entries.iter().find(|e| e.spellings().any(|s| s == raw)) {
            return Some(entry);
        }
        let value = self.data_type.parse(raw).ok()?;
        self.entries
            .binary_search_by(|e| self.data_type.compare(&e.value, &value))
            .ok()
            .map(|i| &self.entries[i])
    }
}
