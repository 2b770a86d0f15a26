use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// Snapshot of category name -> file count.
///
/// Categories with a count of zero are never stored, so an absent key and a
/// zero count are the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct CategoryCount(BTreeMap<String, u64>);

impl CategoryCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: &str) -> u64 {
        self.0.get(category).copied().unwrap_or(0)
    }

    pub fn with(mut self, category: impl Into<String>, count: u64) -> Self {
        self.insert(category, count);
        self
    }

    pub fn insert(&mut self, category: impl Into<String>, count: u64) {
        let category = category.into();
        if count == 0 {
            self.0.remove(&category);
        } else {
            self.0.insert(category, count);
        }
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, u64> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for CategoryCount {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        let mut counts = CategoryCount::new();
        for (category, count) in iter {
            counts.insert(category, count);
        }
        counts
    }
}

impl From<BTreeMap<String, u64>> for CategoryCount {
    fn from(map: BTreeMap<String, u64>) -> Self {
        map.into_iter().collect()
    }
}

impl From<CategoryCount> for BTreeMap<String, u64> {
    fn from(counts: CategoryCount) -> Self {
        counts.0
    }
}

impl<'a> IntoIterator for &'a CategoryCount {
    type Item = (&'a String, &'a u64);
    type IntoIter = btree_map::Iter<'a, String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for CategoryCount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
