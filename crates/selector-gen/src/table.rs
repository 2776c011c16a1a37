//! Per-level candidate table with block-of-ten key allocation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Keys reserved per category.
pub const BLOCK_SIZE: u32 = 10;

/// Fragment category; each owns one key block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Burying point, id and text
    Primary,
    Attributes,
    Classes,
    Tag,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Primary,
        Category::Attributes,
        Category::Classes,
        Category::Tag,
    ];

    /// First key of the category's block.
    pub fn base(self) -> u32 {
        let index = match self {
            Category::Primary => 0,
            Category::Attributes => 1,
            Category::Classes => 2,
            Category::Tag => 3,
        };
        index * BLOCK_SIZE
    }

    pub fn of_key(key: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| (category.base()..category.base() + BLOCK_SIZE).contains(&key))
    }
}

/// Ordered key → fragment map for one ancestor level.
///
/// Iteration is in key order, so categories keep their priority even when
/// some are empty. Serializes as a plain object with numeric string keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateTable {
    entries: BTreeMap<u32, String>,
}

impl CandidateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `fragment` at the next free key of `category`'s block. Returns
    /// `None` when the block is full.
    pub fn append(&mut self, category: Category, fragment: impl Into<String>) -> Option<u32> {
        let base = category.base();
        let key = (base..base + BLOCK_SIZE).find(|key| !self.entries.contains_key(key))?;
        self.entries.insert(key, fragment.into());
        Some(key)
    }

    pub fn get(&self, key: u32) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.entries.iter().map(|(key, fragment)| (*key, fragment.as_str()))
    }

    pub fn fragments(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<u32, String>> for CandidateTable {
    fn from(entries: BTreeMap<u32, String>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blocks_keep_priority_order() {
        let mut table = CandidateTable::new();
        assert_eq!(table.append(Category::Tag, "button"), Some(30));
        assert_eq!(table.append(Category::Primary, "id=go"), Some(0));
        assert_eq!(table.append(Category::Attributes, "button[name=\"go\"]"), Some(10));
        assert_eq!(table.append(Category::Primary, "text=\"Go\""), Some(1));

        let fragments: Vec<&str> = table.fragments().collect();
        assert_eq!(
            fragments,
            vec!["id=go", "text=\"Go\"", "button[name=\"go\"]", "button"]
        );
        assert_eq!(Category::of_key(12), Some(Category::Attributes));
        assert_eq!(Category::of_key(40), None);
    }

    #[test]
    fn test_full_block_rejects() {
        let mut table = CandidateTable::new();
        for index in 0..BLOCK_SIZE {
            assert!(table.append(Category::Classes, format!(".c{index}")).is_some());
        }
        assert_eq!(table.append(Category::Classes, ".overflow"), None);
        assert_eq!(table.len(), BLOCK_SIZE as usize);
    }

    #[test]
    fn test_serializes_with_string_keys() {
        let mut table = CandidateTable::new();
        table.append(Category::Primary, "id=go");
        table.append(Category::Attributes, "input[name=\"q\"]");
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"0":"id=go","10":"input[name=\"q\"]"}"#);
        let back: CandidateTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
