use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::purchase::normalize_name;

/// The list the user is currently building, keyed by normalized item name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    items: BTreeMap<String, Option<String>>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for name in names {
            list.add(name.as_ref(), None);
        }
        list
    }

    /// Add an item, optionally pinning its category. Blank names are ignored.
    pub fn add(&mut self, name: &str, category: Option<&str>) {
        let name = normalize_name(name);
        if name.is_empty() {
            return;
        }
        let category = category.map(normalize_name).filter(|category| !category.is_empty());
        self.items.insert(name, category);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(&normalize_name(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn explicit_category(&self, name: &str) -> Option<&str> {
        self.items.get(&normalize_name(name)).and_then(|category| category.as_deref())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
