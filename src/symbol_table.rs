// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Label to address mapping built during pass 1.

use std::collections::HashMap;

/// A resolved symbol for listings and label output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub val: u32,
}

/// Symbol table. `define` is last-write-wins; lookups of unknown names
/// return `None`, never a sentinel address.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `val`, returning the previous binding when the name
    /// was already defined.
    pub fn define(&mut self, name: &str, val: u32) -> Option<u32> {
        self.symbols.insert(name.to_string(), val)
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.symbols.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// All entries sorted by case-folded name, for listings and labels
    /// files.
    pub fn entries(&self) -> Vec<SymbolEntry> {
        let mut entries: Vec<SymbolEntry> = self
            .symbols
            .iter()
            .map(|(name, val)| SymbolEntry {
                name: name.clone(),
                val: *val,
            })
            .collect();
        entries.sort_by(|left, right| {
            left.name
                .to_ascii_lowercase()
                .cmp(&right.name.to_ascii_lowercase())
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_is_last_write_wins() {
        let mut table = SymbolTable::new();
        assert_eq!(table.define("LOOP", 3), None);
        assert_eq!(table.define("LOOP", 9), Some(3));
        assert_eq!(table.lookup("LOOP"), Some(9));
    }

    #[test]
    fn unknown_lookup_is_absent() {
        let table = SymbolTable::new();
        assert_eq!(table.lookup("MISSING"), None);
    }

    #[test]
    fn entries_are_sorted_by_folded_name() {
        let mut table = SymbolTable::new();
        table.define("beta", 2);
        table.define("ALPHA", 1);
        table.define("Gamma", 3);
        let names: Vec<String> = table.entries().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["ALPHA", "beta", "Gamma"]);
    }
}
