//! Lineage bookkeeping shared by every plan of a session.
//!
//! Plans carry two opaque tokens: a branch id naming the relation a plan
//! descends from and a sequence id naming the plan instance that hints and
//! aliases point at. [`AliasRegistry`] maps user-visible aliases to the
//! sequence ids they were given, and records which branch an aliased plan was
//! forked from so columns taken from the original plan still resolve.
//! Entries are append-only and live as long as the session.

use std::collections::HashMap;

/// Prefix of branch ids
pub const BRANCH_PREFIX: &str = "_b";
/// Prefix of sequence ids
pub const SEQUENCE_PREFIX: &str = "_s";
/// Prefix of CTE names assigned before finalization
pub const CTE_PREFIX: &str = "_r";

#[derive(Debug, Default)]
pub struct AliasRegistry {
    aliases: HashMap<String, Vec<String>>,
    branch_parents: HashMap<String, String>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `alias` names the plan with `sequence_id`.
    pub fn add(&mut self, alias: &str, sequence_id: &str) {
        let ids = self.aliases.entry(alias.to_string()).or_default();
        if !ids.iter().any(|id| id == sequence_id) {
            ids.push(sequence_id.to_string());
        }
    }

    /// Sequence ids registered under `alias`, or `None` for unknown names.
    pub fn lookup(&self, alias: &str) -> Option<&[String]> {
        self.aliases.get(alias).map(|ids| ids.as_slice())
    }

    /// Record that `branch` was forked from `parent`.
    pub fn add_branch(&mut self, branch: &str, parent: &str) {
        self.branch_parents
            .entry(branch.to_string())
            .or_insert_with(|| parent.to_string());
    }

    /// Whether `branch` is `ancestor` or was forked from it, transitively.
    pub fn descends_from(&self, branch: &str, ancestor: &str) -> bool {
        let mut current = branch;
        loop {
            if current == ancestor {
                return true;
            }
            match self.branch_parents.get(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
