//! Fixed-size, identity-indexed achievement catalog

use std::collections::HashMap;

use crate::domain::{AchievementRecord, achievement_id};

/// Ordered achievement records with a stable identity-to-index mapping
///
/// The size is fixed when the catalog is built; only record contents change
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct AchievementCatalog {
    records: Vec<AchievementRecord>,
    index: HashMap<String, usize>,
}

impl AchievementCatalog {
    /// Build records for ordinals `0..=count`, all empty and locked
    pub fn with_count(count: u32) -> Self {
        let records: Vec<AchievementRecord> = (0..=count)
            .map(|ordinal| AchievementRecord::empty(achievement_id(ordinal)))
            .collect();
        let index = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id.clone(), i))
            .collect();
        Self { records, index }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&AchievementRecord> {
        self.position(id).map(|i| &self.records[i])
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut AchievementRecord> {
        let i = self.position(id)?;
        self.records.get_mut(i)
    }

    pub fn records(&self) -> &[AchievementRecord] {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut AchievementRecord> {
        self.records.iter_mut()
    }
}
