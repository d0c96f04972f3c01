//! Achievement records and the identity naming convention
//!
//! The platform catalog must mirror these names exactly:
//! `ACHIEVEMENT_00` .. `ACHIEVEMENT_09`, then `ACHIEVEMENT_10` upward, each
//! with a companion stat named `<id>_STAT`.

use serde::{Deserialize, Serialize};

/// Prefix shared by every achievement identity
pub const ACHIEVEMENT_PREFIX: &str = "ACHIEVEMENT_";

/// Suffix of the stat that accompanies each achievement
pub const STAT_SUFFIX: &str = "_STAT";

/// Identity of the achievement at `ordinal`
pub fn achievement_id(ordinal: u32) -> String {
    format!("{ACHIEVEMENT_PREFIX}{ordinal:02}")
}

/// Key of the companion stat for an achievement identity
pub fn stat_key(id: &str) -> String {
    format!("{id}{STAT_SUFFIX}")
}

/// Display attribute of an achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementField {
    Name,
    Description,
}

impl AchievementField {
    /// Attribute key as the platform names it
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementField::Name => "name",
            AchievementField::Description => "desc",
        }
    }
}

/// One entry of the achievement catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRecord {
    /// Stable identity, e.g. `ACHIEVEMENT_03`
    pub id: String,
    pub name: String,
    pub description: String,
    pub unlocked: bool,
    /// Value of the companion `<id>_STAT` stat
    pub stat: i32,
}

impl AchievementRecord {
    /// An unreconciled record: empty display fields, locked, stat zero
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            unlocked: false,
            stat: 0,
        }
    }

    /// Key of this record's companion stat
    pub fn stat_key(&self) -> String {
        stat_key(&self.id)
    }
}

/// Result of a refresh: how many records were reconciled and which failed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub updated: usize,
    /// Identities the service had no data for; those records were left unchanged
    pub failed: Vec<String>,
}

/// Result of flushing stats to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOutcome {
    /// Whether the service confirmed the store
    pub ok: bool,
    /// Whether the dirty flag was cleared by this store
    pub cleared_dirty: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_achievement_id_padding() {
        assert_eq!(achievement_id(0), "ACHIEVEMENT_00");
        assert_eq!(achievement_id(9), "ACHIEVEMENT_09");
        assert_eq!(achievement_id(10), "ACHIEVEMENT_10");
        assert_eq!(achievement_id(123), "ACHIEVEMENT_123");
    }

    #[test]
    fn test_stat_key_suffix() {
        assert_eq!(stat_key("ACHIEVEMENT_04"), "ACHIEVEMENT_04_STAT");
        assert_eq!(
            AchievementRecord::empty("ACHIEVEMENT_11").stat_key(),
            "ACHIEVEMENT_11_STAT"
        );
    }

    #[test]
    fn test_field_keys() {
        assert_eq!(AchievementField::Name.as_str(), "name");
        assert_eq!(AchievementField::Description.as_str(), "desc");
    }
}
