use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use logsieve_types::Level;

/// Selected severities, stored as a bitmask over [`Level::ALL`]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelSet {
    bits: u8,
}

impl LevelSet {
    const MASK: u8 = 0b0111_1111;

    /// Every severity selected
    pub const ALL: LevelSet = LevelSet { bits: Self::MASK };

    /// Nothing selected
    pub const EMPTY: LevelSet = LevelSet { bits: 0 };

    pub const DEFAULT: LevelSet = Self::ALL;

    pub fn from_levels<I: IntoIterator<Item = Level>>(levels: I) -> Self {
        let bits = levels.into_iter().fold(0u8, |acc, level| acc | level.bit());
        Self { bits }
    }

    #[inline]
    pub fn contains(&self, level: Level) -> bool {
        self.bits & level.bit() != 0
    }

    pub fn insert(&mut self, level: Level) {
        self.bits |= level.bit();
    }

    pub fn remove(&mut self, level: Level) {
        self.bits &= !level.bit();
    }

    /// Per-level toggle
    pub fn set(&mut self, level: Level, is_selected: bool) {
        if is_selected {
            self.insert(level);
        } else {
            self.remove(level);
        }
    }

    pub fn is_all(&self) -> bool {
        self.bits == Self::MASK
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Selected levels in canonical severity order
    pub fn iter(&self) -> impl Iterator<Item = Level> + '_ {
        Level::ALL.into_iter().filter(move |l| self.contains(*l))
    }
}

impl Default for LevelSet {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for LevelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Level> for LevelSet {
    fn from_iter<I: IntoIterator<Item = Level>>(iter: I) -> Self {
        Self::from_levels(iter)
    }
}

impl Serialize for LevelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for LevelSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let levels = Vec::<Level>::deserialize(deserializer)?;
        Ok(Self::from_levels(levels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_levels() {
        let set = LevelSet::default();
        assert!(set.is_all());
        assert!(set.is_default());
        assert_eq!(set.len(), 7);
        for level in Level::ALL {
            assert!(set.contains(level));
        }
    }

    #[test]
    fn test_toggle_single_level() {
        let mut set = LevelSet::DEFAULT;
        set.set(Level::Debug, false);
        assert!(!set.contains(Level::Debug));
        assert!(!set.is_default());
        set.set(Level::Debug, true);
        assert!(set.is_default());
    }

    #[test]
    fn test_iteration_is_canonical() {
        let set = LevelSet::from_levels([Level::Error, Level::Trace, Level::Notice]);
        let levels: Vec<_> = set.iter().collect();
        assert_eq!(levels, vec![Level::Trace, Level::Notice, Level::Error]);
    }

    #[test]
    fn test_empty_set() {
        assert!(LevelSet::EMPTY.is_empty());
        assert!(!LevelSet::EMPTY.contains(Level::Critical));
    }
}
