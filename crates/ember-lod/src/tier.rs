//! Quality tiers.

use std::fmt;

/// Discrete quality level of a managed entity, best first.
///
/// `Lod0`..`Lod4` are visible; `Culled` has every visual side effect
/// disabled until the entity comes back in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LodTier {
    /// Full fidelity.
    Lod0,
    /// Near.
    Lod1,
    /// Mid range.
    Lod2,
    /// Far.
    Lod3,
    /// Worst visible tier.
    Lod4,
    /// Out of range: invisible and silent.
    Culled,
}

impl LodTier {
    /// Number of tiers, `Culled` included.
    pub const COUNT: usize = 6;

    /// Every tier in order.
    pub const ALL: [LodTier; Self::COUNT] = [
        LodTier::Lod0,
        LodTier::Lod1,
        LodTier::Lod2,
        LodTier::Lod3,
        LodTier::Lod4,
        LodTier::Culled,
    ];

    /// Best tier.
    pub const HIGHEST: LodTier = LodTier::Lod0;

    /// Worst visible tier.
    pub const LOWEST_VISIBLE: LodTier = LodTier::Lod4;

    /// Position in [`LodTier::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Tier at `index`, if in range.
    pub fn from_index(index: usize) -> Option<LodTier> {
        Self::ALL.get(index).copied()
    }

    /// Whether the entity is rendered at this tier.
    pub fn is_visible(self) -> bool {
        self != LodTier::Culled
    }
}

impl fmt::Display for LodTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LodTier::Culled => f.write_str("culled"),
            tier => write!(f, "lod{}", tier.index()),
        }
    }
}
