//! Work priorities.

use std::fmt;

/// Priority of a scheduled work item (lower = more urgent).
///
/// Within one pass every `Critical` item is admitted before any `High` item,
/// and so on down. `Critical` and `High` are never skipped by the distance
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum UpdatePriority {
    /// Must run every time it is due, budget permitting.
    Critical = 0,
    /// Important, never skipped by distance.
    High = 1,
    /// Regular gameplay logic.
    #[default]
    Normal = 2,
    /// Background logic, skipped more readily when far away.
    Low = 3,
    /// Cosmetic or ambient logic, the first to be skipped.
    VeryLow = 4,
}

impl UpdatePriority {
    /// All priorities, most urgent first.
    pub const ALL: [UpdatePriority; 5] = [
        UpdatePriority::Critical,
        UpdatePriority::High,
        UpdatePriority::Normal,
        UpdatePriority::Low,
        UpdatePriority::VeryLow,
    ];

    /// Numeric rank, 0 for `Critical`.
    pub fn rank(self) -> usize {
        self as usize
    }

    /// The priority `steps` levels less urgent, saturating at `VeryLow`.
    pub fn demoted(self, steps: usize) -> UpdatePriority {
        let rank = (self.rank() + steps).min(Self::ALL.len() - 1);
        Self::ALL[rank]
    }

    /// Whether the distance skip policy may skip work of this priority.
    pub fn is_skippable(self) -> bool {
        self > UpdatePriority::High
    }
}

impl fmt::Display for UpdatePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdatePriority::Critical => "critical",
            UpdatePriority::High => "high",
            UpdatePriority::Normal => "normal",
            UpdatePriority::Low => "low",
            UpdatePriority::VeryLow => "very-low",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priorities_order_by_urgency() {
        assert!(UpdatePriority::Critical < UpdatePriority::High);
        assert!(UpdatePriority::Low < UpdatePriority::VeryLow);
        let mut shuffled = vec![
            UpdatePriority::Low,
            UpdatePriority::Critical,
            UpdatePriority::VeryLow,
            UpdatePriority::Normal,
            UpdatePriority::High,
        ];
        shuffled.sort();
        assert_eq!(shuffled, UpdatePriority::ALL.to_vec());
    }

    #[test]
    fn test_demoted_saturates() {
        assert_eq!(UpdatePriority::Normal.demoted(0), UpdatePriority::Normal);
        assert_eq!(UpdatePriority::Normal.demoted(1), UpdatePriority::Low);
        assert_eq!(UpdatePriority::High.demoted(10), UpdatePriority::VeryLow);
    }

    #[test]
    fn test_only_lower_priorities_are_skippable() {
        assert!(!UpdatePriority::Critical.is_skippable());
        assert!(!UpdatePriority::High.is_skippable());
        assert!(UpdatePriority::Normal.is_skippable());
        assert!(UpdatePriority::VeryLow.is_skippable());
    }
}
