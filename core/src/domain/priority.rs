//! Subtask priority levels.

use serde::{Deserialize, Serialize};

/// Priority for subtasks and acceptance gating. Ordered so `P0 < P1 < P2 < P3`
/// would read backwards; `Ord` instead ranks `P0` (most urgent) highest so a
/// max-heap scheduler naturally pops it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    P3,
    P2,
    #[default]
    P1,
    P0,
}

impl Priority {
    fn rank(self) -> u8 {
        match self {
            Priority::P0 => 3,
            Priority::P1 => 2,
            Priority::P2 => 1,
            Priority::P3 => 0,
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P0 => write!(f, "P0"),
            Self::P1 => write!(f, "P1"),
            Self::P2 => write!(f, "P2"),
            Self::P3 => write!(f, "P3"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "P0" => Ok(Self::P0),
            "P1" => Ok(Self::P1),
            "P2" => Ok(Self::P2),
            "P3" => Ok(Self::P3),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p0_outranks_p3() {
        assert!(Priority::P0 > Priority::P3);
        assert!(Priority::P1 > Priority::P2);
    }

    #[test]
    fn display_and_parse_round_trip() {
        for p in [Priority::P0, Priority::P1, Priority::P2, Priority::P3] {
            assert_eq!(p.to_string().parse::<Priority>().unwrap(), p);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("p0".parse::<Priority>().unwrap(), Priority::P0);
    }
}
