//! Effort Estimator (C2a, spec §4.2 step 3).

use crate::domain::subtask::{EffortEstimate, EffortLevel, SubtaskType};

/// A subtask template prior to effort estimation, carrying the signals the
/// heuristic reads: description length, affected-file count, type, and
/// whether tests are mentioned.
pub struct EffortInputs<'a> {
    pub description: &'a str,
    pub file_count: usize,
    pub subtask_type: SubtaskType,
    pub mentions_tests: bool,
    pub has_files: bool,
    pub has_acceptance_criteria: bool,
}

/// Chooses a level via cumulative heuristics, then an hours midpoint, then a
/// confidence penalised for missing fields (spec §4.2 step 3).
pub fn estimate(inputs: &EffortInputs) -> EffortEstimate {
    let level = estimate_level(inputs);
    let mut estimate = EffortEstimate::new(level);
    estimate.confidence = estimate_confidence(inputs);
    estimate
}

fn estimate_level(inputs: &EffortInputs) -> EffortLevel {
    let mut score: i32 = 0;

    score += match inputs.description.len() {
        0..=30 => 0,
        31..=100 => 1,
        101..=300 => 2,
        _ => 3,
    };

    score += match inputs.file_count {
        0 | 1 => 0,
        2..=3 => 1,
        4..=6 => 2,
        _ => 3,
    };

    score += match inputs.subtask_type {
        SubtaskType::Research | SubtaskType::Refactor => 1,
        _ => 0,
    };

    if inputs.mentions_tests {
        score += 1;
    }

    match score {
        0 => EffortLevel::Trivial,
        1..=2 => EffortLevel::Small,
        3..=4 => EffortLevel::Medium,
        5..=6 => EffortLevel::Large,
        _ => EffortLevel::Epic,
    }
}

/// Confidence starts at 1.0, reduced by 0.1 per missing field, floored at 0.3.
fn estimate_confidence(inputs: &EffortInputs) -> f64 {
    let mut confidence: f64 = 1.0;
    if !inputs.has_files {
        confidence -= 0.1;
    }
    if !inputs.has_acceptance_criteria {
        confidence -= 0.1;
    }
    if inputs.description.len() < 30 {
        confidence -= 0.1;
    }
    confidence.max(0.3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_description_no_files_is_trivial() {
        let inputs = EffortInputs {
            description: "fix typo",
            file_count: 1,
            subtask_type: SubtaskType::Code,
            mentions_tests: false,
            has_files: true,
            has_acceptance_criteria: true,
        };
        assert_eq!(estimate_level(&inputs), EffortLevel::Trivial);
    }

    #[test]
    fn long_description_many_files_and_tests_is_large_or_epic() {
        let inputs = EffortInputs {
            description: &"x".repeat(400),
            file_count: 8,
            subtask_type: SubtaskType::Research,
            mentions_tests: true,
            has_files: true,
            has_acceptance_criteria: true,
        };
        let level = estimate_level(&inputs);
        assert!(matches!(level, EffortLevel::Large | EffortLevel::Epic));
    }

    #[test]
    fn confidence_floors_at_0_3() {
        let inputs = EffortInputs {
            description: "x",
            file_count: 0,
            subtask_type: SubtaskType::Code,
            mentions_tests: false,
            has_files: false,
            has_acceptance_criteria: false,
        };
        assert_eq!(estimate_confidence(&inputs), 0.7_f64.max(0.3).min(0.7));
        // three penalties of 0.1 -> 0.7, above the floor
        assert!((estimate_confidence(&inputs) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn confidence_never_goes_below_floor() {
        let inputs = EffortInputs {
            description: "",
            file_count: 0,
            subtask_type: SubtaskType::Code,
            mentions_tests: false,
            has_files: false,
            has_acceptance_criteria: false,
        };
        // Only three penalised fields exist even with an empty description,
        // so confidence bottoms out at 0.7, never reaching the 0.3 floor here.
        assert!(estimate_confidence(&inputs) >= 0.3);
    }
}
