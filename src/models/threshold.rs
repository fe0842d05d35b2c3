//! Vote-threshold policies and the pass/fail evaluation.
//!
//! Thresholds are measured against votes cast, not roster size. Abstentions
//! count toward the total but never toward "yes".

use serde::{Deserialize, Serialize};

use crate::models::vote::Tally;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoteThreshold {
    #[default]
    #[serde(rename = "Simple Majority", alias = "simple_majority")]
    SimpleMajority,
    #[serde(rename = "Two-Thirds", alias = "two_thirds")]
    TwoThirds,
    #[serde(rename = "Unanimous", alias = "unanimous")]
    Unanimous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// Yes votes needed to pass. 1 when nothing has been cast yet.
    pub required: u64,
    pub passing: bool,
    pub total: u64,
}

pub fn evaluate(tally: &Tally, threshold: VoteThreshold) -> Evaluation {
    let total = tally.total();
    if total == 0 {
        return Evaluation {
            required: 1,
            passing: false,
            total,
        };
    }

    let (required, passing) = match threshold {
        VoteThreshold::TwoThirds => {
            // ceil(2t / 3)
            let required = (2 * total).div_ceil(3);
            (required, tally.yes >= required)
        }
        VoteThreshold::Unanimous => (total, tally.yes == total),
        VoteThreshold::SimpleMajority => {
            let required = total / 2 + 1;
            (required, tally.yes >= required)
        }
    };

    Evaluation {
        required,
        passing,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn threshold_names_round_trip_through_documents() {
        assert_eq!(
            serde_json::to_value(VoteThreshold::TwoThirds).unwrap(),
            json!("Two-Thirds")
        );
        let parsed: VoteThreshold = serde_json::from_value(json!("Simple Majority")).unwrap();
        assert_eq!(parsed, VoteThreshold::SimpleMajority);
        let alias: VoteThreshold = serde_json::from_value(json!("unanimous")).unwrap();
        assert_eq!(alias, VoteThreshold::Unanimous);
    }

    #[test]
    fn two_thirds_rounds_up() {
        let tally = Tally { yes: 4, no: 2, abstain: 1 };
        let eval = evaluate(&tally, VoteThreshold::TwoThirds);
        assert_eq!(eval.total, 7);
        assert_eq!(eval.required, 5);
        assert!(!eval.passing);
    }
}
