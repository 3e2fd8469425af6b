//! Explanation synthesis
//!
//! Turns a flagged point and the statistics behind it into plain text. Output
//! depends only on the arguments, with fixed numeric precision, so identical
//! inputs always give byte-identical text.

use crate::types::{AnomalyResult, Direction, ReferenceScope, ReferenceStats};

/// Write the explanation for `result` measured against `reference`
pub fn explain(result: &AnomalyResult, reference: &ReferenceStats) -> String {
    let (comparative, side) = match result.direction {
        Direction::High => ("higher", "above"),
        Direction::Low => ("lower", "below"),
    };

    let baseline = match reference.scope {
        ReferenceScope::Global => format!("the overall daily average of {:.2}", reference.mean),
        ReferenceScope::Trailing { days } => {
            format!("the preceding {}-day average of {:.2}", days, reference.mean)
        }
    };

    let date = result.date.format("%Y-%m-%d");

    if reference.std_dev > 0.0 {
        format!(
            "On {date}, enrolments ({observed}) were significantly {comparative} than {baseline} \
             ({method}: {score:+.2}). This is {magnitude:.1} standard deviations {side} the mean.",
            observed = result.observed_value,
            method = result.method.label(),
            score = result.score,
            magnitude = result.score.abs(),
        )
    } else {
        let difference = (result.observed_value as f64 - reference.mean).abs();
        format!(
            "On {date}, enrolments ({observed}) were significantly {comparative} than {baseline}, \
             which showed no variation; the value is {difference:.0} enrolments {side} it \
             ({method}: {score:+.2}).",
            observed = result.observed_value,
            method = result.method.label(),
            score = result.score,
        )
    }
}

/// One-line summary of how a method flags points, for report methodology blocks
pub fn describe_method(reference: ReferenceScope, threshold: f64) -> String {
    match reference {
        ReferenceScope::Global => format!(
            "Z-score analysis flags days whose total lies at least {threshold} standard deviations \
             from the mean of the whole period."
        ),
        ReferenceScope::Trailing { days } => format!(
            "Rolling analysis compares each day with the {days} days before it and flags days at \
             least {threshold} standard deviations from that trailing mean."
        ),
    }
}
