//! Outcome model and probability oracle as pure functions.
//!
//! An outcome is a face-count vector: `counts[f]` = number of dice showing face
//! `f`. The probability of an outcome after rolling `n` fair six-sided dice is
//! the multinomial
//!
//! ```text
//! P(counts | n) = n! / (k0! * k1! * ... * k5!) / 6^n
//! ```
//!
//! [`crate::outcome_tables::OutcomeTables`] caches both the enumeration and the
//! probabilities per `n`; the functions here are the uncached reference forms.

use crate::constants::{FACE_LABELS, N_FACES};
use crate::error::SolverError;

/// Face-count vector for a roll. Entries sum to the number of dice described.
pub type FaceCounts = [u8; N_FACES];

/// Total number of dice described by an outcome.
#[inline]
pub fn outcome_dice(outcome: &FaceCounts) -> u32 {
    outcome.iter().map(|&c| c as u32).sum()
}

/// Convert raw die results (faces 0..6) to a face-count vector.
pub fn to_face_counts(die_results: &[u8]) -> Result<FaceCounts, SolverError> {
    if die_results.len() > u8::MAX as usize {
        return Err(SolverError::RollTooLarge {
            dice: die_results.len(),
        });
    }
    let mut counts = [0u8; N_FACES];
    for &face in die_results {
        if face as usize >= N_FACES {
            return Err(SolverError::FaceOutOfRange { face });
        }
        counts[face as usize] += 1;
    }
    Ok(counts)
}

/// Expand a face-count vector back to individual dice, ascending.
pub fn face_counts_to_dice(outcome: &FaceCounts) -> Vec<u8> {
    let mut dice = Vec::with_capacity(outcome_dice(outcome) as usize);
    for (face, &count) in outcome.iter().enumerate() {
        for _ in 0..count {
            dice.push(face as u8);
        }
    }
    dice
}

/// Dice of an outcome as face labels, ascending (`"W 3 3 5"`).
pub fn format_dice(outcome: &FaceCounts) -> String {
    face_counts_to_dice(outcome)
        .iter()
        .map(|&f| FACE_LABELS[f as usize])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Enumerate every face-count vector summing to `n`, in lexicographic order.
///
/// There are C(n+5, 5) of them; `n = 0` yields the single all-zero vector.
pub fn enumerate_outcomes(n: u8) -> Vec<FaceCounts> {
    let mut out = Vec::with_capacity(num_outcomes(n));
    let mut current = [0u8; N_FACES];
    fill_outcomes(0, n, &mut current, &mut out);
    out
}

fn fill_outcomes(pos: usize, remaining: u8, current: &mut FaceCounts, out: &mut Vec<FaceCounts>) {
    if pos == N_FACES - 1 {
        current[pos] = remaining;
        out.push(*current);
        return;
    }
    for k in 0..=remaining {
        current[pos] = k;
        fill_outcomes(pos + 1, remaining - k, current, out);
    }
}

/// Number of distinct outcomes for `n` dice: C(n+5, 5).
pub fn num_outcomes(n: u8) -> usize {
    let n = n as usize;
    let mut c = 1usize;
    for j in 1..N_FACES {
        c = c * (n + j) / j;
    }
    c
}

/// ln(n!) by direct summation.
pub fn ln_factorial(n: u32) -> f64 {
    (2..=n).map(|k| (k as f64).ln()).sum()
}

/// Multinomial coefficient n! / prod(k_i!), or `None` if it overflows u64.
///
/// Built as a product of binomials C(k_0+..+k_i, k_i), each computed with the
/// exact multiplicative formula.
pub fn multinomial_coefficient(outcome: &FaceCounts) -> Option<u64> {
    let mut total = 0u64;
    let mut coef = 1u64;
    for &k in outcome {
        let k = k as u64;
        total += k;
        let mut binom = 1u64;
        for j in 1..=k {
            binom = binom.checked_mul(total - k + j)? / j;
        }
        coef = coef.checked_mul(binom)?;
    }
    Some(coef)
}

/// P(outcome | n dice rolled) under independent uniform six-sided dice.
///
/// Fails with [`SolverError::InvalidOutcome`] when the outcome does not sum to `n`.
pub fn outcome_probability(outcome: &FaceCounts, n: u8) -> Result<f64, SolverError> {
    let actual = outcome_dice(outcome);
    if actual != n as u32 {
        return Err(SolverError::InvalidOutcome {
            expected: n,
            actual,
        });
    }
    Ok(multinomial_probability(outcome, n))
}

/// Multinomial probability without the sum check.
///
/// Exact integer coefficient while it fits, log space beyond that.
pub(crate) fn multinomial_probability(outcome: &FaceCounts, n: u8) -> f64 {
    let total_outcomes = (N_FACES as f64).powi(n as i32);
    match multinomial_coefficient(outcome) {
        Some(coef) if total_outcomes.is_finite() => coef as f64 / total_outcomes,
        _ => {
            let ln_denominator: f64 = outcome.iter().map(|&k| ln_factorial(k as u32)).sum();
            let ln_p = ln_factorial(n as u32)
                - ln_denominator
                - n as f64 * (N_FACES as f64).ln();
            ln_p.exp()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_face_counts() {
        let counts = to_face_counts(&[1, 3, 3, 3, 4, 4, 5, 0]).unwrap();
        assert_eq!(counts, [1, 1, 0, 3, 2, 1]);

        let counts = to_face_counts(&[]).unwrap();
        assert_eq!(counts, [0; N_FACES]);

        assert_eq!(
            to_face_counts(&[0, 6]),
            Err(SolverError::FaceOutOfRange { face: 6 })
        );
    }

    #[test]
    fn test_to_face_counts_reports_oversized_roll() {
        let err = to_face_counts(&[1u8; 300]).unwrap_err();
        assert_eq!(err, SolverError::RollTooLarge { dice: 300 });
        assert!(err.to_string().contains("300"));
        assert_eq!(to_face_counts(&[2u8; 255]).unwrap()[2], 255);
    }

    #[test]
    fn test_face_counts_to_dice() {
        let dice = face_counts_to_dice(&[1, 0, 2, 0, 0, 1]);
        assert_eq!(dice, vec![0, 2, 2, 5]);
        assert_eq!(to_face_counts(&dice).unwrap(), [1, 0, 2, 0, 0, 1]);
    }

    #[test]
    fn test_format_dice() {
        assert_eq!(format_dice(&[1, 0, 2, 0, 0, 1]), "W 2 2 5");
        assert_eq!(format_dice(&[0, 1, 0, 0, 0, 7]), "1 5 5 5 5 5 5 5");
        assert_eq!(format_dice(&[0; N_FACES]), "");
    }

    #[test]
    fn test_enumerate_zero_dice() {
        assert_eq!(enumerate_outcomes(0), vec![[0u8; N_FACES]]);
    }

    #[test]
    fn test_enumerate_counts() {
        assert_eq!(enumerate_outcomes(1).len(), 6);
        assert_eq!(enumerate_outcomes(2).len(), 21);
        assert_eq!(enumerate_outcomes(5).len(), 252);
        assert_eq!(enumerate_outcomes(8).len(), 1287);
        for n in 0..=8u8 {
            assert_eq!(enumerate_outcomes(n).len(), num_outcomes(n));
        }
    }

    #[test]
    fn test_enumerate_sums_and_uniqueness() {
        let outcomes = enumerate_outcomes(4);
        for o in &outcomes {
            assert_eq!(outcome_dice(o), 4);
        }
        let mut sorted = outcomes.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), outcomes.len());
        // Lexicographic order
        assert_eq!(sorted, outcomes);
    }

    #[test]
    fn test_multinomial_coefficient() {
        assert_eq!(multinomial_coefficient(&[0; N_FACES]), Some(1));
        assert_eq!(multinomial_coefficient(&[8, 0, 0, 0, 0, 0]), Some(1));
        assert_eq!(multinomial_coefficient(&[1, 1, 1, 1, 1, 1]), Some(720));
        assert_eq!(multinomial_coefficient(&[1, 0, 0, 0, 0, 7]), Some(8));
        assert_eq!(multinomial_coefficient(&[2, 2, 0, 0, 0, 0]), Some(6));
    }

    #[test]
    fn test_probability() {
        let p = outcome_probability(&[0, 0, 0, 0, 0, 0], 0).unwrap();
        assert_eq!(p, 1.0);

        let p = outcome_probability(&[0, 1, 0, 0, 0, 0], 1).unwrap();
        assert!((p - 1.0 / 6.0).abs() < 1e-15);

        let p = outcome_probability(&[5, 0, 0, 0, 0, 0], 5).unwrap();
        assert!((p - 1.0 / 7776.0).abs() < 1e-15);

        let p = outcome_probability(&[4, 1, 0, 0, 0, 0], 5).unwrap();
        assert!((p - 5.0 / 7776.0).abs() < 1e-15);

        for n in 0..=8u8 {
            let sum: f64 = enumerate_outcomes(n)
                .iter()
                .map(|o| outcome_probability(o, n).unwrap())
                .sum();
            assert!((sum - 1.0).abs() < 1e-12, "n={n} sum={sum}");
        }
    }

    #[test]
    fn test_probability_rejects_bad_sum() {
        assert_eq!(
            outcome_probability(&[1, 1, 0, 0, 0, 0], 3),
            Err(SolverError::InvalidOutcome {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_probability_large_pool_stays_finite() {
        // The coefficient overflows u64, so this exercises the log-space path.
        let outcome = [42, 42, 42, 42, 41, 41];
        assert_eq!(multinomial_coefficient(&outcome), None);
        let p = outcome_probability(&outcome, 250).unwrap();
        assert!(p.is_finite() && p > 0.0 && p < 1.0, "p={p}");
    }
}
