//! Share-vector arithmetic shared by every optimizer: bound projection and
//! integer finalization.

const EPSILON: f64 = 1e-9;

/// Clamps every share into `[min, max]` and redistributes the difference to
/// `total` across shares that still have room, proportionally to their
/// current size (equally when they are all zero).
///
/// When nothing is clamped this is plain renormalization. Best effort when
/// the bounds cannot reach `total` for this many shares.
pub(crate) fn project_to_bounds(values: &mut [f64], min: f64, max: f64, total: f64) {
    for value in values.iter_mut() {
        *value = value.clamp(min, max);
    }
    // Each pass pins at least one more share to a bound or converges.
    for _ in 0..=values.len() * 2 {
        let diff = total - values.iter().sum::<f64>();
        if diff.abs() < EPSILON {
            return;
        }
        let movable: Vec<usize> = (0..values.len())
            .filter(|&i| {
                if diff > 0.0 {
                    values[i] < max - EPSILON
                } else {
                    values[i] > min + EPSILON
                }
            })
            .collect();
        if movable.is_empty() {
            return;
        }
        let movable_sum: f64 = movable.iter().map(|&i| values[i]).sum();
        for &i in &movable {
            let portion = if movable_sum > EPSILON {
                values[i] / movable_sum
            } else {
                1.0 / movable.len() as f64
            };
            values[i] = (values[i] + diff * portion).clamp(min, max);
        }
    }
}

/// Index of the first occurrence of the largest value.
pub(crate) fn first_max_index(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, value) in values.iter().enumerate() {
        match best {
            Some(b) if *value <= values[b] => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Projects into bounds, rounds to whole percentages, and reconciles the
/// rounding residual onto the first largest share. Any bound the residual
/// breaks is then repaired one unit at a time.
pub(crate) fn finalize_shares(values: &[f64], min: f64, max: f64, total: f64) -> Vec<f64> {
    let mut projected = values.to_vec();
    project_to_bounds(&mut projected, min, max, total);
    let mut rounded: Vec<f64> = projected.iter().map(|value| value.round()).collect();
    let residual = total.round() - rounded.iter().sum::<f64>();
    if let Some(i) = first_max_index(&rounded) {
        rounded[i] += residual;
    }
    repair_bounds(&mut rounded, min.ceil(), max.floor());
    rounded
}

fn repair_bounds(values: &mut [f64], low: f64, high: f64) {
    if low > high {
        return;
    }
    let limit = values.len() * 100;
    for _ in 0..limit {
        if let Some(over) = values.iter().position(|v| *v > high) {
            let Some(receiver) = smallest_below(values, high) else {
                return;
            };
            values[over] -= 1.0;
            values[receiver] += 1.0;
        } else if let Some(under) = values.iter().position(|v| *v < low) {
            let Some(donor) = largest_above(values, low) else {
                return;
            };
            values[under] += 1.0;
            values[donor] -= 1.0;
        } else {
            return;
        }
    }
}

fn smallest_below(values: &[f64], high: f64) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, value) in values.iter().enumerate() {
        if *value + 1.0 > high {
            continue;
        }
        match best {
            Some(b) if *value >= values[b] => {}
            _ => best = Some(i),
        }
    }
    best
}

fn largest_above(values: &[f64], low: f64) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, value) in values.iter().enumerate() {
        if *value - 1.0 < low {
            continue;
        }
        match best {
            Some(b) if *value <= values[b] => {}
            _ => best = Some(i),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(values: &[f64]) -> f64 {
        values.iter().sum()
    }

    #[test]
    fn projection_without_clamping_is_renormalization() {
        let mut values = vec![30.0, 60.0, 10.0, 20.0];
        project_to_bounds(&mut values, 0.0, 100.0, 100.0);
        assert!((sum(&values) - 100.0).abs() < 1e-9);
        assert!((values[0] - 25.0).abs() < 1e-9);
        assert!((values[1] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn projection_redistributes_around_pinned_shares() {
        let mut values = vec![80.0, 18.0];
        project_to_bounds(&mut values, 5.0, 80.0, 100.0);
        assert!((values[0] - 80.0).abs() < 1e-9);
        assert!((values[1] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn projection_lifts_shares_below_minimum() {
        let mut values = vec![-2.0, 51.0, 51.0];
        project_to_bounds(&mut values, 5.0, 100.0, 100.0);
        assert!((sum(&values) - 100.0).abs() < 1e-9);
        assert!(values.iter().all(|v| *v >= 5.0 - 1e-9));
    }

    #[test]
    fn first_max_prefers_first_occurrence() {
        assert_eq!(first_max_index(&[10.0, 40.0, 40.0, 10.0]), Some(1));
        assert_eq!(first_max_index(&[]), None);
    }

    #[test]
    fn finalize_assigns_residual_to_first_largest() {
        let third = 100.0 / 3.0;
        let finalized = finalize_shares(&[third, third, third], 0.0, 100.0, 100.0);
        assert_eq!(finalized, vec![34.0, 33.0, 33.0]);
    }

    #[test]
    fn finalize_repairs_bound_broken_by_residual() {
        // Rounds to 80 + 6 + 6 + 7 = 99. The +1 residual lands on the capped
        // share and has to move to the smallest one.
        let finalized = finalize_shares(&[80.0, 6.4, 6.4, 7.2], 5.0, 80.0, 100.0);
        assert_eq!(finalized, vec![80.0, 7.0, 6.0, 7.0]);
        assert!((sum(&finalized) - 100.0).abs() < 1e-9);
        assert!(finalized.iter().all(|v| (5.0..=80.0).contains(v)));
        assert!(finalized.iter().all(|v| (v - v.round()).abs() < 1e-9));
    }

    #[test]
    fn finalize_scales_to_partial_total() {
        let finalized = finalize_shares(&[1.0, 1.0, 2.0], 0.0, 100.0, 60.0);
        assert_eq!(finalized, vec![15.0, 15.0, 30.0]);
    }
}
