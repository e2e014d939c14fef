use crate::core::models::cell::PARAMETER_NAMES;
use crate::core::models::observation::Observation;
use crate::core::utils::statistics::{median, weighted_mean_std};
use crate::engine::error::EngineError;
use tracing::{debug, instrument};

/// Half-width of the window around the median used for each parameter.
pub const WINDOW_HALF_WIDTH: f64 = 2.0;

/// Weighted mean and standard deviation of each cell parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellEstimate {
    pub constants: [f64; 6],
    pub esds: [f64; 6],
}

/// Estimates the unit cell from a batch of (axis-ordered) cells.
///
/// For each parameter only values strictly inside
/// `(median - 2, median + 2)` count; an empty window yields `(0, 0)`.
#[instrument(skip_all, name = "cell_estimate_workflow")]
pub fn run(observations: &[Observation]) -> Result<CellEstimate, EngineError> {
    if observations.is_empty() {
        return Err(EngineError::InsufficientData { found: 0 });
    }
    let params: Vec<[f64; 6]> = observations
        .iter()
        .map(|o| *o.cell.sorted_by_length().params())
        .collect();
    let weights: Vec<f64> = observations.iter().map(|o| o.weight).collect();

    let mut estimate = CellEstimate {
        constants: [0.0; 6],
        esds: [0.0; 6],
    };
    for k in 0..6 {
        let column: Vec<f64> = params.iter().map(|p| p[k]).collect();
        let center = median(&column).unwrap_or_default();
        let (lo, hi) = (center - WINDOW_HALF_WIDTH, center + WINDOW_HALF_WIDTH);
        let (values, selected_weights): (Vec<f64>, Vec<f64>) = column
            .iter()
            .zip(&weights)
            .filter(|(v, _)| **v > lo && **v < hi)
            .map(|(v, w)| (*v, *w))
            .unzip();
        let (mu, sigma) = weighted_mean_std(&values, &selected_weights).unwrap_or((0.0, 0.0));
        debug!(
            parameter = PARAMETER_NAMES[k],
            selected = values.len(),
            mean = mu,
            esd = sigma
        );
        estimate.constants[k] = mu;
        estimate.esds[k] = sigma;
    }
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::UnitCell;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn obs(params: [f64; 6], weight: f64) -> Observation {
        Observation::new("x", UnitCell::new(params).unwrap(), 1, weight)
    }

    #[test]
    fn values_far_from_the_median_are_ignored() {
        let observations = vec![
            obs([10.0, 11.0, 12.0, 90.0, 90.0, 90.0], 1.0),
            obs([10.2, 11.0, 12.0, 90.0, 90.0, 90.0], 3.0),
            obs([10.1, 11.0, 12.0, 90.0, 90.0, 90.0], 1.0),
            obs([10.1, 11.0, 16.0, 90.0, 90.0, 90.0], 1.0),
        ];
        let estimate = run(&observations).unwrap();
        // a: weights 1, 3, 1, 1 over 10.0, 10.2, 10.1, 10.1
        assert!(approx_eq(estimate.constants[0], (10.0 + 3.0 * 10.2 + 10.1 + 10.1) / 6.0));
        // c: the 16.0 entry lies outside median +/- 2
        assert!(approx_eq(estimate.constants[2], 12.0));
        assert!(approx_eq(estimate.esds[2], 0.0));
        assert!(approx_eq(estimate.constants[4], 90.0));
    }

    #[test]
    fn empty_window_yields_zero() {
        // Two clusters far apart: the median falls between them.
        let observations = vec![
            obs([10.0, 11.0, 12.0, 90.0, 90.0, 90.0], 1.0),
            obs([20.0, 21.0, 22.0, 90.0, 90.0, 90.0], 1.0),
        ];
        let estimate = run(&observations).unwrap();
        assert_eq!(estimate.constants[0], 0.0);
        assert_eq!(estimate.esds[0], 0.0);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            run(&[]),
            Err(EngineError::InsufficientData { found: 0 })
        ));
    }
}
