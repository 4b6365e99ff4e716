//! Interval binning for the derived categorical features.
//!
//! The three binnings below must reproduce the discretisation applied when
//! the survival model was trained; drifting edges or labels silently feed the
//! model categories it has never seen. Their edges and labels therefore only
//! change together with the model artifact.

use thiserror::Error;

/// Maps a continuous value onto a labelled interval.
///
/// Intervals are right-closed: a value `v` falls into interval `i` when
/// `edges[i] < v <= edges[i+1]`. The first interval additionally includes its
/// lower edge, so the total domain is the closed range from the first edge to
/// the last. Values outside that domain (and non-finite values) belong to no
/// interval.
#[derive(Debug, Clone)]
pub struct Binning {
    edges: Vec<f64>,
    labels: Vec<String>,
}

/// Error type for binning construction.
#[derive(Error, Debug)]
pub enum BinningError {
    #[error("A binning requires at least two edges, but {0} were given.")]
    TooFewEdges(usize),

    #[error(
        "A binning needs one label per interval: {edges} edges define {intervals} intervals, but {labels} labels were given."
    )]
    LabelCountMismatch {
        edges: usize,
        intervals: usize,
        labels: usize,
    },

    #[error(
        "Binning edges must be strictly increasing, but edge {index} ({value}) does not exceed its predecessor ({previous})."
    )]
    EdgesNotIncreasing {
        index: usize,
        value: f64,
        previous: f64,
    },
}

impl Binning {
    /// Builds a binning from ordered edges and per-interval labels.
    pub fn new(edges: Vec<f64>, labels: Vec<String>) -> Result<Self, BinningError> {
        if edges.len() < 2 {
            return Err(BinningError::TooFewEdges(edges.len()));
        }
        if labels.len() != edges.len() - 1 {
            return Err(BinningError::LabelCountMismatch {
                edges: edges.len(),
                intervals: edges.len() - 1,
                labels: labels.len(),
            });
        }
        for (index, pair) in edges.windows(2).enumerate() {
            if !(pair[1] > pair[0]) {
                return Err(BinningError::EdgesNotIncreasing {
                    index: index + 1,
                    value: pair[1],
                    previous: pair[0],
                });
            }
        }
        Ok(Self { edges, labels })
    }

    /// Returns the label of the interval containing `value`, or `None` when
    /// `value` lies outside every interval.
    pub fn categorize(&self, value: f64) -> Option<&str> {
        for (index, pair) in self.edges.windows(2).enumerate() {
            let above_lower = if index == 0 {
                value >= pair[0]
            } else {
                value > pair[0]
            };
            if above_lower && value <= pair[1] {
                return Some(&self.labels[index]);
            }
        }
        None
    }

    /// The interval labels, in edge order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

fn fixed(edges: &[f64], labels: &[&str]) -> Binning {
    Binning::new(
        edges.to_vec(),
        labels.iter().map(|label| label.to_string()).collect(),
    )
    .expect("fixed edges and labels are valid")
}

/// Age bands used for the `age_group` feature.
pub fn age_groups() -> Binning {
    fixed(
        &[0.0, 18.0, 30.0, 45.0, 60.0, 75.0, 100.0],
        &["<18", "18-29", "30-44", "45-59", "60-74", "75+"],
    )
}

/// WHO-style weight bands used for the `bmi_category` feature.
pub fn bmi_categories() -> Binning {
    fixed(
        &[0.0, 18.5, 24.9, 29.9, 100.0],
        &["underweight", "normal", "overweight", "obese"],
    )
}

/// Total cholesterol bands used for the `cholesterol_category` feature.
pub fn cholesterol_categories() -> Binning {
    fixed(
        &[0.0, 200.0, 239.0, 1000.0],
        &["Desirable", "Borderline high", "High"],
    )
}
