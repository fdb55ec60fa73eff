use ndarray::Array1;

use crate::error::{NetError, Result};

/// One labeled training or test example: an input vector sized to the
/// network's input layer and a target vector sized to its output layer,
/// typically a one-hot class encoding.
#[derive(Debug, Clone)]
pub struct Sample {
    pub input: Array1<f32>,
    pub target: Array1<f32>,
}

impl Sample {
    pub fn new(input: Array1<f32>, target: Array1<f32>) -> Self {
        Self { input, target }
    }
}

/// Builds a one-hot target vector for `label` over `classes` classes.
///
/// # Errors
/// Returns `NetError::InvalidConfiguration` if `label >= classes`.
pub fn one_hot(label: usize, classes: usize) -> Result<Array1<f32>> {
    if label >= classes {
        return Err(NetError::InvalidConfiguration {
            what: "class label out of range",
        });
    }
    Ok(Array1::from_shape_fn(classes, |i| if i == label { 1. } else { 0. }))
}
