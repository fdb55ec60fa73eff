use ndarray::ArrayView1;

use crate::dataset::Sample;
use crate::error::Result;
use crate::network::Network;

/// Index of the largest component; ties resolve to the first index
/// attaining the maximum.
pub fn argmax(v: ArrayView1<f32>) -> usize {
    let mut best = 0;
    for (i, &val) in v.iter().enumerate() {
        if val > v[best] {
            best = i;
        }
    }
    best
}

/// Counts the test samples whose predicted class index matches the
/// target's class index. Read-only over the network.
///
/// # Errors
/// Returns `NetError::DimensionMismatch` if a sample's input does not
/// match the input layer size.
pub fn evaluate(net: &Network, test_data: &[Sample]) -> Result<usize> {
    let mut correct = 0;
    for sample in test_data {
        let out = net.feedforward(sample.input.view())?;
        if argmax(out.view()) == argmax(sample.target.view()) {
            correct += 1;
        }
    }
    Ok(correct)
}
