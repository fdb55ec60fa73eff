//! Per-sample backpropagation for the quadratic cost
//! C = ½‖a_L − y‖².

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::activation::{sigmoid, sigmoid_prime};
use crate::error::{NetError, Result};
use crate::network::Network;

/// delta · aᵗ as an outer product: (n, 1) · (1, m) -> (n, m).
fn outer(delta: ArrayView1<f32>, a: ArrayView1<f32>) -> Array2<f32> {
    let d = delta.insert_axis(Axis(1));
    let a = a.insert_axis(Axis(0));
    d.dot(&a)
}

/// Computes the gradients of the quadratic cost for one sample with
/// respect to every bias and weight, returned as `(nabla_b, nabla_w)`
/// in layer order.
///
/// The forward pass caches every pre-activation `z` and activation `a`;
/// the output error is `(a_L − y) ⊙ σ'(z_last)` and propagates backward
/// through `delta ← (Wᵗ · delta) ⊙ σ'(z)`. The derivative σ' is always
/// taken from the stored pre-activation.
///
/// # Errors
/// Returns `NetError::DimensionMismatch` if `x` or `y` disagrees with
/// the input or output layer size.
pub fn backprop(
    net: &Network,
    x: ArrayView1<f32>,
    y: ArrayView1<f32>,
) -> Result<(Vec<Array1<f32>>, Vec<Array2<f32>>)> {
    let sizes = net.sizes();
    if x.len() != sizes[0] {
        return Err(NetError::DimensionMismatch {
            what: "input",
            got: x.len(),
            expected: sizes[0],
        });
    }
    if y.len() != sizes[sizes.len() - 1] {
        return Err(NetError::DimensionMismatch {
            what: "target",
            got: y.len(),
            expected: sizes[sizes.len() - 1],
        });
    }

    let weights = net.weights();
    let biases = net.biases();
    let n = weights.len();

    // forward pass, caching pre-activations and activations
    let mut activations = Vec::with_capacity(n + 1);
    let mut zs = Vec::with_capacity(n);
    activations.push(x.to_owned());
    for (w, b) in weights.iter().zip(biases) {
        let z = w.dot(activations.last().unwrap()) + b;
        activations.push(z.mapv(sigmoid));
        zs.push(z);
    }

    let mut nabla_b: Vec<Array1<f32>> = biases.iter().map(|b| Array1::zeros(b.dim())).collect();
    let mut nabla_w: Vec<Array2<f32>> = weights.iter().map(|w| Array2::zeros(w.dim())).collect();

    // output-layer error; the cost derivative of ½‖a − y‖² is (a − y)
    let mut delta = (activations[n].to_owned() - y) * zs[n - 1].mapv(sigmoid_prime);
    nabla_w[n - 1] = outer(delta.view(), activations[n - 1].view());
    nabla_b[n - 1] = delta.clone();

    for idx in (0..n - 1).rev() {
        delta = weights[idx + 1].t().dot(&delta) * zs[idx].mapv(sigmoid_prime);
        nabla_w[idx] = outer(delta.view(), activations[idx].view());
        nabla_b[idx] = delta.clone();
    }

    Ok((nabla_b, nabla_w))
}
