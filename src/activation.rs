//! Sigmoid activation and its derivative.
//!
//! Both are scalar functions; callers apply them element-wise with
//! `Array1::mapv`.

/// σ(z) = 1 / (1 + e^-z). Squashes values to (0, 1).
pub fn sigmoid(z: f32) -> f32 {
    1. / (1. + (-z).exp())
}

/// σ'(z) = σ(z) · (1 − σ(z)), computed from the pre-activation `z`.
pub fn sigmoid_prime(z: f32) -> f32 {
    let s = sigmoid(z);
    s * (1. - s)
}
