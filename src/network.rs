use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::activation::sigmoid;
use crate::error::{NetError, Result};
use crate::store::SavedParams;

/// A multi-layer perceptron: layer sizes plus one weight matrix and one
/// bias vector per layer transition.
///
/// The model is created once (random init or restored from a store) and
/// is mutated only through whole-parameter replacement — either the
/// bulk setters or [`Network::install`] at mini-batch end. Inference
/// and evaluation read it without mutating it.
pub struct Network {
    sizes: Vec<usize>,
    weights: Vec<Array2<f32>>,
    biases: Vec<Array1<f32>>,
}

impl Network {
    /// Builds a network with `sizes[i]` neurons in layer `i`, drawing
    /// every weight and bias from a standard normal distribution.
    ///
    /// # Errors
    /// Returns `NetError::InvalidConfiguration` if `sizes` has fewer
    /// than two entries or any entry is zero.
    pub fn new(sizes: &[usize], rng: &mut impl Rng) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(NetError::InvalidConfiguration {
                what: "layer sizes need at least an input and an output layer",
            });
        }
        if sizes.contains(&0) {
            return Err(NetError::InvalidConfiguration {
                what: "every layer needs at least one neuron",
            });
        }

        let biases = sizes[1..]
            .iter()
            .map(|&n| Array1::from_shape_fn(n, |_| rng.sample(StandardNormal)))
            .collect();

        let weights = (0..sizes.len() - 1)
            .map(|i| Array2::from_shape_fn((sizes[i + 1], sizes[i]), |_| rng.sample(StandardNormal)))
            .collect();

        Ok(Self {
            sizes: sizes.to_vec(),
            weights,
            biases,
        })
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn num_layers(&self) -> usize {
        self.sizes.len()
    }

    pub fn weights(&self) -> &[Array2<f32>] {
        &self.weights
    }

    pub fn biases(&self) -> &[Array1<f32>] {
        &self.biases
    }

    /// Replaces the full weight sequence from nested arrays, the layout
    /// a parameter store reads and writes. This is the sole path by
    /// which a pretrained model is loaded.
    ///
    /// The whole sequence is validated before anything is installed, so
    /// a mismatch leaves the model untouched.
    ///
    /// # Errors
    /// Returns `NetError::ShapeMismatch` if the sequence length or any
    /// matrix shape disagrees with the layer sizes.
    pub fn set_weights(&mut self, data: Vec<Vec<Vec<f32>>>) -> Result<()> {
        if data.len() != self.sizes.len() - 1 {
            return Err(NetError::ShapeMismatch {
                what: "weights".to_string(),
                got: data.len(),
                expected: self.sizes.len() - 1,
            });
        }

        let mut weights = Vec::with_capacity(data.len());
        for (i, matrix) in data.into_iter().enumerate() {
            let (rows, cols) = (self.sizes[i + 1], self.sizes[i]);
            if matrix.len() != rows {
                return Err(NetError::ShapeMismatch {
                    what: format!("weights[{i}] rows"),
                    got: matrix.len(),
                    expected: rows,
                });
            }
            let mut flat = Vec::with_capacity(rows * cols);
            for (r, row) in matrix.into_iter().enumerate() {
                if row.len() != cols {
                    return Err(NetError::ShapeMismatch {
                        what: format!("weights[{i}] row {r}"),
                        got: row.len(),
                        expected: cols,
                    });
                }
                flat.extend(row);
            }
            let got = flat.len();
            weights.push(Array2::from_shape_vec((rows, cols), flat).map_err(|_| {
                NetError::ShapeMismatch {
                    what: format!("weights[{i}]"),
                    got,
                    expected: rows * cols,
                }
            })?);
        }

        self.weights = weights;
        Ok(())
    }

    /// Replaces the full bias sequence from nested arrays. Each bias is
    /// stored as a column vector: `sizes[i+1]` rows of one element.
    ///
    /// # Errors
    /// Returns `NetError::ShapeMismatch` if the sequence length or any
    /// vector shape disagrees with the layer sizes.
    pub fn set_biases(&mut self, data: Vec<Vec<Vec<f32>>>) -> Result<()> {
        if data.len() != self.sizes.len() - 1 {
            return Err(NetError::ShapeMismatch {
                what: "biases".to_string(),
                got: data.len(),
                expected: self.sizes.len() - 1,
            });
        }

        let mut biases = Vec::with_capacity(data.len());
        for (i, column) in data.into_iter().enumerate() {
            let rows = self.sizes[i + 1];
            if column.len() != rows {
                return Err(NetError::ShapeMismatch {
                    what: format!("biases[{i}] rows"),
                    got: column.len(),
                    expected: rows,
                });
            }
            let mut flat = Vec::with_capacity(rows);
            for (r, row) in column.into_iter().enumerate() {
                if row.len() != 1 {
                    return Err(NetError::ShapeMismatch {
                        what: format!("biases[{i}] row {r}"),
                        got: row.len(),
                        expected: 1,
                    });
                }
                flat.extend(row);
            }
            biases.push(Array1::from_vec(flat));
        }

        self.biases = biases;
        Ok(())
    }

    /// Atomically installs a new parameter set produced by a mini-batch
    /// update. The tensors are expected to already conform to the layer
    /// sizes; the trainer derives them from the current parameters.
    pub(crate) fn install(&mut self, weights: Vec<Array2<f32>>, biases: Vec<Array1<f32>>) {
        debug_assert_eq!(weights.len(), self.weights.len());
        debug_assert_eq!(biases.len(), self.biases.len());
        debug_assert!(
            weights.iter().zip(&self.weights).all(|(a, b)| a.dim() == b.dim())
                && biases.iter().zip(&self.biases).all(|(a, b)| a.dim() == b.dim())
        );

        self.weights = weights;
        self.biases = biases;
    }

    /// Computes the output activation for `input` by successive affine
    /// transform + sigmoid per layer transition. Pure function of the
    /// model state and the input.
    ///
    /// # Errors
    /// Returns `NetError::DimensionMismatch` if `input` does not match
    /// the input layer size.
    pub fn feedforward(&self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        if input.len() != self.sizes[0] {
            return Err(NetError::DimensionMismatch {
                what: "input",
                got: input.len(),
                expected: self.sizes[0],
            });
        }

        let mut a = input.to_owned();
        for (w, b) in self.weights.iter().zip(&self.biases) {
            a = (w.dot(&a) + b).mapv(sigmoid);
        }

        Ok(a)
    }

    /// Exports the current parameters in the persisted-state layout.
    pub fn to_saved(&self) -> SavedParams {
        let weights = self
            .weights
            .iter()
            .map(|w| w.rows().into_iter().map(|r| r.to_vec()).collect())
            .collect();

        let biases = self
            .biases
            .iter()
            .map(|b| b.iter().map(|&v| vec![v]).collect())
            .collect();

        SavedParams { weights, biases }
    }
}
