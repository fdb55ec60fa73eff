//! A minimal feedforward neural-network engine: multi-layer perceptron
//! construction, forward inference, backpropagation, and mini-batch
//! stochastic gradient descent.
//!
//! The engine owns nothing beyond the network and the training
//! protocol. Input preprocessing (e.g. rescaling a drawn digit into a
//! normalized grayscale vector) and presentation live in the
//! surrounding application; trained parameters move in and out through
//! a [`store::ParamStore`].

pub mod activation;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod gradient;
pub mod network;
pub mod store;
pub mod trainer;

pub use dataset::{Sample, one_hot};
pub use error::{NetError, Result};
pub use evaluate::{argmax, evaluate};
pub use gradient::backprop;
pub use network::Network;
pub use store::{JsonFileStore, ParamStore, SavedParams, StoreError};
pub use trainer::{AbortFlag, Trainer};
