use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use ndarray::{Array1, Array2};
use rand::Rng;

use crate::dataset::Sample;
use crate::error::{NetError, Result};
use crate::evaluate::evaluate;
use crate::gradient::backprop;
use crate::network::Network;
use crate::store::ParamStore;

/// Cooperative stop signal checked between epochs.
///
/// Aborting never interrupts a running mini-batch; the model is left in
/// its last fully-installed state.
#[derive(Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Mini-batch stochastic gradient descent over a [`Network`].
///
/// The trainer is the sole mutator of the model: each mini-batch is
/// computed to completion and its new parameters installed as a whole
/// before the next batch starts, so no torn update is ever observable.
/// Randomness (epoch shuffles) comes exclusively from the injected rng,
/// making a fixed seed reproduce a full training run.
pub struct Trainer<R: Rng> {
    rng: R,
    store: Option<Box<dyn ParamStore>>,
    abort: Option<AbortFlag>,
}

impl<R: Rng> Trainer<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            store: None,
            abort: None,
        }
    }

    /// Persists the parameters to `store` at the end of every epoch.
    pub fn with_store(mut self, store: Box<dyn ParamStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Checks `flag` between epochs and stops early when it is raised.
    pub fn with_abort(mut self, flag: AbortFlag) -> Self {
        self.abort = Some(flag);
        self
    }

    /// Trains `net` for `epochs` passes over `training_data`: shuffle,
    /// partition into mini-batches of `mini_batch_size` (the last batch
    /// may be shorter), apply one gradient-averaged update per batch.
    ///
    /// When `test_data` is supplied the epoch is scored and reported as
    /// `correct / total`; otherwise only completion is reported. Store
    /// write failures are logged and never fail the run.
    ///
    /// # Errors
    /// Returns `NetError::InvalidConfiguration` for zero `epochs` or
    /// `mini_batch_size`, or a non-finite or non-positive `eta`, and
    /// propagates `NetError::DimensionMismatch` from a malformed
    /// sample — without having installed any parameter from the batch
    /// that contained it.
    pub fn sgd(
        &mut self,
        net: &mut Network,
        training_data: &mut [Sample],
        epochs: usize,
        mini_batch_size: usize,
        eta: f32,
        test_data: Option<&[Sample]>,
    ) -> Result<()> {
        if epochs == 0 {
            return Err(NetError::InvalidConfiguration {
                what: "epochs must be at least 1",
            });
        }
        if mini_batch_size == 0 {
            return Err(NetError::InvalidConfiguration {
                what: "mini-batch size must be at least 1",
            });
        }
        if !eta.is_finite() || eta <= 0. {
            return Err(NetError::InvalidConfiguration {
                what: "learning rate must be a finite positive number",
            });
        }

        for epoch in 1..=epochs {
            if self.abort.as_ref().is_some_and(AbortFlag::is_aborted) {
                info!("training aborted before epoch {epoch}");
                break;
            }

            self.shuffle(training_data);

            for batch in mini_batches(training_data, mini_batch_size) {
                let (weights, biases) = update_mini_batch(net, batch, eta)?;
                net.install(weights, biases);
            }

            if let Some(store) = &mut self.store {
                if let Err(e) = store.save(&net.to_saved()) {
                    warn!("failed to persist parameters after epoch {epoch}: {e}");
                }
            }

            match test_data {
                Some(test) => {
                    let correct = evaluate(net, test)?;
                    info!("epoch {epoch}: {correct} / {}", test.len());
                }
                None => info!("epoch {epoch} complete"),
            }
        }

        Ok(())
    }

    /// Fisher–Yates: swap each position, last to second, with a
    /// uniformly random index at or below it.
    fn shuffle(&mut self, data: &mut [Sample]) {
        for i in (1..data.len()).rev() {
            let j = self.rng.random_range(0..=i);
            data.swap(i, j);
        }
    }
}

/// Consecutive mini-batches of at most `size` samples; the final batch
/// carries the remainder when the dataset does not divide evenly.
fn mini_batches(data: &[Sample], size: usize) -> impl Iterator<Item = &[Sample]> {
    data.chunks(size)
}

/// Computes one gradient-averaged update over `batch` and returns the
/// new parameter sequences without touching the model; the caller
/// installs them. Every intermediate gradient tensor is scoped to this
/// call and released on exit, success or failure.
fn update_mini_batch(
    net: &Network,
    batch: &[Sample],
    eta: f32,
) -> Result<(Vec<Array2<f32>>, Vec<Array1<f32>>)> {
    let mut nabla_b: Vec<Array1<f32>> =
        net.biases().iter().map(|b| Array1::zeros(b.dim())).collect();
    let mut nabla_w: Vec<Array2<f32>> =
        net.weights().iter().map(|w| Array2::zeros(w.dim())).collect();

    for sample in batch {
        let (delta_b, delta_w) = backprop(net, sample.input.view(), sample.target.view())?;
        nabla_b.iter_mut().zip(delta_b).for_each(|(nb, db)| *nb += &db);
        nabla_w.iter_mut().zip(delta_w).for_each(|(nw, dw)| *nw += &dw);
    }

    let scale = eta / batch.len() as f32;

    let weights = net
        .weights()
        .iter()
        .zip(&nabla_w)
        .map(|(w, nw)| {
            let mut w = w.clone();
            w.scaled_add(-scale, nw);
            w
        })
        .collect();

    let biases = net
        .biases()
        .iter()
        .zip(&nabla_b)
        .map(|(b, nb)| {
            let mut b = b.clone();
            b.scaled_add(-scale, nb);
            b
        })
        .collect();

    Ok((weights, biases))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::{SavedParams, StoreError};
    use ndarray::Array1;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io;

    fn sample(v: f32) -> Sample {
        Sample::new(Array1::from_vec(vec![v, 1. - v]), Array1::from_vec(vec![1.]))
    }

    fn samples(n: usize) -> Vec<Sample> {
        (0..n).map(|i| sample(i as f32 / n as f32)).collect()
    }

    fn net() -> Network {
        Network::new(&[2, 3, 1], &mut StdRng::seed_from_u64(5)).unwrap()
    }

    #[test]
    fn rejects_bad_hyperparameters() {
        let mut trainer = Trainer::new(StdRng::seed_from_u64(0));
        let mut net = net();
        let mut data = samples(4);

        for (epochs, batch, eta) in [
            (0, 2, 1.0),
            (1, 0, 1.0),
            (1, 2, 0.0),
            (1, 2, -0.5),
            (1, 2, f32::NAN),
            (1, 2, f32::INFINITY),
        ] {
            assert!(matches!(
                trainer.sgd(&mut net, &mut data, epochs, batch, eta, None),
                Err(NetError::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn one_epoch_changes_parameters() {
        let mut trainer = Trainer::new(StdRng::seed_from_u64(1));
        let mut net = net();
        let mut data = samples(4);

        let before = net.to_saved();
        trainer.sgd(&mut net, &mut data, 1, 2, 3.0, None).unwrap();
        assert_ne!(net.to_saved(), before);
    }

    #[test]
    fn partitions_seven_samples_into_3_3_1() {
        let data = samples(7);
        let batches: Vec<_> = mini_batches(&data, 3).collect();
        assert_eq!(
            batches.iter().map(|b| b.len()).collect::<Vec<_>>(),
            vec![3, 3, 1]
        );

        // every sample appears exactly once
        let mut seen: Vec<f32> = batches
            .iter()
            .flat_map(|b| b.iter().map(|s| s.input[0]))
            .collect();
        seen.sort_by(f32::total_cmp);
        let mut expected: Vec<f32> = data.iter().map(|s| s.input[0]).collect();
        expected.sort_by(f32::total_cmp);
        assert_eq!(seen, expected);
    }

    #[test]
    fn shuffle_is_a_seeded_permutation() {
        let order = |data: &[Sample]| data.iter().map(|s| s.input[0]).collect::<Vec<_>>();

        let mut a = samples(16);
        let mut b = samples(16);
        Trainer::new(StdRng::seed_from_u64(21)).shuffle(&mut a);
        Trainer::new(StdRng::seed_from_u64(21)).shuffle(&mut b);
        assert_eq!(order(&a), order(&b));

        // same multiset of samples, whatever the order
        let mut shuffled = order(&a);
        shuffled.sort_by(f32::total_cmp);
        let mut original = order(&samples(16));
        original.sort_by(f32::total_cmp);
        assert_eq!(shuffled, original);
    }

    #[test]
    fn raised_abort_flag_stops_before_any_update() {
        let flag = AbortFlag::new();
        flag.abort();

        let mut trainer = Trainer::new(StdRng::seed_from_u64(2)).with_abort(flag);
        let mut net = net();
        let mut data = samples(4);

        let before = net.to_saved();
        trainer.sgd(&mut net, &mut data, 5, 2, 3.0, None).unwrap();
        assert_eq!(net.to_saved(), before);
    }

    struct CountingStore {
        saves: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl ParamStore for CountingStore {
        fn save(&mut self, _params: &SavedParams) -> std::result::Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn load(&self) -> std::result::Result<Option<SavedParams>, StoreError> {
            Ok(None)
        }
    }

    struct FailingStore;

    impl ParamStore for FailingStore {
        fn save(&mut self, _params: &SavedParams) -> std::result::Result<(), StoreError> {
            Err(StoreError::Io(io::Error::other("disk on fire")))
        }

        fn load(&self) -> std::result::Result<Option<SavedParams>, StoreError> {
            Ok(None)
        }
    }

    #[test]
    fn persists_once_per_epoch() {
        let saves = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut trainer = Trainer::new(StdRng::seed_from_u64(3))
            .with_store(Box::new(CountingStore { saves: Arc::clone(&saves) }));
        let mut net = net();
        let mut data = samples(6);

        trainer.sgd(&mut net, &mut data, 3, 2, 1.0, None).unwrap();
        assert_eq!(saves.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn store_failure_does_not_fail_training() {
        let mut trainer = Trainer::new(StdRng::seed_from_u64(4)).with_store(Box::new(FailingStore));
        let mut net = net();
        let mut data = samples(4);

        let before = net.to_saved();
        trainer.sgd(&mut net, &mut data, 2, 2, 1.0, None).unwrap();
        assert_ne!(net.to_saved(), before);
    }

    #[test]
    fn malformed_sample_aborts_without_mutating_the_model() {
        let mut trainer = Trainer::new(StdRng::seed_from_u64(6));
        let mut net = net();

        let mut data = samples(3);
        data.push(Sample::new(
            Array1::from_vec(vec![0.5, 0.5]),
            Array1::from_vec(vec![1., 0.]), // output layer has one neuron
        ));

        let before = net.to_saved();
        // batch spans the whole dataset, so the bad sample is hit before
        // any install
        let batch = data.len();
        let err = trainer
            .sgd(&mut net, &mut data, 1, batch, 1.0, None)
            .unwrap_err();
        assert!(matches!(err, NetError::DimensionMismatch { what: "target", .. }));
        assert_eq!(net.to_saved(), before);
    }
}
