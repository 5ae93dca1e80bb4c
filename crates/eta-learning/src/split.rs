//! Seeded train/validation/test partitioning.
//!
//! Partition sizes follow the usual split convention: with `n` rows and a
//! test fraction `f`, the test side gets `ceil(f · n)` rows and the train
//! side the rest. Rows are assigned from a seeded permutation, test rows
//! first.

use crate::error::{LearningError, Result};
use ndarray::Array1;
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;

/// Features and targets of one partition, row-aligned.
#[derive(Debug, Clone)]
pub struct Partition {
    pub x: DataFrame,
    pub y: Array1<f64>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.x.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows of this partition at `indices`, in that order.
    fn take(&self, indices: &[usize]) -> Result<Partition> {
        let idx = IdxCa::from_vec("idx".into(), indices.iter().map(|&i| i as IdxSize).collect());
        Ok(Partition {
            x: self.x.take(&idx)?,
            y: indices.iter().map(|&i| self.y[i]).collect(),
        })
    }
}

/// The three partitions of a training table.
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub train: Partition,
    pub validation: Partition,
    pub test: Partition,
}

/// Row counts of a [`DataSplit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitSizes {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

impl DataSplit {
    /// Carve `holdout_fraction` of the rows off as the holdout, then give
    /// `1 - validation_share` of the holdout to the test partition. Both
    /// shuffles use `seed`.
    pub fn new(data: Partition, holdout_fraction: f64, validation_share: f64, seed: u64) -> Result<Self> {
        let (train, holdout) = train_test_split(&data, holdout_fraction, seed)?;
        let (validation, test) = train_test_split(&holdout, 1.0 - validation_share, seed)?;
        Ok(Self {
            train,
            validation,
            test,
        })
    }

    pub fn sizes(&self) -> SplitSizes {
        SplitSizes {
            train: self.train.len(),
            validation: self.validation.len(),
            test: self.test.len(),
        }
    }
}

/// `(n_train, n_test)` for `n` rows and a test fraction.
pub fn split_sizes(n: usize, test_size: f64) -> Result<(usize, usize)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(LearningError::InvalidConfig(format!(
            "test fraction must be in (0, 1), got {test_size}"
        )));
    }
    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_train == 0 || n_test == 0 {
        return Err(LearningError::InvalidData(format!(
            "splitting {n} rows with test fraction {test_size} leaves an empty partition"
        )));
    }
    Ok((n_train, n_test))
}

/// Split one partition in two with a seeded shuffle; returns `(train, test)`.
pub fn train_test_split(data: &Partition, test_size: f64, seed: u64) -> Result<(Partition, Partition)> {
    let (_, n_test) = split_sizes(data.len(), test_size)?;

    let mut permutation: Vec<usize> = (0..data.len()).collect();
    permutation.shuffle(&mut StdRng::seed_from_u64(seed));
    let (test_rows, train_rows) = permutation.split_at(n_test);

    Ok((data.take(train_rows)?, data.take(test_rows)?))
}
