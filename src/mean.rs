//! Prior mean functions.
//!
//! The mean is subtracted from the targets before whitening and added back
//! to predictions. Its parameters are unconstrained, so they are encoded
//! as-is.

use crate::error::{Error, Result};

/// A prior mean `m(x)` over feature vectors.
pub trait MeanFunction: Send + Sync + core::fmt::Debug {
    /// Prior mean at `x`.
    fn mean(&self, x: &[f64]) -> f64;

    /// Number of encoded hyperparameters.
    fn num_hyperparameters(&self) -> usize;

    /// Current hyperparameters in encoded form.
    fn hyperparameters(&self) -> Vec<f64>;

    /// Replace the hyperparameters from their encoded form.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `encoded` has the wrong length,
    /// or `Error::InvalidHyperparameter` if a value is not finite.
    fn set_hyperparameters(&mut self, encoded: &[f64]) -> Result<()>;
}

/// The zero mean. Has no hyperparameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZeroMean;

impl MeanFunction for ZeroMean {
    fn mean(&self, _x: &[f64]) -> f64 {
        0.0
    }

    fn num_hyperparameters(&self) -> usize {
        0
    }

    fn hyperparameters(&self) -> Vec<f64> {
        Vec::new()
    }

    fn set_hyperparameters(&mut self, encoded: &[f64]) -> Result<()> {
        if encoded.is_empty() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                what: "mean hyperparameters",
                expected: 0,
                got: encoded.len(),
            })
        }
    }
}

/// A constant (learnable) offset.
///
/// # Examples
///
/// ```
/// use gp_posterior::mean::{ConstantMean, MeanFunction};
///
/// let m = ConstantMean::new(0.5).unwrap();
/// assert_eq!(m.mean(&[1.0, 2.0]), 0.5);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "ConstantMeanParams")
)]
pub struct ConstantMean {
    value: f64,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct ConstantMeanParams {
    value: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<ConstantMeanParams> for ConstantMean {
    type Error = Error;

    fn try_from(raw: ConstantMeanParams) -> Result<Self> {
        Self::new(raw.value)
    }
}

impl ConstantMean {
    /// Creates a constant mean.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHyperparameter` if `value` is not finite.
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() {
            Ok(Self { value })
        } else {
            Err(Error::InvalidHyperparameter {
                name: "mean",
                value,
            })
        }
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl MeanFunction for ConstantMean {
    fn mean(&self, _x: &[f64]) -> f64 {
        self.value
    }

    fn num_hyperparameters(&self) -> usize {
        1
    }

    fn hyperparameters(&self) -> Vec<f64> {
        vec![self.value]
    }

    fn set_hyperparameters(&mut self, encoded: &[f64]) -> Result<()> {
        let [value] = encoded else {
            return Err(Error::DimensionMismatch {
                what: "mean hyperparameters",
                expected: 1,
                got: encoded.len(),
            });
        };
        *self = Self::new(*value)?;
        Ok(())
    }
}
