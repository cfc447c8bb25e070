//! Utilities related to numbers.

use ieee754;
use num;
use std::{cmp, fmt};

/// Floating point marker trait for easier control over trait bounds.
pub trait PFloat:
    Sync + Send + num::Float + num::cast::FromPrimitive + ieee754::Ieee754 + fmt::Debug
{
}

impl PFloat for f32 {}
impl PFloat for f64 {}

/// Key-value pair that can be ordered based on the float value.
pub struct KeyValueOrderableByValue<K, F: PFloat>(pub K, pub F);

impl<K, F: PFloat> PartialEq for KeyValueOrderableByValue<K, F> {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
    }
}

impl<K, F: PFloat> PartialOrd for KeyValueOrderableByValue<K, F> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.1.partial_cmp(&other.1)
    }
}

impl<K, F: PFloat> Eq for KeyValueOrderableByValue<K, F> {}

impl<K, F: PFloat> Ord for KeyValueOrderableByValue<K, F> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.partial_cmp(other)
            .expect("NaN in floating point comparison.")
    }
}
