//! Compactly supported radial basis functions used to localize the fits.

use crate::num::PFloat;

/// A smooth radial weighting function with compact support, identically
/// zero for normalized radii of one or more.
///
/// The numeric suffix indicates the smoothness order of the function at
/// the support boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadialBasisFunction {
    Wendland0,
    Wendland2,
    Wendland4,
    Wendland6,
    Wu2,
    Wu4,
}

impl RadialBasisFunction {
    /// Evaluates the function at the given radius normalized to the
    /// support interval `[0, 1]`.
    pub fn evaluate<F: PFloat>(&self, normalized_radius: F) -> F {
        let r = normalized_radius;
        if r >= F::one() {
            return F::zero();
        }
        let one_minus_r = F::one() - r;
        match self {
            Self::Wendland0 => one_minus_r.powi(2),
            Self::Wendland2 => one_minus_r.powi(4) * (constant::<F>(4.0) * r + F::one()),
            Self::Wendland4 => {
                one_minus_r.powi(6)
                    * ((constant::<F>(35.0) * r + constant::<F>(18.0)) * r + constant::<F>(3.0))
            }
            Self::Wendland6 => {
                one_minus_r.powi(8)
                    * (((constant::<F>(32.0) * r + constant::<F>(25.0)) * r + constant::<F>(8.0))
                        * r
                        + F::one())
            }
            Self::Wu2 => {
                one_minus_r.powi(4)
                    * (((constant::<F>(3.0) * r + constant::<F>(12.0)) * r + constant::<F>(16.0))
                        * r
                        + constant::<F>(4.0))
            }
            Self::Wu4 => {
                one_minus_r.powi(6)
                    * ((((constant::<F>(5.0) * r + constant::<F>(30.0)) * r
                        + constant::<F>(72.0))
                        * r
                        + constant::<F>(82.0))
                        * r
                        + constant::<F>(36.0))
            }
        }
    }
}

fn constant<F: PFloat>(value: f64) -> F {
    F::from(value).expect("Conversion failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FUNCTIONS: [RadialBasisFunction; 6] = [
        RadialBasisFunction::Wendland0,
        RadialBasisFunction::Wendland2,
        RadialBasisFunction::Wendland4,
        RadialBasisFunction::Wendland6,
        RadialBasisFunction::Wu2,
        RadialBasisFunction::Wu4,
    ];

    #[test]
    fn values_at_zero_radius_are_correct() {
        assert_eq!(RadialBasisFunction::Wendland0.evaluate(0.0), 1.0);
        assert_eq!(RadialBasisFunction::Wendland2.evaluate(0.0), 1.0);
        assert_eq!(RadialBasisFunction::Wendland4.evaluate(0.0), 3.0);
        assert_eq!(RadialBasisFunction::Wendland6.evaluate(0.0), 1.0);
        assert_eq!(RadialBasisFunction::Wu2.evaluate(0.0), 4.0);
        assert_eq!(RadialBasisFunction::Wu4.evaluate(0.0), 36.0);
    }

    #[test]
    fn support_ends_at_unit_radius() {
        for function in ALL_FUNCTIONS {
            assert_eq!(function.evaluate(1.0), 0.0);
            assert_eq!(function.evaluate(1.5), 0.0);
        }
    }

    #[test]
    fn values_are_positive_and_decreasing_within_support() {
        for function in ALL_FUNCTIONS {
            let mut previous = function.evaluate(0.0_f64);
            for step in 1..100 {
                let value = function.evaluate(step as f64 / 100.0);
                assert!(value > 0.0);
                assert!(value < previous);
                previous = value;
            }
        }
    }
}
