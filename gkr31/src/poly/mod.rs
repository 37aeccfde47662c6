pub mod fraction;
pub mod multilinear;
pub mod univariate;

pub use fraction::{Fraction, Reciprocal};
pub use multilinear::{eq, fold_mle_evals, Mle};
pub use univariate::{horner_eval, random_linear_combination, PolynomialError, UnivariatePoly};
