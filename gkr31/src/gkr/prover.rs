use std::iter::{successors, zip};
use std::ops::{Deref, Index, Mul};

use gkr31_field::extension::ExtensionOf;
use gkr31_field::types::Field;
use log::debug;

use super::{GkrArtifact, GkrBatchProof, GkrMask};
use crate::channel::Channel;
use crate::poly::{eq, horner_eval, Fraction, Mle, Reciprocal, UnivariatePoly};
use crate::sumcheck::{self, MultivariatePolyOracle};
use crate::{BaseField, SecureField};

/// A layer of a binary tree circuit, stored as the columns it is made of.
///
/// An `n`-variable layer feeds the `n - 1`-variable layer above it: output
/// row `i` is the gate applied to input rows `2i` and `2i + 1` (the layer's
/// last variable walks adjacent entries). A layer with zero variables is an
/// output layer.
#[derive(Clone, Debug)]
pub enum Layer {
    GrandProduct(Mle<SecureField>),
    LogUpGeneric {
        numerators: Mle<SecureField>,
        denominators: Mle<SecureField>,
    },
    LogUpMultiplicities {
        numerators: Mle<BaseField>,
        denominators: Mle<SecureField>,
    },
    /// All numerators implicitly equal one.
    LogUpSingles {
        denominators: Mle<SecureField>,
    },
}

impl Layer {
    /// Returns the number of variables the layer's columns interpolate.
    pub fn n_variables(&self) -> usize {
        match self {
            Self::GrandProduct(mle)
            | Self::LogUpGeneric {
                denominators: mle, ..
            }
            | Self::LogUpMultiplicities {
                denominators: mle, ..
            }
            | Self::LogUpSingles { denominators: mle } => mle.n_variables(),
        }
    }

    fn is_output_layer(&self) -> bool {
        self.n_variables() == 0
    }

    /// Produces the next layer from the current one, or `None` for an output
    /// layer.
    fn next_layer(&self) -> Option<Layer> {
        if self.is_output_layer() {
            return None;
        }

        Some(match self {
            Self::GrandProduct(layer) => Self::next_grand_product_layer(layer),
            Self::LogUpGeneric {
                numerators,
                denominators,
            } => Self::next_logup_layer(MleExpr::Mle(numerators), denominators),
            Self::LogUpMultiplicities {
                numerators,
                denominators,
            } => Self::next_logup_layer(MleExpr::Mle(numerators), denominators),
            Self::LogUpSingles { denominators } => {
                Self::next_logup_layer(MleExpr::Constant(BaseField::ONE), denominators)
            }
        })
    }

    fn next_grand_product_layer(layer: &Mle<SecureField>) -> Layer {
        let next_layer = layer
            .chunks_exact(2)
            .map(|chunk| chunk[0] * chunk[1])
            .collect();
        Layer::GrandProduct(Mle::new(next_layer))
    }

    fn next_logup_layer<F>(numerators: MleExpr<'_, F>, denominators: &Mle<SecureField>) -> Layer
    where
        F: Field + Mul<SecureField, Output = SecureField>,
        SecureField: ExtensionOf<F>,
    {
        let half_n = 1 << (denominators.n_variables() - 1);
        let mut next_numerators = Vec::with_capacity(half_n);
        let mut next_denominators = Vec::with_capacity(half_n);

        for i in 0..half_n {
            let a = Fraction::new(numerators[i * 2], denominators[i * 2]);
            let b = Fraction::new(numerators[i * 2 + 1], denominators[i * 2 + 1]);
            let res = a + b;
            next_numerators.push(res.numerator);
            next_denominators.push(res.denominator);
        }

        Layer::LogUpGeneric {
            numerators: Mle::new(next_numerators),
            denominators: Mle::new(next_denominators),
        }
    }

    /// Returns each column's single value, for an output layer.
    ///
    /// Grand-Product outputs `[value]`; LogUp variants output
    /// `[numerator, denominator]`.
    pub fn try_into_output_layer_values(self) -> Result<Vec<SecureField>, NotOutputLayerError> {
        if !self.is_output_layer() {
            return Err(NotOutputLayerError);
        }

        Ok(match self {
            Self::GrandProduct(col) => vec![col[0]],
            Self::LogUpGeneric {
                numerators,
                denominators,
            } => vec![numerators[0], denominators[0]],
            Self::LogUpMultiplicities {
                numerators,
                denominators,
            } => vec![numerators[0].into(), denominators[0]],
            Self::LogUpSingles { denominators } => vec![SecureField::ONE, denominators[0]],
        })
    }

    /// Folds all columns on the first variable.
    ///
    /// Multiplicity numerators embed into the challenge field, so the
    /// successor of [`Layer::LogUpMultiplicities`] is [`Layer::LogUpGeneric`].
    fn fix_first_variable(self, x0: SecureField) -> Self {
        match self {
            Self::GrandProduct(mle) => Self::GrandProduct(mle.fix_first_variable(x0)),
            Self::LogUpGeneric {
                numerators,
                denominators,
            } => Self::LogUpGeneric {
                numerators: numerators.fix_first_variable(x0),
                denominators: denominators.fix_first_variable(x0),
            },
            Self::LogUpMultiplicities {
                numerators,
                denominators,
            } => Self::LogUpGeneric {
                numerators: numerators.fix_first_variable(x0),
                denominators: denominators.fix_first_variable(x0),
            },
            Self::LogUpSingles { denominators } => Self::LogUpSingles {
                denominators: denominators.fix_first_variable(x0),
            },
        }
    }

    /// Represents the next layer's claim at `y` as a sum-check oracle over
    /// this layer.
    pub fn into_multivariate_poly(
        self,
        lambda: SecureField,
        eq_evals: &EqEvals,
    ) -> GkrMultivariatePolyOracle<'_> {
        GkrMultivariatePolyOracle {
            eq_evals,
            eq_fixed_var_correction: SecureField::ONE,
            input_layer: self,
            lambda,
        }
    }
}

/// Error returned when an operation requires an output layer but the layer
/// still has variables.
#[derive(Clone, Copy, Debug)]
pub struct NotOutputLayerError;

/// A LogUp numerator column, possibly the constant-one implicit one.
enum MleExpr<'a, F: Field> {
    Constant(F),
    Mle(&'a Mle<F>),
}

impl<F: Field> Index<usize> for MleExpr<'_, F> {
    type Output = F;

    fn index(&self, index: usize) -> &F {
        match self {
            Self::Constant(v) => v,
            Self::Mle(mle) => &mle[index],
        }
    }
}

/// Evaluations of `eq((0, x), y)` over all `x` on the hypercube, for a fixed
/// `y`.
///
/// Half the table suffices: fixing the first variable to zero covers the
/// entries a sum-check round reads, and
/// [`correct_sum_as_poly_in_first_variable`] reconstructs the rest.
#[derive(Clone, Debug)]
pub struct EqEvals {
    y: Vec<SecureField>,
    evals: Mle<SecureField>,
}

impl EqEvals {
    pub fn generate(y: &[SecureField]) -> Self {
        let y = y.to_vec();

        let Some((&y_0, y_rest)) = y.split_first() else {
            let evals = Mle::new(vec![SecureField::ONE]);
            return Self { y, evals };
        };

        let mut evals = Vec::with_capacity(1 << (y.len() - 1));
        evals.push(SecureField::ONE - y_0);

        // Each new variable is one bit less significant than the previous:
        // entry `i` splits into `2i` (variable = 0) and `2i + 1` (= 1).
        for &y_j in y_rest {
            let mut next_evals = Vec::with_capacity(evals.len() * 2);
            for &eval in evals.iter() {
                let tmp = eval * y_j;
                next_evals.push(eval - tmp);
                next_evals.push(tmp);
            }
            evals = next_evals;
        }

        let evals = Mle::new(evals);
        Self { y, evals }
    }

    /// Returns the fixed vector `y` the table was generated from.
    pub fn y(&self) -> &[SecureField] {
        &self.y
    }
}

impl Deref for EqEvals {
    type Target = [SecureField];

    fn deref(&self) -> &[SecureField] {
        &self.evals
    }
}

/// Multivariate polynomial oracle induced by a GKR layer:
/// `eq(x, y) * gate(inp(x, 0), inp(x, 1))`, with LogUp's numerator and
/// denominator components combined by `lambda`.
///
/// The borrowed `eq` table has the first variable fixed to zero;
/// `eq_fixed_var_correction` accumulates the `eq` factors of the variables
/// fixed so far.
#[derive(Debug)]
pub struct GkrMultivariatePolyOracle<'a> {
    pub eq_evals: &'a EqEvals,
    pub input_layer: Layer,
    pub eq_fixed_var_correction: SecureField,
    pub lambda: SecureField,
}

impl MultivariatePolyOracle for GkrMultivariatePolyOracle<'_> {
    fn n_variables(&self) -> usize {
        self.input_layer.n_variables() - 1
    }

    fn sum_as_poly_in_first_variable(&self, claim: SecureField) -> UnivariatePoly<SecureField> {
        let k = self.n_variables();
        assert_ne!(k, 0);
        let n_terms = 1 << (k - 1);
        let y = self.eq_evals.y();
        let lambda = self.lambda;

        // Obtain the evaluations at `t` 0 and 2 directly; 1 comes from the
        // claim and the interpolation gets a fourth point for free below.
        let (mut eval_at_0, mut eval_at_2) = match &self.input_layer {
            Layer::GrandProduct(col) => eval_grand_product_sum(self.eq_evals, col, n_terms),
            Layer::LogUpGeneric {
                numerators,
                denominators,
            } => eval_logup_sum(self.eq_evals, numerators, denominators, n_terms, lambda),
            Layer::LogUpMultiplicities {
                numerators,
                denominators,
            } => eval_logup_sum(self.eq_evals, numerators, denominators, n_terms, lambda),
            Layer::LogUpSingles { denominators } => {
                eval_logup_singles_sum(self.eq_evals, denominators, n_terms, lambda)
            }
        };

        eval_at_0 *= self.eq_fixed_var_correction;
        eval_at_2 *= self.eq_fixed_var_correction;

        correct_sum_as_poly_in_first_variable(eval_at_0, eval_at_2, claim, y, k)
    }

    fn fix_first_variable(self, challenge: SecureField) -> Self {
        if self.n_variables() == 0 {
            return self;
        }

        let y = self.eq_evals.y();
        let fixed_coordinate = y[y.len() - self.n_variables()];
        let eq_fixed_var_correction =
            self.eq_fixed_var_correction * eq(&[challenge], &[fixed_coordinate]);

        Self {
            eq_evals: self.eq_evals,
            eq_fixed_var_correction,
            input_layer: self.input_layer.fix_first_variable(challenge),
            lambda: self.lambda,
        }
    }
}

impl GkrMultivariatePolyOracle<'_> {
    /// Extracts the mask once every sum-check variable has been fixed, i.e.
    /// once the underlying layer is down to a single variable.
    pub fn try_into_mask(self) -> Result<GkrMask, NotConstantPolyError> {
        if self.n_variables() != 0 {
            return Err(NotConstantPolyError);
        }

        let columns = match self.input_layer {
            Layer::GrandProduct(mle) => vec![[mle[0], mle[1]]],
            Layer::LogUpGeneric {
                numerators,
                denominators,
            } => vec![
                [numerators[0], numerators[1]],
                [denominators[0], denominators[1]],
            ],
            Layer::LogUpMultiplicities {
                numerators,
                denominators,
            } => vec![
                [numerators[0].into(), numerators[1].into()],
                [denominators[0], denominators[1]],
            ],
            Layer::LogUpSingles { denominators } => vec![
                [SecureField::ONE; 2],
                [denominators[0], denominators[1]],
            ],
        };

        Ok(GkrMask::new(columns))
    }
}

/// Error returned when a polynomial is expected to be constant but isn't.
#[derive(Clone, Copy, Debug)]
pub struct NotConstantPolyError;

/// Evaluates `sum_x eq((0, x), y) * inp(t, x, 0) * inp(t, x, 1)` at `t` 0
/// and 2.
fn eval_grand_product_sum(
    eq_evals: &EqEvals,
    input_layer: &Mle<SecureField>,
    n_terms: usize,
) -> (SecureField, SecureField) {
    let mut eval_at_0 = SecureField::ZERO;
    let mut eval_at_2 = SecureField::ZERO;

    for i in 0..n_terms {
        // Input values at `(0, bits(i), {0, 1})` and `(1, bits(i), {0, 1})`.
        let (inp_at_r0i0, inp_at_r0i1) = (input_layer[i * 2], input_layer[i * 2 + 1]);
        let (inp_at_r1i0, inp_at_r1i1) = (
            input_layer[(n_terms + i) * 2],
            input_layer[(n_terms + i) * 2 + 1],
        );

        // The values at `t = 2` extrapolate linearly.
        let inp_at_r2i0 = inp_at_r1i0.double() - inp_at_r0i0;
        let inp_at_r2i1 = inp_at_r1i1.double() - inp_at_r0i1;

        let eq_eval = eq_evals[i];
        eval_at_0 += eq_eval * inp_at_r0i0 * inp_at_r0i1;
        eval_at_2 += eq_eval * inp_at_r2i0 * inp_at_r2i1;
    }

    (eval_at_0, eval_at_2)
}

/// Evaluates
/// `sum_x eq((0, x), y) * (numer(t, x) + lambda * denom(t, x))` at `t` 0
/// and 2, where `numer` and `denom` are the columns of the next LogUp layer.
fn eval_logup_sum<F>(
    eq_evals: &EqEvals,
    numerators: &Mle<F>,
    denominators: &Mle<SecureField>,
    n_terms: usize,
    lambda: SecureField,
) -> (SecureField, SecureField)
where
    F: Field + Mul<SecureField, Output = SecureField>,
    SecureField: ExtensionOf<F>,
{
    let mut eval_at_0 = SecureField::ZERO;
    let mut eval_at_2 = SecureField::ZERO;

    for i in 0..n_terms {
        let (numer_at_r0i0, numer_at_r0i1) = (numerators[i * 2], numerators[i * 2 + 1]);
        let (denom_at_r0i0, denom_at_r0i1) = (denominators[i * 2], denominators[i * 2 + 1]);
        let (numer_at_r1i0, numer_at_r1i1) = (
            numerators[(n_terms + i) * 2],
            numerators[(n_terms + i) * 2 + 1],
        );
        let (denom_at_r1i0, denom_at_r1i1) = (
            denominators[(n_terms + i) * 2],
            denominators[(n_terms + i) * 2 + 1],
        );

        let numer_at_r2i0 = numer_at_r1i0.double() - numer_at_r0i0;
        let numer_at_r2i1 = numer_at_r1i1.double() - numer_at_r0i1;
        let denom_at_r2i0 = denom_at_r1i0.double() - denom_at_r0i0;
        let denom_at_r2i1 = denom_at_r1i1.double() - denom_at_r0i1;

        let fraction_at_r0i =
            Fraction::new(numer_at_r0i0, denom_at_r0i0) + Fraction::new(numer_at_r0i1, denom_at_r0i1);
        let fraction_at_r2i =
            Fraction::new(numer_at_r2i0, denom_at_r2i0) + Fraction::new(numer_at_r2i1, denom_at_r2i1);

        let eq_eval = eq_evals[i];
        eval_at_0 += eq_eval * (fraction_at_r0i.numerator + lambda * fraction_at_r0i.denominator);
        eval_at_2 += eq_eval * (fraction_at_r2i.numerator + lambda * fraction_at_r2i.denominator);
    }

    (eval_at_0, eval_at_2)
}

/// [`eval_logup_sum`] specialized for implicit numerators of one.
fn eval_logup_singles_sum(
    eq_evals: &EqEvals,
    denominators: &Mle<SecureField>,
    n_terms: usize,
    lambda: SecureField,
) -> (SecureField, SecureField) {
    let mut eval_at_0 = SecureField::ZERO;
    let mut eval_at_2 = SecureField::ZERO;

    for i in 0..n_terms {
        let (denom_at_r0i0, denom_at_r0i1) = (denominators[i * 2], denominators[i * 2 + 1]);
        let (denom_at_r1i0, denom_at_r1i1) = (
            denominators[(n_terms + i) * 2],
            denominators[(n_terms + i) * 2 + 1],
        );

        let denom_at_r2i0 = denom_at_r1i0.double() - denom_at_r0i0;
        let denom_at_r2i1 = denom_at_r1i1.double() - denom_at_r0i1;

        let fraction_at_r0i = Reciprocal::new(denom_at_r0i0) + Reciprocal::new(denom_at_r0i1);
        let fraction_at_r2i = Reciprocal::new(denom_at_r2i0) + Reciprocal::new(denom_at_r2i1);

        let eq_eval = eq_evals[i];
        eval_at_0 += eq_eval * (fraction_at_r0i.numerator + lambda * fraction_at_r0i.denominator);
        eval_at_2 += eq_eval * (fraction_at_r2i.numerator + lambda * fraction_at_r2i.denominator);
    }

    (eval_at_0, eval_at_2)
}

/// Corrects and interpolates GKR round polynomials that are generated with
/// the first variable of the `eq` table fixed to zero.
///
/// The oracle computes `f(t) = sum_x eq((0^(n-k), t, x), y) * p(t, x)` (the
/// zero prefix coming from reading only the table's low entries); the round
/// polynomial the protocol needs is
/// `r(t) = eq(c, y[..n-k]) * eq(t, y[n-k]) * sum_x eq(x, y[n-k+1..]) * p(t, x)`
/// with `c` the challenges fixed so far. The two differ by the factor
/// `eq(t, y[n - k]) * a` where `a = eq(0^(n-k+1), y[..n-k+1])^-1`, giving:
///
/// * `r(0)`, `r(2)` from `f(0)`, `f(2)`;
/// * `r(1) = claim - r(0)`;
/// * `r(b) = 0` for `b = (1 - y[n-k]) / (1 - 2 y[n-k])`, the root of
///   `eq(t, y[n - k])`.
///
/// Four points interpolate the degree `<= 3` round polynomial exactly.
/// Panics if `k` is zero (a constant oracle has no round polynomial).
pub fn correct_sum_as_poly_in_first_variable(
    f_at_0: SecureField,
    f_at_2: SecureField,
    claim: SecureField,
    y: &[SecureField],
    k: usize,
) -> UnivariatePoly<SecureField> {
    assert_ne!(k, 0);
    let n = y.len();
    assert!(k <= n);

    let a = eq(&vec![SecureField::ZERO; n - k + 1], &y[..n - k + 1]).inverse();
    let b = (SecureField::ONE - y[n - k]) / (SecureField::ONE - y[n - k].double());

    let r_at_0 = f_at_0 * eq(&[SecureField::ZERO], &[y[n - k]]) * a;
    let r_at_1 = claim - r_at_0;
    let r_at_2 = f_at_2 * eq(&[SecureField::TWO], &[y[n - k]]) * a;
    let r_at_b = SecureField::ZERO;

    UnivariatePoly::interpolate_lagrange(
        &[SecureField::ZERO, SecureField::ONE, SecureField::TWO, b],
        &[r_at_0, r_at_1, r_at_2, r_at_b],
    )
    .expect("challenge coordinates are distinct from 0, 1, 2")
}

/// Evaluates the circuit bottom-up, returning all layers from input to
/// output.
fn gen_layers(input_layer: Layer) -> Vec<Layer> {
    let n_variables = input_layer.n_variables();
    let layers: Vec<Layer> = successors(Some(input_layer), Layer::next_layer).collect();
    assert_eq!(layers.len(), n_variables + 1);
    layers
}

/// Batch proves lookup circuits with GKR.
///
/// Instances may differ in size; a smaller instance joins the protocol at
/// the layer whose size matches its output, and participates in the batched
/// sum-check as a short oracle from then on.
///
/// Output relations by instance kind:
/// * `GrandProduct`: `claim = prod_i inp(i)`
/// * `LogUp*`: `claim = [sum_i numer(i) / denom(i)]` as one projective
///   fraction.
pub fn prove_batch(
    channel: &mut impl Channel,
    input_layer_by_instance: Vec<Layer>,
) -> (GkrBatchProof, GkrArtifact) {
    let n_instances = input_layer_by_instance.len();
    let n_layers_by_instance: Vec<usize> = input_layer_by_instance
        .iter()
        .map(Layer::n_variables)
        .collect();
    let n_layers = *n_layers_by_instance.iter().max().unwrap();
    debug!("proving {n_instances} GKR instances over {n_layers} layers");

    // Evaluate all instance circuits and walk the layers output-first.
    let mut layers_by_instance: Vec<_> = input_layer_by_instance
        .into_iter()
        .map(|input_layer| gen_layers(input_layer).into_iter().rev())
        .collect();

    let mut output_claims_by_instance = vec![None; n_instances];
    let mut layer_masks_by_instance = vec![Vec::new(); n_instances];
    let mut sumcheck_proofs = Vec::new();

    let mut ood_point = Vec::new();
    let mut claims_to_verify_by_instance = vec![None; n_instances];

    for layer in 0..n_layers {
        let n_remaining_layers = n_layers - layer;

        // Check all the instances for output layers.
        for (instance, layers) in layers_by_instance.iter_mut().enumerate() {
            if n_layers_by_instance[instance] == n_remaining_layers {
                let output_layer = layers.next().unwrap();
                let output_layer_values = output_layer.try_into_output_layer_values().unwrap();
                claims_to_verify_by_instance[instance] = Some(output_layer_values.clone());
                output_claims_by_instance[instance] = Some(output_layer_values);
            }
        }

        // Seed the channel with layer claims.
        for claims_to_verify in claims_to_verify_by_instance.iter().flatten() {
            channel.mix_felts(claims_to_verify);
        }

        let eq_evals = EqEvals::generate(&ood_point);
        let sumcheck_alpha = channel.draw_felt();
        let instance_lambda = channel.draw_felt();

        let mut sumcheck_oracles = Vec::new();
        let mut sumcheck_claims = Vec::new();
        let mut sumcheck_instances = Vec::new();

        // Create the multivariate polynomial oracles used with sum-check.
        for (instance, layers) in layers_by_instance.iter_mut().enumerate() {
            if n_layers_by_instance[instance] >= n_remaining_layers {
                let layer = layers.next().unwrap();
                let claims_to_verify = claims_to_verify_by_instance[instance].as_ref().unwrap();
                sumcheck_oracles.push(layer.into_multivariate_poly(instance_lambda, &eq_evals));
                sumcheck_claims.push(horner_eval(claims_to_verify, instance_lambda));
                sumcheck_instances.push(instance);
            }
        }

        let (sumcheck_proof, sumcheck_ood_point, constant_poly_oracles, _) =
            sumcheck::prove_batch(sumcheck_claims, sumcheck_oracles, sumcheck_alpha, channel);

        sumcheck_proofs.push(sumcheck_proof);

        let masks: Vec<GkrMask> = constant_poly_oracles
            .into_iter()
            .map(|oracle| oracle.try_into_mask().unwrap())
            .collect();

        // Seed the channel with the layer masks.
        for (&instance, mask) in zip(&sumcheck_instances, &masks) {
            channel.mix_felts(&mask.flatten());
            layer_masks_by_instance[instance].push(mask.clone());
        }

        let challenge = channel.draw_felt();
        ood_point = sumcheck_ood_point;
        ood_point.push(challenge);

        // Set the claims to verify in the layer above.
        for (&instance, mask) in zip(&sumcheck_instances, &masks) {
            claims_to_verify_by_instance[instance] = Some(mask.reduce_at_point(challenge));
        }
    }

    let output_claims_by_instance = output_claims_by_instance
        .into_iter()
        .map(Option::unwrap)
        .collect();

    let claims_to_verify_by_instance = claims_to_verify_by_instance
        .into_iter()
        .map(Option::unwrap)
        .collect();

    let proof = GkrBatchProof {
        sumcheck_proofs,
        layer_masks_by_instance,
        output_claims_by_instance,
    };

    let artifact = GkrArtifact {
        ood_point,
        claims_to_verify_by_instance,
        n_variables_by_instance: n_layers_by_instance,
    };

    (proof, artifact)
}
