use gkr31_field::types::Field;

use super::{Gate, GkrArtifact, GkrBatchProof, GkrError};
use crate::channel::Channel;
use crate::poly::{eq, horner_eval};
use crate::sumcheck;
use crate::{BaseField, SecureField};

/// Partially verifies a batch GKR proof.
///
/// On success returns a [`GkrArtifact`] which stores the out-of-domain point
/// and claimed evaluations in the input layer columns for each instance at
/// the OOD point. These claims are not checked here: hence partial
/// verification.
pub fn partially_verify_batch(
    gate_by_instance: Vec<Gate>,
    proof: &GkrBatchProof,
    channel: &mut impl Channel,
) -> Result<GkrArtifact, GkrError> {
    let GkrBatchProof {
        sumcheck_proofs,
        layer_masks_by_instance,
        output_claims_by_instance,
    } = proof;

    if layer_masks_by_instance.len() != output_claims_by_instance.len() {
        return Err(GkrError::MalformedProof);
    }

    let n_instances = layer_masks_by_instance.len();
    let instance_n_layers = |instance: usize| layer_masks_by_instance[instance].len();
    let n_layers = (0..n_instances)
        .map(instance_n_layers)
        .max()
        .ok_or(GkrError::MalformedProof)?;

    if n_layers != sumcheck_proofs.len() {
        return Err(GkrError::MalformedProof);
    }

    // Every instance must participate in at least one layer.
    if (0..n_instances).any(|instance| instance_n_layers(instance) == 0) {
        return Err(GkrError::MalformedProof);
    }

    if gate_by_instance.len() != n_instances {
        return Err(GkrError::NumInstancesMismatch {
            given: gate_by_instance.len(),
            expected: n_instances,
        });
    }

    let mut ood_point = vec![];
    let mut claims_to_verify_by_instance = vec![None; n_instances];

    for (layer, sumcheck_proof) in sumcheck_proofs.iter().enumerate() {
        let n_remaining_layers = n_layers - layer;

        // Check for output layers.
        for instance in 0..n_instances {
            if instance_n_layers(instance) == n_remaining_layers {
                let output_claims = output_claims_by_instance[instance].clone();
                claims_to_verify_by_instance[instance] = Some(output_claims);
            }
        }

        // Seed the channel with layer claims.
        for claims_to_verify in claims_to_verify_by_instance.iter().flatten() {
            channel.mix_felts(claims_to_verify);
        }

        let sumcheck_alpha = channel.draw_felt();
        let instance_lambda = channel.draw_felt();

        let mut sumcheck_claims = Vec::new();
        let mut sumcheck_instances = Vec::new();

        // Prepare the sum-check claim.
        for (instance, claims_to_verify) in claims_to_verify_by_instance.iter().enumerate() {
            if let Some(claims_to_verify) = claims_to_verify {
                let n_unused_variables = n_layers - instance_n_layers(instance);
                let doubling_factor = BaseField::TWO.exp_u64(n_unused_variables as u64);
                let claim = horner_eval(claims_to_verify, instance_lambda) * doubling_factor;
                sumcheck_claims.push(claim);
                sumcheck_instances.push(instance);
            }
        }

        let sumcheck_claim = horner_eval(&sumcheck_claims, sumcheck_alpha);
        let (sumcheck_ood_point, sumcheck_eval) =
            sumcheck::partially_verify(sumcheck_claim, sumcheck_proof, channel)
                .map_err(|source| GkrError::InvalidSumcheck { layer, source })?;

        // A proof for this layer must have one round per variable.
        if sumcheck_ood_point.len() != layer {
            return Err(GkrError::MalformedProof);
        }

        let mut layer_evals = Vec::new();

        // Evaluate the circuit locally at the sum-check OOD point.
        for &instance in &sumcheck_instances {
            let n_unused = n_layers - instance_n_layers(instance);
            let mask = &layer_masks_by_instance[instance][layer - n_unused];
            let gate = gate_by_instance[instance];
            let gate_output = gate.eval(mask).map_err(|_| GkrError::InvalidMask {
                instance,
                instance_layer: layer - n_unused,
            })?;
            // Instances that joined late only use the trailing coordinates.
            let eq_eval = eq(&sumcheck_ood_point[n_unused..], &ood_point[n_unused..]);
            layer_evals.push(eq_eval * horner_eval(&gate_output, instance_lambda));
        }

        let layer_eval = horner_eval(&layer_evals, sumcheck_alpha);

        if sumcheck_eval != layer_eval {
            return Err(GkrError::CircuitCheckFailure {
                layer,
                claim: sumcheck_eval,
                computed: layer_eval,
            });
        }

        // Seed the channel with the layer masks.
        for &instance in &sumcheck_instances {
            let n_unused = n_layers - instance_n_layers(instance);
            let mask = &layer_masks_by_instance[instance][layer - n_unused];
            channel.mix_felts(&mask.flatten());
        }

        // Set the OOD evaluation point for the layer above.
        let challenge = channel.draw_felt();
        ood_point = sumcheck_ood_point;
        ood_point.push(challenge);

        // Set the claims to verify in the layer above.
        for &instance in &sumcheck_instances {
            let n_unused = n_layers - instance_n_layers(instance);
            let mask = &layer_masks_by_instance[instance][layer - n_unused];
            claims_to_verify_by_instance[instance] = Some(mask.reduce_at_point(challenge));
        }
    }

    let claims_to_verify_by_instance = claims_to_verify_by_instance
        .into_iter()
        .map(Option::unwrap)
        .collect();

    Ok(GkrArtifact {
        ood_point,
        claims_to_verify_by_instance,
        n_variables_by_instance: (0..n_instances).map(instance_n_layers).collect(),
    })
}
