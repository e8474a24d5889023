// Advance a secret key until an epoch is signable

use tracing::debug;

use crate::xmss::keys::StatefulSecretKey;

/// Advance `sk` until `epoch` is prepared or `max_steps` advances were spent.
///
/// Returns whether `epoch` is prepared afterwards. Stops early when the
/// window can no longer move or has already moved past `epoch`.
pub fn prepare_for_epoch<K: StatefulSecretKey + ?Sized>(
    sk: &mut K,
    epoch: u64,
    max_steps: Option<usize>,
) -> bool {
    let mut steps = 0usize;
    while !sk.is_prepared_for_epoch(epoch) {
        if epoch < sk.prepared_start() || !sk.activation_interval().contains(&epoch) {
            return false;
        }
        if max_steps.is_some_and(|max| steps >= max) {
            debug!(epoch, steps, "step budget exhausted before epoch was prepared");
            return false;
        }

        let before = sk.prepared_interval();
        sk.advance_preparation();
        steps += 1;
        if sk.prepared_interval() == before {
            return false;
        }
    }
    true
}
