// Epoch and lifetime validation

use crate::tree::MAX_LIFETIME;
use crate::xmss::error::HashSigError;

/// Epoch validator for range checking and validation
pub struct EpochValidator;

impl EpochValidator {
    /// Validate key parameters at key generation
    ///
    /// Preconditions:
    /// - none; any input is accepted and checked
    ///
    /// Postconditions:
    /// - Returns Ok if 0 < lifetime <= MAX_LIFETIME and the last epoch fits in u64
    /// - Returns Err(InvalidParameter) otherwise
    pub fn validate_key_range(activation_epoch: u64, lifetime: u64) -> Result<(), HashSigError> {
        if lifetime == 0 {
            return Err(HashSigError::InvalidParameter {
                reason: "lifetime must be positive".to_string(),
            });
        }

        if lifetime > MAX_LIFETIME {
            return Err(HashSigError::InvalidParameter {
                reason: format!("lifetime {lifetime} exceeds maximum {MAX_LIFETIME}"),
            });
        }

        if activation_epoch.checked_add(lifetime).is_none() {
            return Err(HashSigError::InvalidParameter {
                reason: format!(
                    "activation epoch {activation_epoch} + lifetime {lifetime} overflows"
                ),
            });
        }

        Ok(())
    }

    /// Validate epoch for signing or verification
    ///
    /// Preconditions:
    /// - activation_epoch and lifetime passed validate_key_range
    ///
    /// Postconditions:
    /// - Returns Ok if activation_epoch <= epoch < activation_epoch + lifetime
    /// - Returns Err(EpochOutOfRange) otherwise
    pub fn validate_epoch(
        epoch: u64,
        activation_epoch: u64,
        lifetime: u64,
    ) -> Result<(), HashSigError> {
        let end_epoch = activation_epoch.saturating_add(lifetime);

        if epoch < activation_epoch || epoch >= end_epoch {
            return Err(HashSigError::EpochOutOfRange {
                epoch,
                activation_epoch,
                end_epoch,
                lifetime,
            });
        }

        Ok(())
    }
}
