// Shared secret key handle for background preparation

use std::ops::Range;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::xmss::error::{HashSigError, Result};
use crate::xmss::keys::StatefulSecretKey;
use crate::xmss::message::MessagePreprocessor;
use crate::xmss::scheme::SignatureScheme;

/// Secret key behind an async mutex.
///
/// A preparation task and the signing path can hold clones of the same handle.
/// Every advance and every signature runs under the lock on the blocking pool,
/// so the prepared bounds are never observed half-updated.
pub struct SharedSecretKey<S: SignatureScheme> {
    inner: Arc<Mutex<S::SecretKey>>,
}

impl<S: SignatureScheme> Clone for SharedSecretKey<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SignatureScheme> SharedSecretKey<S> {
    pub fn new(sk: S::SecretKey) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sk)),
        }
    }

    /// Advance one step per lock acquisition until `epoch` is prepared.
    ///
    /// Signing may interleave between steps. Returns `Ok(false)` when the step
    /// budget runs out or the window can no longer reach `epoch`.
    pub async fn prepare_until(&self, epoch: u64, max_steps: Option<usize>) -> Result<bool> {
        let mut steps = 0usize;
        loop {
            if max_steps.is_some_and(|max| steps >= max) {
                return Ok(self.is_prepared_for_epoch(epoch).await);
            }

            let inner = Arc::clone(&self.inner);
            let (prepared, progressed) = tokio::task::spawn_blocking(move || {
                let mut sk = inner.blocking_lock();
                if sk.is_prepared_for_epoch(epoch) {
                    return (true, false);
                }
                if epoch < sk.prepared_start() || !sk.activation_interval().contains(&epoch) {
                    return (false, false);
                }
                let before = sk.prepared_interval();
                sk.advance_preparation();
                (
                    sk.is_prepared_for_epoch(epoch),
                    sk.prepared_interval() != before,
                )
            })
            .await
            .map_err(|e| HashSigError::TaskFailed(e.to_string()))?;

            if progressed {
                steps += 1;
            }
            if prepared {
                debug!(epoch, steps, "background preparation reached epoch");
                return Ok(true);
            }
            if !progressed {
                return Ok(false);
            }
        }
    }

    /// Sign `message` at `epoch` under the lock.
    pub async fn sign(&self, epoch: u64, message: &[u8]) -> Result<S::Signature> {
        let digest = MessagePreprocessor::preprocess(message);
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut sk = inner.blocking_lock();
            S::sign(&mut sk, epoch, &digest)
        })
        .await
        .map_err(|e| HashSigError::TaskFailed(e.to_string()))?
    }

    pub async fn prepared_interval(&self) -> Range<u64> {
        self.inner.lock().await.prepared_interval()
    }

    pub async fn is_prepared_for_epoch(&self, epoch: u64) -> bool {
        self.inner.lock().await.is_prepared_for_epoch(epoch)
    }

    /// Take the key back once every other handle is gone.
    pub fn into_inner(self) -> Option<S::SecretKey> {
        Arc::try_unwrap(self.inner).ok().map(Mutex::into_inner)
    }
}
