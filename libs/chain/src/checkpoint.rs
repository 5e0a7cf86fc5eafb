//! Checkpoint and rollback
//!
//! A unit of work mutates state in place after a checkpoint is taken. If the
//! unit fails the checkpoint is restored, discarding every side effect; if it
//! succeeds the checkpoint is dropped.

use tracing::debug;

#[derive(Debug, Clone)]
pub struct Checkpoint<S: Clone> {
    saved: S,
}

impl<S: Clone> Checkpoint<S> {
    pub fn take(state: &S) -> Self {
        Self {
            saved: state.clone(),
        }
    }

    pub fn restore(self, state: &mut S) {
        *state = self.saved;
    }
}

/// Run `op` against `state`; on error `state` is returned to its prior value
pub fn atomically<S, T, E, F>(state: &mut S, op: F) -> Result<T, E>
where
    S: Clone,
    F: FnOnce(&mut S) -> Result<T, E>,
{
    let checkpoint = Checkpoint::take(state);
    match op(state) {
        Ok(value) => Ok(value),
        Err(e) => {
            debug!("unit failed, restoring checkpoint");
            checkpoint.restore(state);
            Err(e)
        }
    }
}
