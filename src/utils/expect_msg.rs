use std::sync::LockResult;

/// Unwraps a lock result, panicking with the name of the guarded object.
///
/// A poisoned lock means another thread panicked mid-mutation, which leaves
/// the buffer metadata in an unknown state.
pub trait ExpectLock<G> {
    fn expect_lock(self, what: &str) -> G;
}

impl<G> ExpectLock<G> for LockResult<G> {
    fn expect_lock(self, what: &str) -> G {
        match self {
            Ok(guard) => guard,
            Err(_) => panic!("Poisoned lock on {}", what),
        }
    }
}
