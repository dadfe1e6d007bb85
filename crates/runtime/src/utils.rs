use std::future::Future;
use std::pin::pin;
use std::time::Duration;

pub trait PoisonedLockExt<T> {
    #[track_caller]
    fn ensure_lock(&self) -> std::sync::MutexGuard<'_, T>;
}

impl<T> PoisonedLockExt<T> for std::sync::Mutex<T> {
    #[track_caller]
    fn ensure_lock(&self) -> std::sync::MutexGuard<'_, T> {
        self.lock().expect("The Mutex should never be poisoned")
    }
}

// Executes the given future against a timeout duration. If the future takes
// longer than the timeout, the logger function is invoked. The execution of the
// future however, is not cancelled or interrupted.
pub async fn timeout_log_only<F, T, U>(fut: F, duration: Duration, logger: U) -> T
where
    F: Future<Output = T>,
    U: FnOnce(),
{
    let mut inner = pin!(fut);
    let sleep = tokio::time::sleep(duration);
    tokio::select! {
        biased;
        value = &mut inner => {
            value
        },
        () = sleep => {
            logger();
            inner.await
        },
    }
}

/// Millisats to whole sats, rounding down.
pub fn msat_to_sat(msat: u64) -> u64 {
    msat / crate::constants::MSATS_PER_SAT
}
