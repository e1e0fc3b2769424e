use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Stop flag shared by every worker of one run.
///
/// Clones observe the same flag. Workers only read it, at the top of each
/// loop iteration, so a request already in flight always completes.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = InterruptFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_stopped());

        flag.stop();
        assert!(observer.is_stopped());

        flag.stop();
        assert!(flag.is_stopped());
    }

    #[test]
    fn test_stop_from_other_thread() {
        let flag = InterruptFlag::new();
        let remote = flag.clone();
        std::thread::spawn(move || remote.stop()).join().unwrap();
        assert!(flag.is_stopped());
    }
}
