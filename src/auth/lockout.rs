///
/// The lockout decision - a pure function of the failed-attempt counter.
///
/// There is no time-based decay: once locked, an account stays locked until a
/// successful login resets the counter or an administrator does.
///
#[derive(Clone, Copy, Debug)]
pub struct LockoutPolicy {
    threshold: u32,
}

impl LockoutPolicy {
    pub fn new(threshold: u32) -> Self {
        LockoutPolicy { threshold }
    }

    /// Fails closed - any count at or above the threshold locks.
    pub fn is_locked(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_at_and_above_the_threshold() {
        let policy = LockoutPolicy::new(5);
        assert!(!policy.is_locked(0));
        assert!(!policy.is_locked(4));
        assert!(policy.is_locked(5));
        assert!(policy.is_locked(6));
        assert!(policy.is_locked(u32::MAX));
    }

    #[test]
    fn a_zero_threshold_locks_everything() {
        let policy = LockoutPolicy::new(0);
        assert!(policy.is_locked(0));
    }
}
