//! Task 4, expire stale advisory locks and in-flight operation markers
//!. The in-process side is `ix_safety::LockAdvisor`;
//! the database-backed advisory lock (`ix_safety::lock_advisor_db`) releases
//! itself automatically when its owning session ends, so there is nothing to
//! reap there.

use ix_safety::LockAdvisor;

pub fn expire(lock_advisor: &LockAdvisor) -> usize {
    let reaped = lock_advisor.reap_stale();
    if reaped > 0 {
        tracing::info!(reaped, "expired stale advisory locks");
    }
    reaped
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn delegates_to_the_lock_advisors_own_reaper() {
        let advisor = LockAdvisor::new(Duration::from_millis(5));
        advisor.try_acquire("t1:contacts");
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(expire(&advisor), 1);
    }
}
