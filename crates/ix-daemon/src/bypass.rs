//! Bypass control surface: four independently
//! disableable scopes — feature, module, system, startup — each optionally
//! auto-recovering after a configured TTL. `ix-config::BypassConfig` only
//! carries the static configuration; this is the runtime latch the
//! supervisor consults before entering a scope and the `bypass` CLI
//! surface flips.

use std::{
    sync::atomic::{
        AtomicBool,
        Ordering,
    },
    time::{
        Duration,
        Instant,
    },
};

use ix_config::BypassConfig;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassTarget {
    Feature,
    Module,
    System,
    Startup,
}

impl BypassTarget {
    fn as_str(self) -> &'static str {
        match self {
            BypassTarget::Feature => "feature",
            BypassTarget::Module => "module",
            BypassTarget::System => "system",
            BypassTarget::Startup => "startup",
        }
    }
}

struct Scope {
    disabled: AtomicBool,
    auto_recover: Option<Duration>,
    disabled_at: Mutex<Option<Instant>>,
}

impl Scope {
    fn new(disabled: bool, auto_recover: Option<Duration>) -> Self {
        Self {
            disabled: AtomicBool::new(disabled),
            auto_recover,
            disabled_at: Mutex::new(disabled.then(Instant::now)),
        }
    }

    fn disable(&self) {
        self.disabled.store(true, Ordering::Release);
        *self.disabled_at.lock() = Some(Instant::now());
    }

    fn enable(&self) {
        self.disabled.store(false, Ordering::Release);
        *self.disabled_at.lock() = None;
    }

    /// Re-enables the scope itself once its auto-recover TTL has elapsed,
    /// then reports whether the scope currently admits.
    fn admits(&self) -> bool {
        if self.disabled.load(Ordering::Acquire) {
            if let Some(ttl) = self.auto_recover {
                let expired = self.disabled_at.lock().is_some_and(|at| at.elapsed() >= ttl);
                if expired {
                    self.enable();
                    return true;
                }
            }
            return false;
        }
        true
    }
}

/// One latch per scope. The supervisor consults [`BypassGates::admits`] for the
/// relevant target before running a feature/module/the whole system, and
/// the `bypass` CLI subcommand flips [`BypassGates::disable`]/[`enable`].
pub struct BypassGates {
    feature: Scope,
    module: Scope,
    system: Scope,
    startup: Scope,
}

impl BypassGates {
    pub fn new(config: &BypassConfig) -> Self {
        Self {
            feature: Scope::new(config.feature.disabled, config.feature.auto_recover_secs.map(Duration::from_secs)),
            module: Scope::new(config.module.disabled, config.module.auto_recover_secs.map(Duration::from_secs)),
            system: Scope::new(config.system.disabled, config.system.auto_recover_secs.map(Duration::from_secs)),
            startup: Scope::new(config.startup.disabled, config.startup.auto_recover_secs.map(Duration::from_secs)),
        }
    }

    fn scope(&self, target: BypassTarget) -> &Scope {
        match target {
            BypassTarget::Feature => &self.feature,
            BypassTarget::Module => &self.module,
            BypassTarget::System => &self.system,
            BypassTarget::Startup => &self.startup,
        }
    }

    pub fn admits(&self, target: BypassTarget) -> bool {
        self.scope(target).admits()
    }

    pub fn disable(&self, target: BypassTarget) {
        tracing::warn!(scope = target.as_str(), "bypass: disabled by operator");
        self.scope(target).disable();
    }

    pub fn enable(&self, target: BypassTarget) {
        tracing::info!(scope = target.as_str(), "bypass: re-enabled by operator");
        self.scope(target).enable();
    }

    /// The system-wide scope gates everything; a disabled module or feature
    /// only gates its own slice. Startup is consulted once, before the
    /// ingestion/planner/analyzer/decision/safety/executor/lifecycle/
    /// interceptor/lineage collaborators come up.
    pub fn system_admits(&self) -> bool {
        self.system.admits()
    }

    pub fn startup_admits(&self) -> bool {
        self.startup.admits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_disabled_scope_with_no_ttl_never_recovers_on_its_own() {
        let gates = BypassGates::new(&BypassConfig::default());
        gates.disable(BypassTarget::Module);
        assert!(!gates.admits(BypassTarget::Module));
        assert!(!gates.admits(BypassTarget::Module));
    }

    #[test]
    fn a_ttl_scope_recovers_after_it_elapses() {
        let mut config = BypassConfig::default();
        config.feature.auto_recover_secs = Some(0);
        let gates = BypassGates::new(&config);
        gates.disable(BypassTarget::Feature);
        std::thread::sleep(Duration::from_millis(5));
        assert!(gates.admits(BypassTarget::Feature));
    }

    #[test]
    fn scopes_are_independent() {
        let gates = BypassGates::new(&BypassConfig::default());
        gates.disable(BypassTarget::System);
        assert!(!gates.system_admits());
        assert!(gates.admits(BypassTarget::Module));
    }
}
