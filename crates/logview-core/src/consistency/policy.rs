//! Snapshot-taking policy (§4.2).
use std::sync::Arc;

/// Decides, after a successful append, whether the adaptor should write a
/// fresh snapshot before moving on (§4.2).
pub trait SnapshotPolicy<V>: Send + Sync + 'static
where
    V: Send + Sync + 'static,
{
    /// `state` is the view as of `version`, with `applied_since_snapshot`
    /// entries folded in since the last snapshot was taken.
    fn should_take_snapshot(&self, state: &V, version: u64, applied_since_snapshot: u64) -> bool;
}

/// Never take a snapshot; confirmed state is rebuilt by full log replay on
/// every cold start.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonePolicy;

impl<V> SnapshotPolicy<V> for NonePolicy
where
    V: Send + Sync + 'static,
{
    fn should_take_snapshot(&self, _state: &V, _version: u64, _applied_since_snapshot: u64) -> bool {
        false
    }
}

/// Take a snapshot every `k` entries applied since the last snapshot
/// (`applied_since_snapshot >= k`), not a `version mod k == 0` check — see
/// DESIGN.md for why the two diverge once a snapshot doesn't land exactly on
/// a multiple of `k`.
#[derive(Clone, Copy, Debug)]
pub struct EveryPolicy {
    k: u64,
}

impl EveryPolicy {
    /// # Panics
    /// Panics if `k` is zero; a zero-interval policy is a configuration
    /// error, not a runtime condition to special-case (§4.2, §6).
    pub fn new(k: u64) -> Self {
        assert!(k > 0, "EveryPolicy interval must be non-zero");
        Self { k }
    }
}

impl<V> SnapshotPolicy<V> for EveryPolicy
where
    V: Send + Sync + 'static,
{
    fn should_take_snapshot(&self, _state: &V, _version: u64, applied_since_snapshot: u64) -> bool {
        applied_since_snapshot >= self.k
    }
}

/// §4.2's resolution order for the configured policy: an explicit policy
/// object wins outright; otherwise `every` (if positive) beats `none`.
pub fn resolve_policy<V>(
    explicit: Option<Arc<dyn SnapshotPolicy<V>>>,
    every: Option<u64>,
) -> Arc<dyn SnapshotPolicy<V>>
where
    V: Send + Sync + 'static,
{
    if let Some(policy) = explicit {
        return policy;
    }
    match every {
        Some(k) if k > 0 => Arc::new(EveryPolicy::new(k)),
        _ => Arc::new(NonePolicy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_policy_never_fires() {
        let policy = NonePolicy;
        assert!(!SnapshotPolicy::<i32>::should_take_snapshot(&policy, &0, 100, 999));
    }

    #[test]
    fn every_policy_fires_at_threshold() {
        let policy = EveryPolicy::new(3);
        assert!(!policy.should_take_snapshot(&0, 1, 2));
        assert!(policy.should_take_snapshot(&0, 1, 3));
        assert!(policy.should_take_snapshot(&0, 1, 4));
    }

    #[test]
    fn resolve_policy_prefers_explicit_over_every() {
        let explicit: Arc<dyn SnapshotPolicy<i32>> = Arc::new(EveryPolicy::new(1));
        let resolved = resolve_policy(Some(explicit), Some(50));
        assert!(resolved.should_take_snapshot(&0, 1, 1));
    }

    #[test]
    fn resolve_policy_falls_back_to_none_without_every() {
        let resolved: Arc<dyn SnapshotPolicy<i32>> = resolve_policy(None, None);
        assert!(!resolved.should_take_snapshot(&0, 1, 1000));
    }
}
