//! # Resolution Policy
//!
//! Chooses which block source answers a lookup, and whether a failed
//! trusted-node attempt is retried once against the mirror quorum.
//!
//! | Mode | First attempt | On failure |
//! |------|---------------|------------|
//! | `Disabled` | quorum | fail |
//! | `Enabled` | trusted node | one quorum attempt |
//! | `Strict` | trusted node | fail |

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::ResolutionMode;
use crate::domain::ConversionError;
use crate::ports::outbound::BlockSource;

/// Source selection and fallback rule.
#[derive(Clone)]
pub struct ResolutionPolicy {
    mode: ResolutionMode,
    node: Option<Arc<dyn BlockSource>>,
    quorum: Arc<dyn BlockSource>,
}

impl ResolutionPolicy {
    /// Policy over a trusted node (if any) and the quorum.
    ///
    /// # Errors
    /// `InvalidConfig` when `mode` needs a node and none is given.
    pub fn new(
        mode: ResolutionMode,
        node: Option<Arc<dyn BlockSource>>,
        quorum: Arc<dyn BlockSource>,
    ) -> Result<Self, ConversionError> {
        if mode.uses_node() && node.is_none() {
            return Err(ConversionError::InvalidConfig(format!(
                "mode {} requires a trusted node",
                mode
            )));
        }
        Ok(Self { mode, node, quorum })
    }

    /// Quorum-only policy.
    pub fn quorum_only(quorum: Arc<dyn BlockSource>) -> Self {
        Self {
            mode: ResolutionMode::Disabled,
            node: None,
            quorum,
        }
    }

    /// Configured mode.
    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Run `attempt` against the selected source, falling back once if allowed.
    ///
    /// `quorum_only` skips the trusted node whatever the mode.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        quorum_only: bool,
        attempt: F,
    ) -> Result<T, ConversionError>
    where
        F: Fn(Arc<dyn BlockSource>) -> Fut,
        Fut: Future<Output = Result<T, ConversionError>>,
    {
        let node = match &self.node {
            Some(node) if self.mode.uses_node() && !quorum_only => Arc::clone(node),
            _ => return self.on_quorum(label, &attempt).await,
        };

        info!("[resolver] {}: trusted node verification via {}", label, node.source_id());
        let err = match attempt(node).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if self.mode == ResolutionMode::Strict || !err.is_recoverable() {
            error!("[resolver] {}: trusted node verification failed: {}", label, err);
            return Err(err);
        }

        warn!("[resolver] {}: trusted node failed ({}), falling back to quorum", label, err);
        self.on_quorum(label, &attempt).await
    }

    async fn on_quorum<T, F, Fut>(&self, label: &str, attempt: &F) -> Result<T, ConversionError>
    where
        F: Fn(Arc<dyn BlockSource>) -> Fut,
        Fut: Future<Output = Result<T, ConversionError>>,
    {
        info!("[resolver] {}: lite verification via {}", label, self.quorum.source_id());
        attempt(Arc::clone(&self.quorum)).await.map_err(|err| {
            error!("[resolver] {}: lite verification failed: {}", label, err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockBlockSource;

    fn sources() -> (Arc<MockBlockSource>, Arc<MockBlockSource>) {
        let node = MockBlockSource::new("node").with_transaction("ab", "from-node");
        let quorum = MockBlockSource::new("quorum").with_transaction("ab", "from-quorum");
        (Arc::new(node), Arc::new(quorum))
    }

    async fn lookup(policy: &ResolutionPolicy, quorum_only: bool) -> Result<String, ConversionError> {
        policy
            .run("ab", quorum_only, |source| async move {
                let info = source.transaction("ab").await?;
                Ok::<_, ConversionError>(info.blockhash.unwrap_or_default())
            })
            .await
    }

    #[tokio::test]
    async fn test_enabled_prefers_node() {
        let (node, quorum) = sources();
        let policy =
            ResolutionPolicy::new(ResolutionMode::Enabled, Some(node.clone()), quorum.clone()).unwrap();

        assert_eq!(lookup(&policy, false).await.unwrap(), "from-node");
        assert_eq!(quorum.call_count(), 0);
    }

    #[tokio::test]
    async fn test_enabled_falls_back_once() {
        let node = Arc::new(MockBlockSource::new("node").failing());
        let quorum = Arc::new(MockBlockSource::new("quorum").with_transaction("ab", "from-quorum"));
        let policy =
            ResolutionPolicy::new(ResolutionMode::Enabled, Some(node.clone()), quorum.clone()).unwrap();

        assert_eq!(lookup(&policy, false).await.unwrap(), "from-quorum");
        assert_eq!(node.call_count(), 1);
        assert_eq!(quorum.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_final() {
        let node = Arc::new(MockBlockSource::new("node").failing());
        let quorum = Arc::new(MockBlockSource::new("quorum").failing());
        let policy =
            ResolutionPolicy::new(ResolutionMode::Enabled, Some(node.clone()), quorum.clone()).unwrap();

        assert!(lookup(&policy, false).await.is_err());
        assert_eq!(node.call_count(), 1);
        assert_eq!(quorum.call_count(), 1);
    }

    #[tokio::test]
    async fn test_strict_never_touches_quorum() {
        let node = Arc::new(MockBlockSource::new("node").failing());
        let quorum = Arc::new(MockBlockSource::new("quorum").with_transaction("ab", "x"));
        let policy =
            ResolutionPolicy::new(ResolutionMode::Strict, Some(node), quorum.clone()).unwrap();

        assert!(matches!(
            lookup(&policy, false).await,
            Err(ConversionError::RpcError(_))
        ));
        assert_eq!(quorum.call_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_and_quorum_only_skip_node() {
        let (node, quorum) = sources();
        let disabled =
            ResolutionPolicy::new(ResolutionMode::Disabled, Some(node.clone()), quorum.clone()).unwrap();
        assert_eq!(lookup(&disabled, false).await.unwrap(), "from-quorum");

        let enabled =
            ResolutionPolicy::new(ResolutionMode::Enabled, Some(node.clone()), quorum.clone()).unwrap();
        assert_eq!(lookup(&enabled, true).await.unwrap(), "from-quorum");
        assert_eq!(node.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_recoverable_error_not_retried() {
        let (node, quorum) = sources();
        let policy =
            ResolutionPolicy::new(ResolutionMode::Enabled, Some(node), quorum.clone()).unwrap();

        let result: Result<(), _> = policy
            .run("ab", false, |_| async {
                Err(ConversionError::MalformedReceipt("bad".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(quorum.call_count(), 0);
    }

    #[test]
    fn test_node_modes_need_node() {
        let quorum: Arc<dyn BlockSource> = Arc::new(MockBlockSource::default());
        assert!(ResolutionPolicy::new(ResolutionMode::Strict, None, quorum.clone()).is_err());
        assert!(ResolutionPolicy::new(ResolutionMode::Disabled, None, quorum.clone()).is_ok());
        assert_eq!(ResolutionPolicy::quorum_only(quorum).mode(), ResolutionMode::Disabled);
    }
}
