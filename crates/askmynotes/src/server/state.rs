//! Application state for the HTTP server

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{AppConfig, Credentials};
use crate::error::{Error, Result};
use crate::pipeline::{Orchestrator, StatusHandle};
use crate::providers::{AnswerGenerator, EmbeddingProvider, GeminiClient, GeminiEmbedder};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AppConfig,
    /// Embedding provider shared by all sessions
    embedder: Arc<dyn EmbeddingProvider>,
    /// Answer generator shared by all sessions
    generator: Arc<dyn AnswerGenerator>,
    /// Live sessions
    sessions: SessionRegistry,
}

impl AppState {
    /// Create state backed by the Gemini providers
    pub fn new(config: AppConfig, credentials: &Credentials) -> Result<Self> {
        let embedder = Arc::new(GeminiEmbedder::new(&config.gemini, credentials)?);
        let generator = Arc::new(GeminiClient::new(&config.gemini, credentials)?);

        tracing::info!(
            "Gemini providers initialized (embedding: {}, generation: {})",
            config.gemini.embedding_model,
            config.gemini.generation_model
        );

        Self::with_providers(config, embedder, generator)
    }

    /// Create state with explicit providers
    pub fn with_providers(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        let sessions = SessionRegistry::new(
            Duration::from_secs(config.server.session_idle_secs),
            config.server.max_sessions,
        );
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                embedder,
                generator,
                sessions,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get session registry
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    /// Open a new session with its own orchestrator
    pub fn create_session(&self) -> Result<(Uuid, Session)> {
        let orchestrator = Orchestrator::from_config(
            &self.inner.config,
            Arc::clone(&self.inner.embedder),
            Arc::clone(&self.inner.generator),
        )?;
        Ok(self.inner.sessions.insert(orchestrator))
    }
}

/// One user's orchestrator plus a lock-free view of its status
#[derive(Clone)]
pub struct Session {
    /// Serializes uploads and questions within the session
    pub orchestrator: Arc<Mutex<Orchestrator>>,
    pub status: StatusHandle,
}

/// Registry entry with its last use
struct TrackedSession {
    session: Session,
    last_used: Instant,
    /// Registry-wide use counter; orders sessions touched within one clock tick
    seq: u64,
}

impl TrackedSession {
    /// True unless an upload or question holds the orchestrator
    fn is_idle(&self) -> bool {
        self.session.orchestrator.try_lock().is_ok()
    }
}

/// Sessions keyed by id; each owns its index exclusively
///
/// Sessions unused for `idle_ttl` are dropped by [`SessionRegistry::sweep`].
/// Inserting at `max_sessions` first evicts the least recently used idle
/// session. A session whose orchestrator is locked is never removed.
pub struct SessionRegistry {
    sessions: DashMap<Uuid, TrackedSession>,
    idle_ttl: Duration,
    max_sessions: usize,
    uses: AtomicU64,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
            max_sessions: max_sessions.max(1),
            uses: AtomicU64::new(0),
        }
    }

    fn next_use(&self) -> u64 {
        self.uses.fetch_add(1, Ordering::Relaxed)
    }

    /// Register an orchestrator under a fresh id
    pub fn insert(&self, orchestrator: Orchestrator) -> (Uuid, Session) {
        let now = Instant::now();
        self.sweep(now);
        if self.sessions.len() >= self.max_sessions {
            self.evict_least_recent();
        }

        let id = Uuid::new_v4();
        let session = Session {
            status: orchestrator.status(),
            orchestrator: Arc::new(Mutex::new(orchestrator)),
        };
        self.sessions.insert(
            id,
            TrackedSession {
                session: session.clone(),
                last_used: now,
                seq: self.next_use(),
            },
        );
        tracing::info!("Created session {}", id);
        (id, session)
    }

    /// Look up a session and mark it used
    pub fn get(&self, id: &Uuid) -> Result<Session> {
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        entry.last_used = Instant::now();
        entry.seq = self.next_use();
        Ok(entry.session.clone())
    }

    /// Drop a session and its index
    pub fn remove(&self, id: &Uuid) -> Result<()> {
        self.sessions
            .remove(id)
            .map(|_| tracing::info!("Removed session {}", id))
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Drop idle sessions unused for the TTL as of `now`; returns how many
    pub fn sweep(&self, now: Instant) -> usize {
        let mut expired = 0;
        self.sessions.retain(|id, tracked| {
            let stale = now.saturating_duration_since(tracked.last_used) >= self.idle_ttl
                && tracked.is_idle();
            if stale {
                tracing::debug!("Expiring idle session {}", id);
                expired += 1;
            }
            !stale
        });
        expired
    }

    fn evict_least_recent(&self) {
        let victim = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_idle())
            .min_by_key(|entry| entry.value().seq)
            .map(|entry| *entry.key());

        match victim {
            Some(id) => {
                if self.sessions.remove_if(&id, |_, tracked| tracked.is_idle()).is_some() {
                    tracing::info!("Session limit {} reached, evicted {}", self.max_sessions, id);
                }
            }
            None => tracing::warn!(
                "Session limit {} reached with every session busy",
                self.max_sessions
            ),
        }
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::config::DistanceMetric;
    use crate::ingestion::TextSplitter;
    use crate::retrieval::FlatIndexBuilder;

    struct ZeroEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ZeroEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0])
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn name(&self) -> &str {
            "zero"
        }
    }

    struct SilentGenerator;

    #[async_trait]
    impl AnswerGenerator for SilentGenerator {
        async fn generate(&self, _context: &str, _question: &str) -> Result<String> {
            Ok(String::new())
        }

        fn name(&self) -> &str {
            "silent"
        }

        fn model(&self) -> &str {
            "silent"
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            TextSplitter::new(300, 50).unwrap(),
            Arc::new(ZeroEmbedder),
            Arc::new(SilentGenerator),
            Arc::new(FlatIndexBuilder::new(DistanceMetric::L2)),
            3,
        )
    }

    /// Membership check that does not count as a use
    fn contains(registry: &SessionRegistry, id: &Uuid) -> bool {
        registry.sessions.contains_key(id)
    }

    #[test]
    fn test_sweep_expires_idle_sessions() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let (id, _) = registry.insert(orchestrator());

        assert_eq!(registry.sweep(Instant::now()), 0);
        assert!(contains(&registry, &id));

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(registry.sweep(later), 1);
        assert!(registry.is_empty());
        assert!(matches!(registry.get(&id), Err(Error::SessionNotFound(_))));
    }

    #[test]
    fn test_sweep_keeps_busy_session() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let (id, session) = registry.insert(orchestrator());

        let guard = session.orchestrator.try_lock().unwrap();
        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(registry.sweep(later), 0);
        assert!(contains(&registry, &id));

        drop(guard);
        assert_eq!(registry.sweep(later), 1);
    }

    #[test]
    fn test_full_registry_evicts_least_recently_used() {
        let registry = SessionRegistry::new(Duration::from_secs(3600), 2);
        let (first, _) = registry.insert(orchestrator());
        let (second, _) = registry.insert(orchestrator());

        registry.get(&first).unwrap();
        let (third, _) = registry.insert(orchestrator());

        assert_eq!(registry.len(), 2);
        assert!(contains(&registry, &first));
        assert!(!contains(&registry, &second));
        assert!(contains(&registry, &third));
    }

    #[test]
    fn test_full_registry_skips_busy_sessions() {
        let registry = SessionRegistry::new(Duration::from_secs(3600), 2);
        let (first, busy) = registry.insert(orchestrator());
        let (second, _) = registry.insert(orchestrator());

        let _guard = busy.orchestrator.try_lock().unwrap();
        registry.insert(orchestrator());

        assert!(contains(&registry, &first));
        assert!(!contains(&registry, &second));
    }
}
