// ID Provider Port (for deterministic testing)

/// Length of the short public queue code
pub const QUEUE_CODE_LEN: usize = 8;

/// ID provider interface (allows deterministic IDs in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new unique ID (used for people)
    fn generate_id(&self) -> String;

    /// Generate a short shareable queue code
    ///
    /// Short codes can collide; the engine retries on an occupied slot.
    fn generate_code(&self) -> String {
        self.generate_id()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(QUEUE_CODE_LEN)
            .collect()
    }

    /// Generate an unguessable host capability token
    fn generate_secret(&self) -> String;
}

/// UUID v4 provider (production)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn generate_secret(&self) -> String {
        format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        )
    }
}

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Deterministic IDs: person-1, person-2, ... / q0000001 / token-1
    pub struct SequentialIdProvider {
        counter: AtomicU64,
        scripted_codes: Mutex<VecDeque<String>>,
    }

    impl SequentialIdProvider {
        pub fn new() -> Self {
            Self {
                counter: AtomicU64::new(1),
                scripted_codes: Mutex::new(VecDeque::new()),
            }
        }

        /// Queue codes are taken from `codes` first (to force collisions)
        pub fn with_codes(codes: &[&str]) -> Self {
            let provider = Self::new();
            if let Ok(mut scripted) = provider.scripted_codes.lock() {
                scripted.extend(codes.iter().map(|c| c.to_string()));
            }
            provider
        }

        fn next(&self) -> u64 {
            self.counter.fetch_add(1, Ordering::SeqCst)
        }
    }

    impl Default for SequentialIdProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IdProvider for SequentialIdProvider {
        fn generate_id(&self) -> String {
            format!("person-{}", self.next())
        }

        fn generate_code(&self) -> String {
            let scripted = self
                .scripted_codes
                .lock()
                .ok()
                .and_then(|mut codes| codes.pop_front());
            scripted.unwrap_or_else(|| format!("q{:07}", self.next()))
        }

        fn generate_secret(&self) -> String {
            format!("token-{}", self.next())
        }
    }
}
