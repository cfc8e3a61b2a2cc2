//! Stream coordination engine for the real-time translation relay.
//!
//! Everything in this crate is pure coordination logic over the traits
//! defined in `relay-core` — no concrete transport, translator, synth
//! provider, or store lives here. `relay-server` wires concrete
//! implementations in at the composition root.

pub mod broadcast;
pub mod connection_store;
pub mod dedup_cache;
pub mod discrepancy;
pub mod final_handler;
pub mod heartbeat;
pub mod orchestrator;
pub mod partial_handler;
pub mod prosody;
pub mod rate_limiter;
pub mod result_buffer;
pub mod session_store;
pub mod sentence_boundary;
pub mod sweeper;
pub mod synthesizer;
pub mod translation_cache;
pub mod translator;

pub use broadcast::{BroadcastFanout, BroadcastOutcome};
pub use connection_store::InMemoryConnectionStore;
pub use dedup_cache::DedupCache;
pub use discrepancy::{discrepancy_percent, levenshtein_distance};
pub use final_handler::{FinalOutcome, FinalResultHandler};
pub use heartbeat::{HeartbeatEngine, HeartbeatSignal};
pub use orchestrator::{PipelineOrchestrator, ProcessOutcome};
pub use partial_handler::{PartialOutcome, PartialResultHandler};
pub use rate_limiter::RateLimiter;
pub use result_buffer::ResultBuffer;
pub use session_store::InMemorySessionStore;
pub use sentence_boundary::SentenceBoundaryDetector;
pub use sweeper::{SweepSummary, TimeoutSweeper};
pub use synthesizer::ParallelSynthesizer;
pub use translation_cache::{cache_key, TranslationCache};
pub use translator::{ParallelTranslator, TranslationBatchStats};
