//! Domain types and external-collaborator traits for the real-time speech
//! translation relay. No I/O and no concrete backend lives in this crate —
//! everything here is the shared vocabulary `relay-pipeline` and
//! `relay-server` build on.

pub mod connection;
pub mod emotion;
pub mod error;
pub mod result;
pub mod session;
pub mod traits;

pub use connection::{Connection, Role};
pub use emotion::{Emotion, EmotionDynamics, VolumeLevel};
pub use error::{CoreError, Result};
pub use result::{BufferedResult, FinalResult, PartialResult, ResultMetadata};
pub use session::{now_ms, now_secs, to_datetime_ms, BroadcastState, Session, SessionStatus};
pub use traits::{
    AsrBackend, ConnectionStore, SendOutcome, SessionStore, SynthBackend, TranslatorBackend,
    Transport,
};
