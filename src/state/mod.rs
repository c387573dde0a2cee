//! Local state synchronization
//!
//! History, training examples, the signed-in user and the theme preference
//! each live under their own fixed key in a `KeyValueStore`. Keys load
//! independently: a corrupt value is logged and replaced by its default
//! without affecting the others.

pub mod envelope;
pub mod store;
pub mod sync;

pub use envelope::{decode, encode, DecodeError, Envelope, STATE_VERSION};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use sync::{PersistedState, StateSync};

pub const HISTORY_KEY: &str = "prompt_history";
pub const EXAMPLES_KEY: &str = "prompt_examples";
pub const USER_KEY: &str = "prompt_user";
pub const THEME_KEY: &str = "theme";
