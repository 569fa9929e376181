//! Concrete [`crate::provider::Provider`] adapters.
//!
//! Rather than one backend hard-wired directly into `Client`, each backend
//! is a `Provider` impl like any other, so swapping or test-doubling it
//! needs no change to `Client`/`Runner`.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
