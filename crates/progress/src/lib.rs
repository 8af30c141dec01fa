#![forbid(unsafe_code)]

//! Progress Store collaborator contract: the async trait the engine
//! checkpoints session progress through, the record shapes it persists,
//! and an in-memory adapter for tests and prototyping.

pub mod store;

pub use store::{
    AnswerRecord, CompletionId, CompletionRecord, InMemoryProgressStore, ProgressStore,
    StoreError,
};
