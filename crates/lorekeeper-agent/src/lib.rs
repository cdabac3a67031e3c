//! Agentic search session (C10): drives the hybrid retriever, grounds a
//! prompt against the returned references, streams generation, and
//! persists the turn.

pub mod grounding;
pub mod session;

pub use session::AgentSession;
