//! Pull-request review through a remote agent.
//!
//! Provides the review pipeline: changed-file collection and comment posting
//! on GitHub, payload rendering, the agent session protocol, and extraction
//! of the verdict from the agent's reply.

pub mod agent;
pub mod github;
pub mod payload;
pub mod pipeline;
pub mod response;
pub mod trigger;
