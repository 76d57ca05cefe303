//! Multi-agent research coordination.
//!
//! Three stages turn a research brief into report input:
//!
//! 1. [`researcher::ResearchLoop`] — one bounded THINK/ACT loop per
//!    sub-topic, with isolated state and a compression step on stop.
//! 2. [`supervisor::Supervisor`] — decomposes the brief, fans sub-topics
//!    out across a fixed-size worker pool, and collects one finding per
//!    assignment (degraded findings for failed loops).
//! 3. [`synthesis::Synthesizer`] — merges all findings, in assignment
//!    order, into the final report text.
//!
//! Isolation is the point of the design: each loop sees only its own
//! objective and tool history, so per-loop context stays bounded no matter
//! how many sub-topics a brief splits into.

/// Single-topic THINK/ACT/STOP research loop.
pub mod researcher;
/// Decomposition and concurrent fan-out of research loops.
pub mod supervisor;
/// Assignment-ordered report synthesis.
pub mod synthesis;

pub use researcher::ResearchLoop;
pub use supervisor::Supervisor;
pub use synthesis::{assemble_findings, Synthesizer};
