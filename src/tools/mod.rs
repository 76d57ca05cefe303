//! Tool port: callable capabilities for the research loop.
//!
//! Tools from any source — locally defined structs or externally registered
//! sets — implement one [`Tool`](registry::Tool) interface and are merged by
//! the [`ToolRegistry`](registry::ToolRegistry) into a single ordered
//! catalog presented to the model. Tool failures are returned to the caller,
//! which folds them back into the reasoning loop as observations rather
//! than raising them.

/// Externally registered tool sets (transport-agnostic).
pub mod external;
/// Tool trait, tool sources, and the merged registry.
pub mod registry;
/// Tavily-backed web search tool.
pub mod search;
/// Strategic reflection tool.
pub mod think;

pub use external::{ExternalInvoker, ExternalToolSet};
pub use registry::{Tool, ToolRegistry, ToolSet};
pub use search::TavilySearchTool;
pub use think::ThinkTool;
