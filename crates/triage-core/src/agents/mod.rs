//! Sub-agent handlers: profiles, the tool-use agent and the category dispatcher
//!
//! Each routed ticket is handed to exactly one handler. The stock handlers are
//! LLM sub-agents with their own prompt and tool set per category.

pub mod dispatcher;
pub mod handler;
pub mod profile;
pub mod subagent;

pub use dispatcher::{DispatchError, Dispatcher};
pub use handler::{HandlerOutcome, TicketHandler};
pub use profile::{AgentProfile, DEFAULT_MAX_ITERATIONS, stock_profiles};
pub use subagent::SubAgent;
