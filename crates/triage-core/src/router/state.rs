//! Routing decision, per-ticket state and the directive the router emits

use serde::{Deserialize, Serialize};

use super::category::Category;
use crate::types::Conversation;

/// A validated classification: rationale plus a label from the fixed set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub chain_of_thought: String,
    pub category: Category,
}

/// State shared between the router and the selected handler for one ticket.
/// Serialize-only: a route can be set by the router and nothing else.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoutingState {
    conversation: Conversation,
    route: Option<Category>,
}

impl RoutingState {
    /// Fresh state at ticket intake: no route chosen yet
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            route: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Category chosen by the most recent routing decision
    pub fn route(&self) -> Option<Category> {
        self.route
    }

    /// Only the router applies updates
    pub(crate) fn apply(&mut self, update: &StateUpdate) {
        self.route = Some(update.route);
    }
}

/// State change requested by a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub route: Category,
}

/// Router output: the next handler and the update to apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub goto: Category,
    pub update: StateUpdate,
    pub rationale: String,
}

impl Directive {
    pub fn from_decision(decision: RoutingDecision) -> Self {
        Self {
            goto: decision.category,
            update: StateUpdate {
                route: decision.category,
            },
            rationale: decision.chain_of_thought,
        }
    }

    /// Name of the handler this directive targets
    pub fn target(&self) -> &'static str {
        self.goto.handler_name()
    }
}
