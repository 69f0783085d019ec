//! Category → handler table

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::handler::{HandlerOutcome, TicketHandler};
use super::profile::AgentProfile;
use super::subagent::SubAgent;
use crate::providers::LlmProvider;
use crate::router::{Category, Directive, RoutingState};
use crate::tools::ToolRegistry;

/// Failure to deliver a routed ticket to its handler
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no handler registered for category '{0}'")]
    NoHandler(Category),

    #[error("handler {handler} failed: {source}")]
    Handler {
        handler: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Maps each category to the handler that works its tickets
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<Category, Arc<dyn TicketHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// One stock sub-agent per category sharing a provider and tool registry
    pub fn stock(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        let mut dispatcher = Self::new();
        for category in Category::ALL {
            dispatcher.register(
                category,
                Arc::new(SubAgent::new(
                    AgentProfile::for_category(category),
                    provider.clone(),
                    tools.clone(),
                )),
            );
        }
        dispatcher
    }

    /// Register a handler, replacing any previous one for the category
    pub fn register(&mut self, category: Category, handler: Arc<dyn TicketHandler>) {
        self.handlers.insert(category, handler);
    }

    pub fn handler(&self, category: Category) -> Option<Arc<dyn TicketHandler>> {
        self.handlers.get(&category).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Hand the ticket to the handler the directive names. Exactly one
    /// handler runs.
    pub async fn dispatch(
        &self,
        directive: &Directive,
        state: &RoutingState,
    ) -> Result<HandlerOutcome, DispatchError> {
        let handler = self
            .handlers
            .get(&directive.goto)
            .ok_or(DispatchError::NoHandler(directive.goto))?;

        info!("Dispatching ticket to {}", handler.name());
        handler.handle(state).await.map_err(|source| {
            warn!("Handler {} failed: {}", handler.name(), source);
            DispatchError::Handler {
                handler: handler.name().to_string(),
                source,
            }
        })
    }
}
