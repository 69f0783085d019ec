//! Ticket pipeline: intake → route → dispatch
//!
//! Every ticket gets its own `RoutingState`; nothing mutable is shared between
//! tickets, so one pipeline can serve many tickets concurrently.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::{DispatchError, Dispatcher, HandlerOutcome};
use crate::router::{Directive, RouterError, RoutingState, TicketRouter};
use crate::types::Conversation;

/// Anything that stops a ticket from reaching a reply
#[derive(Debug, Error)]
pub enum TicketError {
    #[error("routing failed: {0}")]
    Route(#[from] RouterError),

    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Everything produced while handling one ticket
#[derive(Debug, Clone)]
pub struct TicketOutcome {
    pub ticket_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub directive: Directive,
    /// State after routing, as the handler saw it
    pub state: RoutingState,
    pub outcome: HandlerOutcome,
}

impl TicketOutcome {
    pub fn reply(&self) -> &str {
        &self.outcome.reply
    }
}

pub struct TicketPipeline {
    router: Arc<TicketRouter>,
    dispatcher: Arc<Dispatcher>,
}

impl TicketPipeline {
    pub fn new(router: Arc<TicketRouter>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { router, dispatcher }
    }

    pub fn router(&self) -> &TicketRouter {
        &self.router
    }

    /// Route the conversation and hand it to the selected handler
    pub async fn handle_ticket(
        &self,
        conversation: Conversation,
    ) -> Result<TicketOutcome, TicketError> {
        let ticket_id = Uuid::new_v4();
        let received_at = Utc::now();
        let mut state = RoutingState::new(conversation);

        let directive = self
            .router
            .route(&mut state)
            .await
            .inspect_err(|e| warn!("Ticket {} not routed: {}", ticket_id, e))?;
        info!("Ticket {} → {}", ticket_id, directive.target());

        let outcome = self
            .dispatcher
            .dispatch(&directive, &state)
            .await
            .inspect_err(|e| warn!("Ticket {} not handled: {}", ticket_id, e))?;

        Ok(TicketOutcome {
            ticket_id,
            received_at,
            directive,
            state,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::TicketHandler;
    use crate::providers::ChatMessage;
    use crate::router::{Category, Classifier, ClassifierError, RawDecision};
    use async_trait::async_trait;

    struct LabelClassifier(&'static str);

    #[async_trait]
    impl Classifier for LabelClassifier {
        async fn classify(
            &self,
            _instruction: &str,
            _messages: &[ChatMessage],
        ) -> Result<RawDecision, ClassifierError> {
            Ok(RawDecision::new("test", self.0))
        }
    }

    struct EchoHandler(&'static str);

    #[async_trait]
    impl TicketHandler for EchoHandler {
        fn name(&self) -> &str {
            self.0
        }

        async fn handle(&self, state: &RoutingState) -> anyhow::Result<HandlerOutcome> {
            let mut conversation = state.conversation().clone();
            conversation.push(ChatMessage::assistant(format!("{} here", self.0)));
            Ok(HandlerOutcome {
                conversation,
                reply: format!("{} here", self.0),
                ..Default::default()
            })
        }
    }

    fn pipeline(label: &'static str) -> TicketPipeline {
        let router = TicketRouter::new(Arc::new(LabelClassifier(label)));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Category::Order, Arc::new(EchoHandler("order_agent")));
        TicketPipeline::new(Arc::new(router), Arc::new(dispatcher))
    }

    #[tokio::test]
    async fn test_handle_ticket() {
        let outcome = pipeline("order")
            .handle_ticket(Conversation::from_user("cancel my order"))
            .await
            .unwrap();
        assert_eq!(outcome.directive.goto, Category::Order);
        assert_eq!(outcome.state.route(), Some(Category::Order));
        assert_eq!(outcome.reply(), "order_agent here");
        assert_eq!(outcome.outcome.conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_ticket_ids_are_unique() {
        let pipeline = pipeline("order");
        let a = pipeline
            .handle_ticket(Conversation::from_user("a"))
            .await
            .unwrap();
        let b = pipeline
            .handle_ticket(Conversation::from_user("b"))
            .await
            .unwrap();
        assert_ne!(a.ticket_id, b.ticket_id);
    }

    #[tokio::test]
    async fn test_route_error_stops_before_dispatch() {
        let err = pipeline("support")
            .handle_ticket(Conversation::from_user("hello"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TicketError::Route(RouterError::UnrecognizedCategory { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_handler_is_dispatch_error() {
        let err = pipeline("delivery")
            .handle_ticket(Conversation::from_user("where is it"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TicketError::Dispatch(DispatchError::NoHandler(Category::Delivery))
        ));
    }

    #[tokio::test]
    async fn test_empty_conversation() {
        let err = pipeline("order")
            .handle_ticket(Conversation::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::Route(RouterError::EmptyConversation)));
    }
}
