//! Ticket routing
//!
//! The router hands the conversation and a routing instruction to a
//! [`Classifier`], validates the returned label against the fixed
//! [`Category`] set and emits a [`Directive`] naming the handler. It never
//! retries, never guesses a default route and touches nothing except the
//! route field of the [`RoutingState`].

pub mod category;
pub mod classifier;
pub mod error;
pub mod state;

use std::sync::Arc;
use tracing::{debug, info, warn};

pub use category::{Category, ParseCategoryError};
pub use classifier::{Classifier, LlmClassifier, RawDecision, route_tool_definition};
pub use error::{ClassifierError, RouterError};
pub use state::{Directive, RoutingDecision, RoutingState, StateUpdate};

use crate::prompts::ROUTER_INSTRUCTION;
use crate::types::Conversation;

/// Maps a conversation to exactly one handler
pub struct TicketRouter {
    classifier: Arc<dyn Classifier>,
    instruction: String,
}

impl TicketRouter {
    /// Create a router using the stock routing instruction
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            instruction: ROUTER_INSTRUCTION.to_string(),
        }
    }

    /// Replace the routing instruction
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Classify a conversation without touching any state
    pub async fn decide(&self, conversation: &Conversation) -> Result<Directive, RouterError> {
        if conversation.is_empty() {
            return Err(RouterError::EmptyConversation);
        }

        let raw = self
            .classifier
            .classify(&self.instruction, conversation.messages())
            .await
            .inspect_err(|e| warn!("Ticket classification failed: {}", e))?;

        let decision = validate(raw)?;
        info!(
            "Routed ticket ({} messages) to {}",
            conversation.len(),
            decision.category.handler_name()
        );
        debug!("Routing rationale: {}", decision.chain_of_thought);

        Ok(Directive::from_decision(decision))
    }

    /// Classify the state's conversation and record the chosen route.
    ///
    /// On error the state is left exactly as it was.
    pub async fn route(&self, state: &mut RoutingState) -> Result<Directive, RouterError> {
        let directive = self.decide(state.conversation()).await?;
        state.apply(&directive.update);
        Ok(directive)
    }
}

/// Turn a raw classifier payload into a decision, rejecting absent or
/// out-of-set labels
fn validate(raw: RawDecision) -> Result<RoutingDecision, RouterError> {
    let Some(label) = raw.label else {
        warn!("Classifier returned no label");
        return Err(RouterError::UnrecognizedCategory { label: None });
    };

    match label.parse::<Category>() {
        Ok(category) => Ok(RoutingDecision {
            chain_of_thought: raw.chain_of_thought,
            category,
        }),
        Err(ParseCategoryError(label)) => {
            warn!("Classifier returned unrecognized label {:?}", label);
            Err(RouterError::UnrecognizedCategory { label: Some(label) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::providers::ChatMessage;

    struct FixedClassifier(RawDecision);

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(
            &self,
            _instruction: &str,
            _messages: &[ChatMessage],
        ) -> Result<RawDecision, ClassifierError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_validate_accepts_both_label_forms() {
        let d = validate(RawDecision::new("x", "order")).unwrap();
        assert_eq!(d.category, Category::Order);
        let d = validate(RawDecision::new("x", "order_agent")).unwrap();
        assert_eq!(d.category, Category::Order);
    }

    #[test]
    fn test_validate_rejects_missing_label() {
        let err = validate(RawDecision::default()).unwrap_err();
        assert!(matches!(err, RouterError::UnrecognizedCategory { label: None }));
    }

    #[tokio::test]
    async fn test_empty_conversation_rejected() {
        let router = TicketRouter::new(Arc::new(FixedClassifier(RawDecision::new(
            "x", "delivery",
        ))));
        let err = router.decide(&Conversation::new()).await.unwrap_err();
        assert!(matches!(err, RouterError::EmptyConversation));
    }

    #[tokio::test]
    async fn test_custom_instruction() {
        let router = TicketRouter::new(Arc::new(FixedClassifier(RawDecision::new(
            "x", "delivery",
        ))))
        .with_instruction("custom");
        assert_eq!(router.instruction(), "custom");
    }
}
