//! What a ticket cost: tokens, model round trips, and the tools an agent touched

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::providers::ChatUsage;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatedUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub api_calls: u32,
    /// Tool names in call order, repeats included
    pub tool_calls: Vec<String>,
}

impl AccumulatedUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one model round trip
    pub fn record_response(&mut self, usage: &ChatUsage) {
        self.input_tokens += u64::from(usage.input_tokens);
        self.output_tokens += u64::from(usage.output_tokens);
        self.api_calls += 1;
    }

    pub fn record_tool_call(&mut self, tool_name: &str) {
        self.tool_calls.push(tool_name.to_string());
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl fmt::Display for AccumulatedUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} API call(s), {} tool call(s), {} tokens ({} in / {} out)",
            self.api_calls,
            self.tool_calls.len(),
            self.total_tokens(),
            self.input_tokens,
            self.output_tokens
        )
    }
}
