//! Response types for document queries

use serde::{Deserialize, Serialize};

/// One iteration of the reasoning engine's exploration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// 1-based, sequential
    pub iteration: u32,
    pub reasoning: String,
    pub code: String,
    pub output: String,
}

/// Outcome of a single question. Produced even on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Final answer, or `"Error: ..."` on failure
    pub answer: String,
    /// Ordered exploration steps
    pub trajectory: Vec<TrajectoryStep>,
    /// Wall-clock seconds, rounded to two decimals
    pub elapsed_time_s: f64,
    pub iteration_count: usize,
    /// Steps that issued nested model queries
    pub sub_llm_calls: usize,
    pub total_tokens: u64,
    pub depth: u32,
    /// Engine failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// Result for a failed engine invocation
    pub fn failure(message: impl Into<String>, elapsed_time_s: f64, depth: u32) -> Self {
        let message = message.into();
        Self {
            answer: format!("Error: {}", message),
            trajectory: Vec::new(),
            elapsed_time_s,
            iteration_count: 0,
            sub_llm_calls: 0,
            total_tokens: 0,
            depth,
            error: Some(message),
        }
    }

    /// Summary sent with the final streaming message
    pub fn metrics(&self) -> Metrics {
        Metrics {
            tokens: self.total_tokens,
            time_s: self.elapsed_time_s,
            iterations: self.iteration_count,
            depth: self.depth,
            sub_llm_calls: self.sub_llm_calls,
        }
    }
}

/// Metrics summary of a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub tokens: u64,
    pub time_s: f64,
    pub iterations: usize,
    pub depth: u32,
    pub sub_llm_calls: usize,
}

/// Message sent over the streaming query channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamMessage {
    /// Exploration started
    Status { message: String },
    /// One trajectory step
    Iteration(TrajectoryStep),
    /// Terminal failure
    Error { message: String },
    /// Terminal answer
    Result { answer: String, metrics: Metrics },
}

impl StreamMessage {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Final message for a query result
    pub fn result(result: &QueryResult) -> Self {
        Self::Result {
            answer: result.answer.clone(),
            metrics: result.metrics(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_defaults() {
        let result = QueryResult::failure("boom", 0.25, 1);
        assert_eq!(result.answer, "Error: boom");
        assert!(result.trajectory.is_empty());
        assert_eq!(result.total_tokens, 0);
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_error_field_omitted_on_success() {
        let result = QueryResult {
            answer: "ok".into(),
            trajectory: vec![],
            elapsed_time_s: 1.5,
            iteration_count: 0,
            sub_llm_calls: 0,
            total_tokens: 10,
            depth: 1,
            error: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["elapsed_time_s"], json!(1.5));
    }

    #[test]
    fn test_stream_envelope() {
        let msg = StreamMessage::status("RLM is exploring your document...");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "status", "data": {"message": "RLM is exploring your document..."}})
        );

        let step = TrajectoryStep {
            iteration: 1,
            reasoning: "look".into(),
            code: "print(context)".into(),
            output: "Hello".into(),
        };
        let value = serde_json::to_value(StreamMessage::Iteration(step)).unwrap();
        assert_eq!(value["type"], "iteration");
        assert_eq!(value["data"]["iteration"], 1);
        assert_eq!(value["data"]["output"], "Hello");
    }

    #[test]
    fn test_result_envelope_carries_metrics() {
        let mut result = QueryResult::failure("x", 2.0, 1);
        result.answer = "done".into();
        result.error = None;
        result.total_tokens = 42;

        let value = serde_json::to_value(StreamMessage::result(&result)).unwrap();
        assert_eq!(value["type"], "result");
        assert_eq!(value["data"]["answer"], "done");
        assert_eq!(value["data"]["metrics"]["tokens"], 42);
        assert_eq!(value["data"]["metrics"]["time_s"], json!(2.0));
    }
}
