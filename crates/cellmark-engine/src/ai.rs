//! Canned question-answering stub.
//!
//! A placeholder for a real backend: answers are fixed markdown so the
//! response renders through the same pipeline as cell content. Swap the
//! body of [`ask`] for a service call to integrate a real provider.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnswer {
    pub id: Uuid,
    pub question: String,
    /// Markdown, renderable by the parse pipeline.
    pub answer: String,
    pub elapsed_ms: u64,
}

pub fn ask(question: &str) -> AiAnswer {
    let started = Instant::now();
    let answer = format!(
        "> Q: {question}\n\nThis is a canned answer. Connect a real backend \
         here and return its response as markdown.\n\n- lists render\n- code \
         renders\n\n```rust\nprintln!(\"hello\");\n```"
    );
    AiAnswer {
        id: Uuid::new_v4(),
        question: question.to_string(),
        answer,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, tokenize};

    #[test]
    fn answer_echoes_the_question_as_a_quote() {
        let answer = ask("what is this cell about?");
        assert!(answer.answer.starts_with("> Q: what is this cell about?"));
        assert_eq!(answer.question, "what is this cell about?");
    }

    #[test]
    fn answer_is_valid_markdown_for_the_pipeline() {
        let answer = ask("anything");
        let tokens = tokenize(&answer.answer);
        assert!(tokens.iter().any(|t| matches!(t, Token::BlockQuote { .. })));
        assert!(tokens.iter().any(|t| matches!(t, Token::List { .. })));
        assert!(tokens.iter().any(|t| matches!(t, Token::Code { .. })));
    }

    #[test]
    fn answers_get_distinct_ids() {
        assert_ne!(ask("a").id, ask("a").id);
    }
}
