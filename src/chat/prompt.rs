//! Prompt assembly for the todo assistant.
//!
//! The system instruction is fixed; the user message is the retrieval
//! context block (when any snippets came back) followed by the raw
//! prompt. Snippets are truncated to a fixed character budget so one
//! long todo cannot blow up the request.

use crate::models::Snippet;

/// Character budget per snippet inside the context block.
pub const SNIPPET_CHAR_BUDGET: usize = 400;

/// Fixed persona, scope boundaries and output-format constraints.
pub const SYSTEM_PROMPT: &str = "\
You are an AI assistant built into a personal productivity todo application. \
You help the user manage, understand and prioritize their tasks.

Guidelines:
- The retrieved todo snippets are the user's actual data and your primary \
source of truth. Ground every suggestion in them and reference specific \
todos when useful.
- Never invent tasks or details that are not present in the retrieved data; \
acknowledge gaps instead.
- Stay within productivity, task management and workflow topics. For legal, \
medical or financial questions, note your limits and suggest an expert.
- Offer at most two or three concrete, actionable suggestions and explain \
the reasoning behind any priority call.
- Do not use preamble or filler like 'Based on the retrieved snippets'. Be \
direct and get straight to the point.";

/// Truncate to the snippet budget, ellipsizing on overflow.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let clipped: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{clipped}...")
}

/// Build the numbered, score-annotated context block. `None` when there
/// are no snippets to show.
pub fn build_context_block(snippets: &[Snippet]) -> Option<String> {
    if snippets.is_empty() {
        return None;
    }

    let chunks: Vec<String> = snippets
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let score = s
                .score
                .map(|v| format!(" (score: {v:.3})"))
                .unwrap_or_default();
            format!("#{}{}: {}", i + 1, score, clip(&s.text, SNIPPET_CHAR_BUDGET))
        })
        .collect();

    Some(format!(
        "Here are the {} most relevant todo snippets from the user's data:\n{}\n\n\
         Use them to answer the user's question where helpful.",
        chunks.len(),
        chunks.join("\n")
    ))
}

/// Compose the user message from the optional context block and the raw
/// prompt.
pub fn build_user_message(context: Option<&str>, prompt: &str) -> String {
    match context {
        Some(ctx) => format!("{ctx}\nUser question: {prompt}"),
        None => format!("{prompt}\n(Note: no user data retrieved)"),
    }
}
