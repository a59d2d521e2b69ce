//! Prompts for the exploration loop

pub const SYSTEM_PROMPT: &str = r#"You answer questions about a document by exploring it with code. You do not see the document directly: it is loaded into a persistent JavaScript REPL.

Available in the REPL:
- `context`: the full document text (string)
- `question`: the user's question (string)
- `print(...values)`: the only way to see results; output is returned to you
- `llm_query(prompt)`: ask a sub-model about a piece of text you pass in; returns a string. Use it for summarizing or analyzing chunks too long to read yourself.

State persists between blocks. Declare with `var` or assign to `globalThis` to keep values; `let`/`const` do not survive a block.

Each reply must do exactly one of:
1. Run code: a single ```repl block. Briefly say what you are checking before the block.
2. Answer: FINAL(your answer). Only answer once printed output supports it.

Start by checking `context.length` and printing a slice of the beginning. Search with `indexOf`, regular expressions, or by splitting into sections. Print only what you need; long outputs are truncated."#;

/// Longest sandbox output echoed back to the model
pub const MAX_OUTPUT_CHARS: usize = 4000;

pub fn initial_prompt(question: &str, context_chars: usize) -> String {
    format!(
        "The document is loaded as `context` ({} characters).\n\nQuestion: {}\n\nWrite code to explore the document.",
        context_chars, question
    )
}

pub fn output_message(output: &str) -> String {
    if output.trim().is_empty() {
        return "[REPL Output]\n[No output. Use print() to see results]".to_string();
    }
    match output.char_indices().nth(MAX_OUTPUT_CHARS) {
        Some((idx, _)) => format!(
            "[REPL Output]\n{}...\n[truncated, {} total chars. Print smaller slices]",
            &output[..idx],
            output.chars().count()
        ),
        None => format!("[REPL Output]\n{}", output),
    }
}

pub const INVALID_REPLY: &str = "Reply with either a ```repl code block or FINAL(answer). \
Try: print(context.slice(0, 2000))";

pub const FORCE_FINAL: &str = "You are out of exploration steps. Based on everything printed so far, \
give your best answer now as FINAL(answer).";

pub const SUB_QUERY_BUDGET_EXHAUSTED: &str = "llm_query budget exhausted; continue without sub-queries";
