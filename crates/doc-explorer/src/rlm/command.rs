//! Parsing model replies into loop commands

/// Parsed model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Code to run in the sandbox, with the prose that preceded it
    RunCode { reasoning: String, code: String },
    /// Final answer; the loop ends
    Final { reasoning: String, answer: String },
    /// Neither code nor answer
    Invalid,
}

const FENCES: [&str; 5] = ["```repl", "```javascript", "```js", "```typescript", "```ts"];

impl Command {
    /// Parse a reply. A code block wins over `FINAL(...)` appearing after it,
    /// so a model cannot answer before seeing its code run.
    pub fn parse(input: &str) -> Self {
        let fence = find_fence(input);
        let final_at = input.find("FINAL(");

        match (fence, final_at) {
            (Some((start, _)), Some(f)) if f < start => Self::final_answer(input, f),
            (Some((start, len)), _) => match extract_code(&input[start + len..]) {
                Some(code) => Self::RunCode {
                    reasoning: input[..start].trim().to_string(),
                    code,
                },
                None => match final_at {
                    Some(f) => Self::final_answer(input, f),
                    None => Self::Invalid,
                },
            },
            (None, Some(f)) => Self::final_answer(input, f),
            (None, None) => Self::Invalid,
        }
    }

    fn final_answer(input: &str, at: usize) -> Self {
        Self::Final {
            reasoning: input[..at].trim().to_string(),
            answer: extract_final(&input[at + "FINAL(".len()..]),
        }
    }
}

/// Earliest opening fence: (index, tag length)
fn find_fence(input: &str) -> Option<(usize, usize)> {
    FENCES
        .iter()
        .filter_map(|tag| input.find(tag).map(|idx| (idx, tag.len())))
        .min_by_key(|(idx, len)| (*idx, std::cmp::Reverse(*len)))
}

/// Body of a fence, given the text after the opening tag
fn extract_code(after_tag: &str) -> Option<String> {
    let start = after_tag.find('\n').map(|i| i + 1).unwrap_or(after_tag.len());
    let region = &after_tag[start..];
    let end = region.find("```").unwrap_or(region.len());
    let code = region[..end].trim();
    (!code.is_empty()).then(|| code.to_string())
}

/// Paren-balanced contents of `FINAL(`; unclosed takes the rest
fn extract_final(after: &str) -> String {
    let mut depth = 1i32;
    let mut end = None;
    for (i, ch) in after.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let content = end.map(|e| &after[..e]).unwrap_or(after).trim();
    let unquoted = ['"', '\'', '`']
        .iter()
        .find_map(|q| {
            (content.len() >= 2 && content.starts_with(*q) && content.ends_with(*q))
                .then(|| &content[1..content.len() - 1])
        })
        .unwrap_or(content);
    unquoted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn final_of(input: &str) -> String {
        match Command::parse(input) {
            Command::Final { answer, .. } => answer,
            other => panic!("expected final, got {other:?}"),
        }
    }

    fn code_of(input: &str) -> (String, String) {
        match Command::parse(input) {
            Command::RunCode { reasoning, code } => (reasoning, code),
            other => panic!("expected code, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_final() {
        assert_eq!(final_of("FINAL(The answer is 42)"), "The answer is 42");
        assert_eq!(final_of("Done.\nFINAL(\"Hello world\")"), "Hello world");
        assert_eq!(final_of("FINAL(f(a, b) returns (c))"), "f(a, b) returns (c)");
        assert_eq!(final_of("FINAL(unclosed answer"), "unclosed answer");
    }

    #[test]
    fn test_parse_code_block() {
        let (reasoning, code) = code_of("Let me look.\n```repl\nprint(context.slice(0, 100))\n```\n");
        assert_eq!(reasoning, "Let me look.");
        assert_eq!(code, "print(context.slice(0, 100))");
    }

    #[test]
    fn test_js_fence_prefers_longest_tag() {
        let (_, code) = code_of("```javascript\nvar x = 1;\nprint(x)\n```");
        assert_eq!(code, "var x = 1;\nprint(x)");
    }

    #[test]
    fn test_code_before_final_runs_code() {
        let (_, code) = code_of("```js\nprint(1)\n```\nFINAL(guess)");
        assert_eq!(code, "print(1)");
    }

    #[test]
    fn test_empty_fence_falls_back_to_final() {
        assert_eq!(final_of("```js\n```\nFINAL(ok)"), "ok");
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Command::parse("I think we should read more."), Command::Invalid);
    }
}
