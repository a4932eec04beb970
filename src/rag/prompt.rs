//! Grounded prompt construction.

use crate::rag::citation::NOT_FOUND;
use crate::types::RetrievalResult;
use std::fmt::Write;

/// System instructions sent with every grounded generation request.
pub const SYSTEM_INSTRUCTION: &str = r#"You answer questions about a single document using ONLY the retrieved document chunks you are given.

Rules:
1. Use only information stated explicitly in the retrieved chunks.
2. Never use outside knowledge, and never infer, estimate or calculate.
3. Quote numbers exactly as the document writes them.
4. Every factual statement must be supported by a citation of the form [p<page>:c<chunk_id>].
5. Each evidence quote must be copied word for word from the chunk it cites.
6. If the chunks do not state the answer, reply with exactly: Not found in the document.

Reply in exactly this format:

Answer:
<short, direct answer>

Citations:
[pX:cY], [pA:cB]

Evidence:
[pX:cY] "<exact quote from chunk pX:cY>"
[pA:cB] "<exact quote from chunk pA:cB>"
"#;

/// Render the user prompt: retrieved chunks, bounded history, question.
///
/// `history` is the already-bounded `User:`/`Assistant:` transcript; pass
/// `None` (or an empty string) on the first turn.
pub fn build_grounded_prompt(
    query: &str,
    retrieved: &RetrievalResult,
    history: Option<&str>,
) -> String {
    let chunks = retrieved
        .passages()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "[CHUNK {}] {}\nPage {}\nText: {}\n",
                i + 1,
                p.citation(),
                p.page,
                p.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n");

    let mut prompt = String::new();
    let _ = writeln!(prompt, "RETRIEVED DOCUMENT CHUNKS:");
    if chunks.is_empty() {
        let _ = writeln!(prompt, "(none)");
    } else {
        let _ = writeln!(prompt, "{}", chunks);
    }

    if let Some(history) = history.map(str::trim).filter(|h| !h.is_empty()) {
        let _ = writeln!(prompt, "\nPREVIOUS CONVERSATION:\n{}", history);
    }

    let _ = write!(
        prompt,
        "\nCURRENT USER QUESTION:\n{}\n\n\
         INSTRUCTIONS:\n\
         Answer using ONLY the retrieved chunks above.\n\
         If they do not state the answer, reply with exactly: {}\n\
         Otherwise give the Answer, Citations and Evidence sections in the required format.\n\n\
         Your response:",
        query.trim(),
        NOT_FOUND
    );

    prompt
}
