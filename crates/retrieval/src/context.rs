//! Grounding context assembly
//!
//! Joins reranked passages with a newline, in reranked order. There is no
//! token budget here: the reranker's top-N is the only bound, so a very long
//! passage produces a very long prompt.

/// Join passages into a single grounding context
pub fn assemble<S: AsRef<str>>(ranked_texts: &[S]) -> String {
    let context = ranked_texts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("\n");

    tracing::debug!(passages = ranked_texts.len(), chars = context.chars().count(), "Context assembled");
    context
}
