//! Question answering pipeline
//!
//! query -> hybrid retrieval -> rerank (head of list) -> context -> prompt
//! -> generation -> answer recorded as a conversation turn.
//!
//! The user turn is recorded before any collaborator is called. If any step
//! fails the error propagates unchanged and no assistant turn is recorded,
//! so the log then ends with the unanswered user turn.

use crate::conversation::{ConversationState, Role};
use ragchat_common::errors::{AppError, Result};
use ragchat_common::{metrics, Generator};
use ragchat_retrieval::rerank::rerank_candidates;
use ragchat_retrieval::{assemble, HybridRetriever, RankedList, Reranker};
use std::sync::Arc;

/// Fill the fixed answer prompt
pub fn format_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions using only the context below. \
         Answer in the same language as the question. If the context does not contain the answer, \
         say that you do not know.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

/// Rerank bounds applied to every answer
#[derive(Debug, Clone, Copy)]
pub struct RerankBounds {
    /// Hybrid candidates submitted to the reranker
    pub fan_out: usize,

    /// Reranked passages kept as grounding context
    pub top_n: usize,
}

impl Default for RerankBounds {
    fn default() -> Self {
        Self {
            fan_out: ragchat_common::DEFAULT_RERANK_FAN_OUT,
            top_n: ragchat_common::DEFAULT_RERANK_TOP_N,
        }
    }
}

/// Drives one question through retrieval, rerank and generation
pub struct ConversationPipeline {
    retriever: HybridRetriever,
    reranker: Arc<dyn Reranker>,
    generator: Arc<dyn Generator>,
    conversation: Arc<ConversationState>,
    bounds: RerankBounds,
}

impl ConversationPipeline {
    pub fn new(
        retriever: HybridRetriever,
        reranker: Arc<dyn Reranker>,
        generator: Arc<dyn Generator>,
        conversation: Arc<ConversationState>,
        bounds: RerankBounds,
    ) -> Self {
        Self {
            retriever,
            reranker,
            generator,
            conversation,
            bounds,
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    /// Unreranked hybrid candidates for a query
    pub async fn relevant_contexts(&self, query: &str, k: Option<usize>) -> Result<RankedList> {
        let k = k.unwrap_or_else(|| self.retriever.default_k());
        self.retriever.retrieve(query, k).await
    }

    /// Answer a question and record both turns
    pub async fn answer(&self, query: &str) -> Result<String> {
        let _exchange = self.conversation.begin_exchange().await;

        self.conversation.append(Role::User, query).await;

        match self.generate_answer(query).await {
            Ok(answer) => {
                self.conversation.append(Role::Assistant, answer.clone()).await;
                metrics::record_answer(true);
                Ok(answer)
            }
            Err(e) => {
                metrics::record_answer(false);
                tracing::warn!(error = %e, "Answer failed, assistant turn not recorded");
                Err(e)
            }
        }
    }

    async fn generate_answer(&self, query: &str) -> Result<String> {
        let ranked = self.retriever.retrieve_default(query).await?;

        let reranked = rerank_candidates(
            self.reranker.as_ref(),
            query,
            &ranked,
            self.bounds.fan_out,
            self.bounds.top_n,
        )
        .await?;

        let texts: Vec<&str> = reranked.iter().map(|p| p.text.as_str()).collect();
        let context = assemble(&texts);
        let prompt = format_prompt(&context, query);

        let answer = self.generator.generate(&prompt).await?.trim().to_string();
        if answer.is_empty() {
            return Err(AppError::GenerationUnavailable {
                message: "model returned only whitespace".to_string(),
            });
        }

        tracing::info!(
            candidates = ranked.len(),
            context_passages = texts.len(),
            context_chars = context.chars().count(),
            answer_chars = answer.chars().count(),
            "Question answered"
        );

        Ok(answer)
    }
}
