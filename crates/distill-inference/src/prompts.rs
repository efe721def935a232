//! Prompt construction.
//!
//! Every prompt is a Llama 3.1 chat transcript ending at the assistant header,
//! so the completion endpoint continues as the assistant.

use distill_core::entities::FetchedDocument;

/// Per-document content cap before any token counting.
pub const MAX_DOCUMENT_CHARS: usize = 10_000;

/// Separator between rendered documents.
pub const DOCUMENT_SEPARATOR: &str = "\n---\n";

/// Separator between partial summaries in the reduced context.
pub const SUMMARY_SEPARATOR: &str = "\n\n---\n\n";

/// Wrap a system and a user message in the Llama 3.1 chat template.
#[must_use]
pub fn chat_prompt(system: &str, user: &str) -> String {
    format!(
        "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{system}<|eot_id|>\
         <|start_header_id|>user<|end_header_id|>\n\n{user}<|eot_id|>\
         <|start_header_id|>assistant<|end_header_id|>\n\n"
    )
}

/// Render one document as a numbered result block.
#[must_use]
pub fn render_document(position: usize, document: &FetchedDocument) -> String {
    let content = document.content.as_deref().unwrap_or_default();
    let content = match content.char_indices().nth(MAX_DOCUMENT_CHARS) {
        Some((cut, _)) => &content[..cut],
        None => content,
    };
    format!(
        "[Result {position}]\nTitle: {}\nURL: {}\nContent: {content}\n",
        document.title.as_deref().unwrap_or_default(),
        document.locator,
    )
}

/// Render every document, numbered from 1.
#[must_use]
pub fn render_documents(documents: &[FetchedDocument]) -> Vec<String> {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| render_document(i + 1, doc))
        .collect()
}

/// Prompt asking for a partial summary of chunk `index` of `total` (1-based).
#[must_use]
pub fn map_prompt(topic: &str, index: usize, total: usize, chunk: &str, language: &str) -> String {
    let system = format!(
        "You are a research assistant. Summarize the provided search results in {language}. \
         Extract the key facts relevant to the topic."
    );
    let user = format!(
        "Topic: {topic}\n\nChunk {index}/{total}:\n{chunk}\n\nSummarize the key points in {language}:"
    );
    chat_prompt(&system, &user)
}

/// Join partial summaries into the reduced context, labelled by position.
#[must_use]
pub fn join_partial_summaries<S: AsRef<str>>(summaries: &[S]) -> String {
    summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Summary Part {}:\n{}", i + 1, s.as_ref().trim()))
        .collect::<Vec<_>>()
        .join(SUMMARY_SEPARATOR)
}

/// The final synthesis prompt over direct or reduced context.
#[must_use]
pub fn synthesis_prompt(topic: &str, context: &str, language: &str) -> String {
    let system = format!(
        "You are a professional research summarization assistant.\n\n\
         Rules:\n\
         1. Respond in {language} only.\n\
         2. Use only the information in the provided search results.\n\
         3. Write at most 3-5 paragraphs.\n\
         4. Do not repeat yourself.\n\
         5. Ignore results unrelated to the topic.\n\
         6. If the results contain nothing relevant, say that no information was found."
    );
    let user = format!(
        "Topic: {topic}\n\nSearch results (or summarized context):\n{context}\n\n\
         Summarize the information above about '{topic}' in {language}."
    );
    chat_prompt(&system, &user)
}
