//! Page body to plain text.

/// Line width handed to the HTML renderer.
const TEXT_WIDTH: usize = 120;

/// Convert a fetched body to text based on its content type.
///
/// HTML is rendered with `html2text`; other `text/*`, JSON and XML bodies are
/// decoded as-is. Anything else (PDFs, images) yields `None`.
#[must_use]
pub fn extract_text(content_type: &str, body: &[u8]) -> Option<String> {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("html") || (content_type.is_empty() && looks_like_html(body)) {
        let text = html2text::from_read(body, TEXT_WIDTH)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
        return Some(text.trim().to_string());
    }
    if content_type.starts_with("text/") || content_type.contains("json") || content_type.contains("xml") {
        return Some(String::from_utf8_lossy(body).trim().to_string());
    }
    None
}

fn looks_like_html(body: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&body[..body.len().min(512)]).to_ascii_lowercase();
    head.contains("<html") || head.contains("<!doctype html")
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
#[must_use]
pub fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}
