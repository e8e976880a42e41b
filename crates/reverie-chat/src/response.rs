//! Reply post-processing and the degraded fallback reply.

/// Reply substituted when the generation service fails or times out.
///
/// The chat endpoint never surfaces a generation fault to the caller; it
/// answers with this text instead.
pub const DEGRADED_REPLY: &str = "Sorry, I encountered a problem processing your request.";

/// Clean up a raw model reply for presentation.
///
/// Strips markdown emphasis markers, softens stock document-reference
/// phrasing, and ensures the reply ends with terminal punctuation.
pub fn polish_reply(raw: &str) -> String {
    let mut reply = raw.replace('*', "");

    reply = reply.replace("the document states that", "according to the information");
    reply = reply.replace("as per the document", "based on what I found");

    let reply = reply.trim();
    if reply.is_empty() {
        return String::new();
    }

    if reply.ends_with(['.', '!', '?']) {
        reply.to_string()
    } else {
        format!("{}.", reply)
    }
}
