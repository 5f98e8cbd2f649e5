//! Embeddable chat widget
//!
//! A self-contained HTML fragment (markup plus inline script) that posts each
//! message to the query endpoint and appends the reply to a scrolling log.
//! Nothing is persisted; the conversation lives in the page's DOM.

const WIDGET_TEMPLATE: &str = include_str!("../assets/widget.html");
const ENDPOINT_PLACEHOLDER: &str = "__RAG_CHATBOT_ENDPOINT__";

/// Render the widget fragment posting to `endpoint`.
pub fn render_widget(endpoint: &str) -> String {
    WIDGET_TEMPLATE.replace(ENDPOINT_PLACEHOLDER, &js_string_literal(endpoint))
}

/// Minimal host page embedding the widget fragment.
pub fn render_page(widget: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>RAG Chatbot</title>\n\
         </head>\n\
         <body>\n\
         {}\n\
         </body>\n\
         </html>\n",
        widget
    )
}

/// Quote `value` as a JavaScript string that is also safe inside `<script>`.
fn js_string_literal(value: &str) -> String {
    serde_json::Value::from(value)
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}
