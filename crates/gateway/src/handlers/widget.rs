//! Chat widget handlers

use axum::{extract::State, response::Html};

use crate::{widget, AppState};

/// Widget fragment for embedding in a host page
pub async fn widget(State(state): State<AppState>) -> Html<String> {
    Html(state.widget.as_str().to_owned())
}

/// Standalone page hosting the widget
pub async fn page(State(state): State<AppState>) -> Html<String> {
    Html(widget::render_page(&state.widget))
}
