//! The comparison page.

use axum::response::Html;

/// GET /
///
/// A single embedded page; everything else it needs comes from the JSON
/// API and the asset routes.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/lab.html"))
}
