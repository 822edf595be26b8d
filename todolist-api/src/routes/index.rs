/// Landing page
///
/// `GET /` serves a static HTML page describing the API. It needs no
/// authentication.

use axum::response::Html;

const INDEX_PAGE: &str = include_str!("../../templates/index.html");

/// Index page handler
pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_index_mentions_title() {
        let Html(page) = index().await;
        assert!(page.contains("List of tasks"));
        assert!(page.contains("/create_task"));
    }
}
