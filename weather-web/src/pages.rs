//! HTML pages. Markup is produced elsewhere and dropped into `pages_dir`.

use std::path::Path;

use axum::response::Html;

pub async fn render(pages_dir: &Path, name: &str) -> Html<String> {
    let file = pages_dir.join(format!("{name}.html"));
    match tokio::fs::read_to_string(&file).await {
        Ok(html) => Html(html),
        Err(e) => {
            tracing::debug!(file = %file.display(), error = %e, "page template unavailable, serving placeholder");
            Html(placeholder(name))
        }
    }
}

fn placeholder(name: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>Weather - {name}</title>\
         <script src=\"/static/script.js\" defer></script></head>\
         <body data-page=\"{name}\"></body></html>\n"
    )
}
