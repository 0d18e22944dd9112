//! Server-rendered pages.
//!
//! Every page shares the same header and footer partials. Interpolated
//! values always go through [`escape`].

use axum::http::StatusCode;
use chrono::{Datelike, Utc};

use crate::models::Item;

/// HTML-escapes text for element content and quoted attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn header(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title} | To-Do List</title>
  <link rel="stylesheet" href="/css/styles.css">
</head>
<body>
"#,
        title = escape(title)
    )
}

fn footer() -> String {
    format!(
        r#"<footer>
  <a href="/about">About</a>
  <p>Copyright {year}</p>
</footer>
</body>
</html>
"#,
        year = Utc::now().year()
    )
}

/// Renders a list page: heading, one delete form per item, and the add form.
pub fn render_list(title: &str, items: &[Item]) -> String {
    let list_name = escape(title);
    let mut page = header(title);

    page.push_str(&format!(
        r#"<div class="box" id="heading">
  <h1>{list_name}</h1>
</div>
<div class="box">
"#
    ));

    for item in items {
        page.push_str(&format!(
            r#"  <form action="/delete" method="post">
    <div class="item">
      <input type="checkbox" name="checkbox" value="{id}" onChange="this.form.submit()">
      <p>{name}</p>
    </div>
    <input type="hidden" name="listName" value="{list_name}">
  </form>
"#,
            id = item.id,
            name = escape(&item.name),
        ));
    }

    page.push_str(&format!(
        r#"  <form class="item" action="/" method="post">
    <input type="text" name="newItem" placeholder="New Item" autocomplete="off" required>
    <button type="submit" name="list" value="{list_name}">+</button>
  </form>
</div>
"#
    ));

    page.push_str(&footer());
    page
}

pub fn render_about() -> String {
    let mut page = header("About");
    page.push_str(include_str!("../templates/about.html"));
    page.push_str(&footer());
    page
}

pub fn render_error(status: StatusCode, message: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("Error");
    let mut page = header(reason);
    page.push_str(&format!(
        r#"<div class="box" id="heading">
  <h1>{code} {reason}</h1>
</div>
<div class="box">
  <p>{message}</p>
  <p><a href="/">Back to Today</a></p>
</div>
"#,
        code = status.as_u16(),
        reason = escape(reason),
        message = escape(message),
    ));
    page.push_str(&footer());
    page
}
