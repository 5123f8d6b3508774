//! Server-rendered pages for the browser lookup flow.

pub const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Order lookup</title>
</head>
<body>
  <h1>Order lookup</h1>
  <form method="POST" action="/postform">
    <label for="orderId">Order UID</label>
    <input type="text" id="orderId" name="orderId" autofocus>
    <button type="submit">Find</button>
  </form>
</body>
</html>
"#;

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"utf-8\">\n  <title>{title}</title>\n</head>\n<body>\n{body}\n  <p><a href=\"/\">New lookup</a></p>\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

/// Result page with the rendered order preformatted.
pub fn order_page(order_uid: &str, rendered: &str) -> String {
    page(
        &format!("Order {order_uid}"),
        &format!(
            "  <h1>Order {}</h1>\n  <pre>{}</pre>",
            escape_html(order_uid),
            escape_html(rendered)
        ),
    )
}

pub fn not_found_page(order_uid: &str) -> String {
    page(
        "Order not found",
        &format!("  <h1>Order not found</h1>\n  <p>No order with UID <code>{}</code>.</p>", escape_html(order_uid)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_in_ids_and_payloads() {
        let html = order_page("<script>", "{\"name\": \"A & B\"}");
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("A &amp; B"));
        assert!(html.contains("&quot;name&quot;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn form_posts_order_id_field() {
        assert!(FORM_PAGE.contains("action=\"/postform\""));
        assert!(FORM_PAGE.contains("name=\"orderId\""));
    }
}
