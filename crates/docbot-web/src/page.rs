//! HTML rendering for the chat page

use crate::session::SessionState;

const AVATAR_URL: &str = "https://www.gravatar.com/avatar/00000000000000000000000000000000?d=mp&f=y";

const BASE_STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; display: flex; min-height: 100vh; }
aside { width: 240px; padding: 24px; background: #f0f2f6; }
aside img { border-radius: 50%; }
main { flex: 1; padding: 24px 48px; max-width: 860px; }
.message { padding: 12px 16px; margin: 8px 0; border-radius: 8px; white-space: pre-wrap; }
.message.user { background: #e8f0fe; }
.message.assistant { background: #f7f7f9; }
.error { padding: 12px 16px; border-radius: 8px; background: #fdecea; color: #611a15; }
footer { text-align: center; padding: 20px; color: #666; }
"#;

/// Everything a page render needs
pub struct PageView<'a> {
    pub session: &'a SessionState,
    pub stylesheet: Option<&'a str>,
    pub error: Option<&'a str>,
}

/// Escape text for use inside HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_sidebar(session: &SessionState) -> String {
    format!(
        r#"<aside>
<h2>User Profile</h2>
<img src="{avatar}" width="100" alt="avatar">
<h3>John Doe</h3>
<small>john.doe@example.com</small>
<hr>
<p><strong>Chat Stats</strong></p>
<p>Total Messages: {total}</p>
<form method="post" action="/logout"><button type="submit">Logout</button></form>
</aside>"#,
        avatar = escape_html(AVATAR_URL),
        total = session.total_messages(),
    )
}

fn render_exchanges(session: &SessionState) -> String {
    session
        .exchanges()
        .map(|(prompt, answer)| {
            format!(
                "<div class=\"message user\">{}</div>\n<div class=\"message assistant\">{}</div>",
                escape_html(prompt),
                escape_html(answer)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the whole chat page
pub fn render_page(view: &PageView<'_>) -> String {
    let custom_style = view
        .stylesheet
        .map(|css| format!("<style>{}</style>", css))
        .unwrap_or_default();

    let error = view
        .error
        .map(|message| format!("<div class=\"error\">{}</div>", escape_html(message)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>DocBot</title>
<style>{base}</style>
{custom}
</head>
<body>
{sidebar}
<main>
<h1>Ask Anything About LangChain</h1>
<form method="post" action="/ask">
<input type="text" name="prompt" aria-label="prompt" placeholder="Enter a prompt here..." autofocus>
</form>
{error}
<section class="chat">
{exchanges}
</section>
<hr>
<footer>Made with ❤️ using LangChain and Rust</footer>
</main>
</body>
</html>
"#,
        base = BASE_STYLE,
        custom = custom_style,
        sidebar = render_sidebar(view.session),
        error = error,
        exchanges = render_exchanges(view.session),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_page_shows_exchanges_escaped() {
        let mut session = SessionState::new();
        session.record("<b>q</b>", "answer".to_string(), "answer");

        let html = render_page(&PageView {
            session: &session,
            stylesheet: None,
            error: None,
        });

        assert!(html.contains("&lt;b&gt;q&lt;/b&gt;"));
        assert!(html.contains("Total Messages: 2"));
        assert!(!html.contains("class=\"error\""));
    }

    #[test]
    fn test_page_inlines_stylesheet_and_error() {
        let session = SessionState::new();
        let html = render_page(&PageView {
            session: &session,
            stylesheet: Some("body { color: lime; }"),
            error: Some("service unavailable"),
        });

        assert!(html.contains("<style>body { color: lime; }</style>"));
        assert!(html.contains("<div class=\"error\">service unavailable</div>"));
        assert!(html.contains("Total Messages: 0"));
    }
}
