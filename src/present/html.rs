//! Single-page HTML rendering for the web interface.

use super::{AnswerSlot, AskReport, CardSlot, ResultCard};
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #222; }
form { display: flex; gap: .5rem; margin-bottom: 1.5rem; }
input[type=text] { flex: 1; padding: .5rem; }
.notice { color: #8a6d00; font-size: .9rem; }
.answer { background: #f5f7fa; border-radius: 6px; padding: 1rem; white-space: pre-wrap; }
.answer.failure { background: #fdf0f0; color: #9b1c1c; }
.cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); gap: 1rem; margin-top: 1.5rem; }
.card { border: 1px solid #ddd; border-radius: 6px; padding: .75rem; }
.card img { width: 100%; border-radius: 4px; }
.card.failed { color: #9b1c1c; font-size: .9rem; }
"#;

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the page: search form, guest selector, and the report if there is one.
pub fn render_page(
    show_name: &str,
    guests: &[String],
    selected_guest: Option<&str>,
    report: Option<&AskReport>,
) -> String {
    let mut body = String::new();
    let query = report.map(|r| r.query.as_str()).unwrap_or_default();

    let _ = write!(
        body,
        r#"<form method="get" action="/"><input type="text" name="q" placeholder="Ask a question" value="{}" autofocus><select name="guest"><option value="">All guests</option>"#,
        escape_html(query)
    );
    for guest in guests {
        let selected = if Some(guest.as_str()) == selected_guest {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            body,
            r#"<option value="{0}"{1}>{0}</option>"#,
            escape_html(guest),
            selected
        );
    }
    body.push_str(r#"</select><button type="submit">Search</button></form>"#);

    if let Some(report) = report {
        if let Some(notice) = &report.guest_notice {
            let _ = write!(body, r#"<p class="notice">{}</p>"#, escape_html(notice));
        }
        body.push_str(&render_answer(&report.answer));
        if !report.cards.is_empty() {
            body.push_str(r#"<div class="cards">"#);
            for slot in &report.cards {
                body.push_str(&render_slot(slot));
            }
            body.push_str("</div>");
        }
    }

    let title = escape_html(show_name);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\"><title>{0} search</title><style>{1}</style></head><body><h1>{0} search</h1>{2}</body></html>\n",
        title, STYLE, body
    )
}

fn render_answer(answer: &AnswerSlot) -> String {
    let class = if answer.is_failure() {
        "answer failure"
    } else {
        "answer"
    };
    format!(
        r#"<div class="{}" id="answer">{}</div>"#,
        class,
        escape_html(&answer.message())
    )
}

fn render_slot(slot: &CardSlot) -> String {
    match slot {
        CardSlot::Card(card) => render_card(card),
        CardSlot::Failed { index, reason } => format!(
            r#"<div class="card failed">Result {} could not be displayed: {}</div>"#,
            index,
            escape_html(reason)
        ),
    }
}

fn render_card(card: &ResultCard) -> String {
    format!(
        concat!(
            r#"<div class="card"><a href="{url}" target="_blank" rel="noopener">"#,
            r#"<img src="{thumb}" alt="{caption}"></a>"#,
            r#"<h3><a href="{url}" target="_blank" rel="noopener">{caption}</a></h3>"#,
            r#"<p>Guest: {guest}<br>Episode length: {duration}</p>"#,
            r#"<p>{content}</p></div>"#
        ),
        url = escape_html(&card.episode_url),
        thumb = escape_html(&card.thumbnail_url),
        caption = escape_html(&card.caption),
        guest = escape_html(&card.guest),
        duration = escape_html(&card.duration),
        content = escape_html(&card.content),
    )
}
