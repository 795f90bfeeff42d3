//! Content renderer: deterministic transformation of one status into a
//! portable Markdown document.
//!
//! The intermediate representation is HTML. That is simpler than templating
//! Markdown directly (HTML has explicit start/end tags, and the status body
//! we get from Mastodon is already HTML), and the final conversion is done
//! by `html2md` so escaping and link formatting stay consistent. No network
//! access, no wall-clock reads: rendering the same status twice yields
//! byte-identical output.

use crate::mastodon::{Account, Attachment, Status, StatusContext};

/// The renderer's output. Independent of the status it was created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Markdown body, including the provenance footer when applicable.
    pub body: String,
}

/// Render one status (with its reshare context, if any) to Markdown.
pub fn render(item: &StatusContext) -> RenderedDocument {
    let status = &item.status;
    let status_url = item.local_url(status);

    let mut parts: Vec<String> = Vec::new();

    if let Some(reblog) = &status.reblog {
        // status_url is useless here: for a boost it always redirects to the
        // original post. Link the quoted "wrote" to the boosted status instead.
        let reblog_url = item.local_url(reblog);
        parts.push(format!(
            "<p>Boosted by {}:",
            account_link(item, &status.account)
        ));
        parts.push(format!(
            "<br>{} {}:",
            account_link(item, &reblog.account),
            link(&reblog_url, "wrote")
        ));
        parts.push("</p>".to_string());
        parts.push("<blockquote>".to_string());
        parts.push(reblog.content.clone());
        parts.push("</blockquote>".to_string());
    } else {
        parts.push(format!(
            "<p>{} {}:</p>",
            account_link(item, &status.account),
            link(&status_url, "wrote")
        ));
        parts.push("<blockquote>".to_string());
        parts.push(status.content.clone());
        parts.push("</blockquote>".to_string());
    }

    // Effective attachments: the boosted status's when this is a boost.
    let attachments: &[Attachment] = match &status.reblog {
        Some(reblog) => &reblog.media_attachments,
        None => &status.media_attachments,
    };

    // Link to attached media rather than inlining it; inlining would spend
    // the origin server's bandwidth on every view of the mirrored post.
    if !attachments.is_empty() {
        parts.push("<h3>Attachments:</h3>".to_string());
        parts.push("<ul>".to_string());
        for attachment in attachments {
            let text = attachment
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| url_basename(&attachment.url));
            let mut entry = link(&attachment.url, text);
            if let Some(remote) = &attachment.remote_url {
                entry.push_str(&format!(" ({})", link(remote, "remote")));
            }
            parts.push(format!("  <li>{entry}</li>"));
        }
        parts.push("</ul>".to_string());
    }

    let body = html2md::parse_html(&parts.join("\n")) + &footer(item);
    RenderedDocument { body }
}

/// An HTML link to an account's instance-local page, labeled with its handle
/// and, when it adds information, its display name.
fn account_link(item: &StatusContext, account: &Account) -> String {
    let url = item.local_account_url(account);
    let mut name = account.acct.clone();
    if let Some(display_name) = &account.display_name {
        if !display_name.is_empty() && !name.contains(display_name.as_str()) {
            name.push_str(&format!(" (\"{display_name}\")"));
        }
    }
    link(&url, &name)
}

/// Machine-readable provenance trailer, embedded as an HTML comment.
///
/// Emitted only when the instance-local URL and the origin URL differ. For
/// boosts the origin URL is a "reblog activity" reference, not a renderable
/// HTML page, so it gets a distinct label.
fn footer(item: &StatusContext) -> String {
    let local = item.local_url(&item.status);
    let origin = item.status.origin_url();
    if local == origin {
        return String::new();
    }
    let label = if item.status.reblog.is_some() {
        "reblog"
    } else {
        "origin"
    };
    // Leading blank line: the Markdown body might not end in a newline.
    format!("\n\n<!--\n{label}: {origin}\n-->")
}

/// Build an HTML anchor. Literal `<` in the text is entity-escaped and line
/// breaks are collapsed to a space: a newline inside link text corrupts the
/// Markdown conversion.
fn link(href: &str, text: &str) -> String {
    let text = text.replace('<', "&lt;").replace('\n', " ");
    format!("<a href=\"{href}\">{text}</a>")
}

/// Final path segment of a URL, used as fallback link text for attachments.
fn url_basename(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}
