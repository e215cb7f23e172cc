//! Convert the bus's lightweight markup to platform HTML.
//!
//! Target platforms accept a small HTML subset: `<b>`, `<i>`, `<s>`,
//! `<code>`, `<pre>`, `<a href="">`. Headers become bold lines, list
//! bullets become `•`, and everything else passes through escaped.
//!
//! Escaping is entity-aware: reserved characters are escaped before markup
//! tags are inserted, and already-escaped entities are left alone, so
//! running the translation over its own output never double-escapes.

/// Render markup to platform HTML.
pub fn render_html(md: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut fence_lang = String::new();
    let mut fence_body = String::new();

    for line in md.split('\n') {
        if let Some(tag) = line.trim_start().strip_prefix("```") {
            if in_fence {
                blocks.push(render_fence(&fence_lang, &fence_body));
                in_fence = false;
            } else {
                in_fence = true;
                fence_lang = tag.trim().to_owned();
                fence_body.clear();
            }
            continue;
        }
        if in_fence {
            fence_body.push_str(line);
            fence_body.push('\n');
            continue;
        }
        blocks.push(render_line(line));
    }

    // Unterminated fence (common when content was chunked mid-block):
    // still emit balanced tags.
    if in_fence {
        blocks.push(render_fence(&fence_lang, &fence_body));
    }

    blocks.join("\n")
}

fn render_fence(lang: &str, body: &str) -> String {
    let body = escape_html(body.strip_suffix('\n').unwrap_or(body));
    if lang.is_empty() {
        format!("<pre>{body}</pre>")
    } else {
        format!("<pre><code class=\"language-{lang}\">{body}</code></pre>")
    }
}

/// Render one non-fence line: header and bullet forms first, then inline
/// markup.
fn render_line(line: &str) -> String {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        let level = trimmed.chars().take_while(|&c| c == '#').count();
        if level <= 6
            && let Some(text) = trimmed[level..].strip_prefix(' ')
        {
            return format!("<b>{}</b>", render_inline(text));
        }
    }
    for bullet in ["- ", "* "] {
        if let Some(item) = trimmed.strip_prefix(bullet) {
            let indent = &line[..line.len() - trimmed.len()];
            return format!("{indent}• {}", render_inline(item));
        }
    }
    render_inline(line)
}

/// Render inline constructs (bold, italic, strikethrough, code, links).
/// Reserved characters are escaped before tags are inserted.
///
/// Italic is a single `*` pair only; underscores are never markup, so
/// intra-word tokens like `agent_id=main` pass through untouched.
fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let mut chars = escaped.chars().peekable();
    let mut out = String::with_capacity(escaped.len());
    let mut in_code = false;

    while let Some(&ch) = chars.peek() {
        // Inline code: `
        if ch == '`' {
            chars.next();
            out.push_str(if in_code { "</code>" } else { "<code>" });
            in_code = !in_code;
            continue;
        }

        // Inside inline code, don't process markup
        if in_code {
            if let Some(c) = chars.next() {
                out.push(c);
            }
            continue;
        }

        // Strikethrough: ~~
        if ch == '~' && peek_n(&mut chars, 2) == "~~" {
            chars.next();
            chars.next();
            let content = take_until(&mut chars, "~~");
            out.push_str("<s>");
            out.push_str(&content);
            out.push_str("</s>");
            continue;
        }

        // Bold: **
        if ch == '*' && peek_n(&mut chars, 2) == "**" {
            chars.next();
            chars.next();
            let content = take_until(&mut chars, "**");
            out.push_str("<b>");
            out.push_str(&content);
            out.push_str("</b>");
            continue;
        }

        // Italic: * (single)
        if ch == '*' {
            chars.next();
            let content = take_until(&mut chars, "*");
            out.push_str("<i>");
            out.push_str(&content);
            out.push_str("</i>");
            continue;
        }

        // Link: [text](url)
        if ch == '[' {
            chars.next();
            let mut label = String::new();
            let mut found_close = false;
            while let Some(&c) = chars.peek() {
                chars.next();
                if c == ']' {
                    found_close = true;
                    break;
                }
                label.push(c);
            }
            if found_close && chars.peek() == Some(&'(') {
                chars.next();
                let mut url = String::new();
                while let Some(&c) = chars.peek() {
                    chars.next();
                    if c == ')' {
                        break;
                    }
                    url.push(c);
                }
                out.push_str(&format!("<a href=\"{url}\">{label}</a>"));
            } else {
                out.push('[');
                out.push_str(&label);
                if found_close {
                    out.push(']');
                }
            }
            continue;
        }

        if let Some(c) = chars.next() {
            out.push(c);
        }
    }

    // Never leave an unterminated inline code tag when input ends without a
    // closing backtick (happens when content was split).
    if in_code {
        out.push_str("</code>");
    }

    out
}

/// Consume characters up to and including `delim`; returns the content
/// before it. Stops at end of input if the delimiter never appears.
fn take_until(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, delim: &str) -> String {
    let mut content = String::new();
    loop {
        if chars.peek().is_none() {
            break;
        }
        if peek_n(chars, delim.chars().count()) == delim {
            for _ in delim.chars() {
                chars.next();
            }
            break;
        }
        let Some(c) = chars.next() else {
            break;
        };
        content.push(c);
    }
    content
}

/// Peek at the next `n` characters without consuming them.
fn peek_n(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, n: usize) -> String {
    chars.clone().take(n).collect()
}

/// Escape HTML special characters, leaving existing entities intact so
/// escaping is idempotent.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, ch) in text.char_indices() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if !starts_entity(&text[i..]) => out.push_str("&amp;"),
            c => out.push(c),
        }
    }
    out
}

fn starts_entity(s: &str) -> bool {
    ["&amp;", "&lt;", "&gt;", "&quot;", "&#"]
        .iter()
        .any(|entity| s.starts_with(entity))
}
