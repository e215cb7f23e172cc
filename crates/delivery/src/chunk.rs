//! Split long outbound text into platform-sized chunks.
//!
//! Splitting happens on line boundaries. Open code fences are closed at
//! the end of a chunk and reopened (with the same language tag) at the
//! start of the next, so each chunk renders as valid markup on its own.

const FENCE: &str = "```";

/// Headroom reserved below the platform limit for markup expansion
/// during rendering.
const CHUNK_MARGIN: usize = 64;

/// Split `text` into chunks no longer than `limit` bytes.
///
/// Returns an empty vector for empty input or a zero limit. A single line
/// longer than the limit is hard-split at a character boundary.
pub fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    if text.is_empty() || limit == 0 {
        return Vec::new();
    }
    let budget = if limit > CHUNK_MARGIN * 2 {
        limit - CHUNK_MARGIN
    } else {
        limit
    };

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    // Language tag of the currently open fence, if any.
    let mut open_fence: Option<String> = None;

    for raw_line in text.split('\n') {
        for line in split_long_line(raw_line, budget) {
            let sep = usize::from(!current.is_empty());
            let close_cost = if open_fence.is_some() {
                FENCE.len() + 1
            } else {
                0
            };
            if !current.is_empty() && current.len() + sep + line.len() + close_cost > budget {
                flush(&mut chunks, &mut current, open_fence.as_deref());
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);

            if let Some(tag) = line.trim_start().strip_prefix(FENCE) {
                open_fence = match open_fence {
                    Some(_) => None,
                    None => Some(tag.trim().to_owned()),
                };
            }
        }
    }

    if !current.is_empty() {
        // Balance a fence the input itself left open.
        if open_fence.is_some() {
            current.push('\n');
            current.push_str(FENCE);
        }
        chunks.push(current);
    }
    chunks
}

/// Close the open fence (if any), emit the chunk, and seed the next chunk
/// with a reopening fence carrying the same language tag.
fn flush(chunks: &mut Vec<String>, current: &mut String, open_fence: Option<&str>) {
    match open_fence {
        Some(lang) => {
            current.push('\n');
            current.push_str(FENCE);
            chunks.push(std::mem::take(current));
            current.push_str(FENCE);
            current.push_str(lang);
        }
        None => chunks.push(std::mem::take(current)),
    }
}

/// Hard-split a single overlong line at character boundaries.
fn split_long_line(line: &str, budget: usize) -> Vec<&str> {
    if line.len() <= budget {
        return vec![line];
    }
    let mut pieces = Vec::new();
    let mut rest = line;
    while rest.len() > budget {
        let cut = rest.floor_char_boundary(budget);
        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fence_count(chunk: &str) -> usize {
        chunk
            .lines()
            .filter(|l| l.trim_start().starts_with(FENCE))
            .count()
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_chunks("hello", 4096), vec!["hello"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_chunks("", 4096).is_empty());
    }

    #[test]
    fn splits_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc\ndddd";
        let chunks = split_chunks(text, 10);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 10, "chunk too long: {chunk:?}");
        }
        let rejoined = chunks.join("\n");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn overlong_single_line_is_hard_split() {
        let text = "x".repeat(25);
        let chunks = split_chunks(&text, 10);
        assert!(chunks.iter().all(|c| c.len() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn hard_split_respects_char_boundaries() {
        let text = "é".repeat(30);
        let chunks = split_chunks(&text, 11);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn fences_are_balanced_in_every_chunk() {
        let mut text = String::from("intro\n```rust\n");
        for i in 0..40 {
            text.push_str(&format!("let x{i} = {i};\n"));
        }
        text.push_str("```\noutro");
        let chunks = split_chunks(&text, 120);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(
                fence_count(chunk) % 2,
                0,
                "unbalanced fence in chunk: {chunk:?}"
            );
        }
    }

    #[test]
    fn reopened_fence_keeps_language_tag() {
        let mut text = String::from("```python\n");
        for i in 0..40 {
            text.push_str(&format!("print({i})\n"));
        }
        text.push_str("```");
        let chunks = split_chunks(&text, 120);
        assert!(chunks.len() > 1);
        for chunk in &chunks[1..] {
            assert!(
                chunk.starts_with("```python\n"),
                "continuation chunk missing fence reopen: {chunk:?}"
            );
        }
    }

    #[test]
    fn input_with_unterminated_fence_gets_closed() {
        let chunks = split_chunks("```sh\necho hi", 4096);
        assert_eq!(chunks, vec!["```sh\necho hi\n```"]);
    }

    #[test]
    fn margin_reserved_under_large_limits() {
        let text = "a".repeat(4096);
        let chunks = split_chunks(&text, 4096);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 4096 - CHUNK_MARGIN));
    }
}
