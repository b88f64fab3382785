//! Output Limiter: dual line-and-byte truncation with UTF-8 boundary
//! preservation, head and tail modes.

/// Why a `TruncateResult` differs from its input, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncateReason {
    None,
    LineLimit,
    ByteLimit,
}

#[derive(Debug, Clone)]
pub struct TruncateResult {
    pub content: String,
    pub truncated: bool,
    pub total_lines: usize,
    pub total_bytes: usize,
    pub reason: TruncateReason,
}

/// Walk backward from `idx` (a byte offset into `s`) to the nearest char boundary.
fn floor_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Walk forward from `idx` (a byte offset into `s`) to the nearest char boundary.
fn ceil_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn truncate(content: &str, max_lines: usize, max_bytes: usize, keep_tail: bool) -> TruncateResult {
    let total_bytes = content.len();
    let lines: Vec<&str> = content.split('\n').collect();
    let total_lines = lines.len();

    let mut reason = TruncateReason::None;
    let mut truncated = false;

    let mut kept: String = if total_lines > max_lines && max_lines > 0 {
        truncated = true;
        reason = TruncateReason::LineLimit;
        let selected: &[&str] = if keep_tail {
            &lines[total_lines - max_lines..]
        } else {
            &lines[..max_lines]
        };
        selected.join("\n")
    } else {
        content.to_string()
    };

    if kept.len() > max_bytes {
        truncated = true;
        reason = TruncateReason::ByteLimit;
        kept = if keep_tail {
            let cut = ceil_char_boundary(&kept, kept.len() - max_bytes);
            kept[cut..].to_string()
        } else {
            let cut = floor_char_boundary(&kept, max_bytes);
            kept[..cut].to_string()
        };
    }

    TruncateResult {
        content: kept,
        truncated,
        total_lines,
        total_bytes,
        reason,
    }
}

/// Keep the first `max_lines`/`max_bytes` of `content`.
pub fn truncate_head(content: &str, max_lines: usize, max_bytes: usize) -> TruncateResult {
    truncate(content, max_lines, max_bytes, false)
}

/// Keep the last `max_lines`/`max_bytes` of `content` (preserves the end of
/// long logs — used for the bash tool's combined output).
pub fn truncate_tail(content: &str, max_lines: usize, max_bytes: usize) -> TruncateResult {
    truncate(content, max_lines, max_bytes, true)
}

/// Legacy helper for simple byte-count truncation with a trailing marker.
pub fn truncate_output(content: &str, n: usize) -> String {
    if content.len() <= n {
        return content.to_string();
    }
    let cut = floor_char_boundary(content, n);
    format!("{}\n... [output truncated]", &content[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_head_respects_line_limit() {
        let content = "a\nb\nc\nd\n";
        let r = truncate_head(content, 2, 1_000_000);
        assert_eq!(r.content, "a\nb");
        assert!(r.truncated);
        assert_eq!(r.reason, TruncateReason::LineLimit);
    }

    #[test]
    fn truncate_tail_keeps_last_lines() {
        let content = "a\nb\nc\nd";
        let r = truncate_tail(content, 2, 1_000_000);
        assert_eq!(r.content, "c\nd");
    }

    #[test]
    fn byte_limit_overrides_line_limit_reason() {
        let content = "aaaaaaaaaa\nbbbbbbbbbb\n";
        let r = truncate_head(content, 100, 5);
        assert_eq!(r.reason, TruncateReason::ByteLimit);
        assert!(r.content.len() <= 5);
    }

    #[test]
    fn never_splits_a_multibyte_char() {
        let content = "日本語のテキストです".repeat(50);
        for max_bytes in 1..40 {
            let r = truncate_head(&content, usize::MAX, max_bytes);
            assert!(r.content.len() <= max_bytes);
            assert!(std::str::from_utf8(r.content.as_bytes()).is_ok());
            let r = truncate_tail(&content, usize::MAX, max_bytes);
            assert!(r.content.len() <= max_bytes);
            assert!(std::str::from_utf8(r.content.as_bytes()).is_ok());
        }
    }

    #[test]
    fn legacy_truncate_output_appends_marker() {
        let out = truncate_output("hello world", 5);
        assert!(out.starts_with("hello"));
        assert!(out.ends_with("[output truncated]"));
    }
}
