//! Plain-text cleanup applied after format-specific extraction.
//!
//! Everything here is pure string-to-string: the extractor pulls raw
//! text out of a PDF, markdown file, or transcript, then runs it
//! through these normalizers before chunking. Offsets recorded by the
//! chunker are offsets into the *normalized* text.

use regex::Regex;

/// Collapse extraction whitespace: CRLF/CR to LF, runs of three or
/// more newlines to a blank line, runs of spaces and tabs to a single
/// space, then trim.
pub fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    // Fixed patterns; compilation cannot fail.
    let many_newlines = Regex::new(r"\n{3,}").expect("valid pattern");
    let many_spaces = Regex::new(r"[ \t]{2,}").expect("valid pattern");
    let collapsed = many_newlines.replace_all(&unified, "\n\n");
    let collapsed = many_spaces.replace_all(&collapsed, " ");
    collapsed.trim().to_string()
}

/// Strip markdown syntax down to readable prose.
///
/// Fenced code blocks keep their inner text under a `[Code]` tag,
/// images reduce to `[Image: alt]`, links to their text, heading and
/// emphasis markers are dropped, and list bullets become `•`. The
/// result is whitespace-normalized like any other extraction.
pub fn strip_markdown(text: &str) -> String {
    let fenced = Regex::new(r"(?s)```[^\n]*\n?(.*?)```").expect("valid pattern");
    let image = Regex::new(r"!\[([^\]]*)\]\([^)]*\)").expect("valid pattern");
    let link = Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid pattern");
    let heading = Regex::new(r"(?m)^#{1,6}\s+").expect("valid pattern");
    let bullet = Regex::new(r"(?m)^(\s*)[-*+]\s+").expect("valid pattern");
    let bold = Regex::new(r"\*\*([^*]+)\*\*").expect("valid pattern");
    let bold_u = Regex::new(r"__([^_]+)__").expect("valid pattern");
    let italic = Regex::new(r"\*([^*\n]+)\*").expect("valid pattern");
    let italic_u = Regex::new(r"\b_([^_\n]+)_\b").expect("valid pattern");
    let inline_code = Regex::new(r"`([^`\n]+)`").expect("valid pattern");

    let text = fenced.replace_all(text, "[Code]\n$1");
    let text = image.replace_all(&text, "[Image: $1]");
    let text = link.replace_all(&text, "$1");
    let text = heading.replace_all(&text, "");
    let text = bullet.replace_all(&text, "$1• ");
    let text = bold.replace_all(&text, "$1");
    let text = bold_u.replace_all(&text, "$1");
    let text = italic.replace_all(&text, "$1");
    let text = italic_u.replace_all(&text, "$1");
    let text = inline_code.replace_all(&text, "$1");
    normalize_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_collapses_runs() {
        let input = "a  b\t\tc\n\n\n\nd\r\ne\rf";
        assert_eq!(normalize_whitespace(input), "a b c\n\nd\ne\nf");
    }

    #[test]
    fn whitespace_trims_ends() {
        assert_eq!(normalize_whitespace("  padded  "), "padded");
        assert_eq!(normalize_whitespace("\n\n\n"), "");
    }

    #[test]
    fn markdown_headings_and_emphasis_are_stripped() {
        let input = "# Title\n\nSome **bold** and *italic* and `code`.";
        assert_eq!(
            strip_markdown(input),
            "Title\n\nSome bold and italic and code."
        );
    }

    #[test]
    fn markdown_links_keep_text_images_keep_alt() {
        let input = "See [the docs](https://example.com) and ![a chart](img.png).";
        assert_eq!(strip_markdown(input), "See the docs and [Image: a chart].");
    }

    #[test]
    fn markdown_code_blocks_keep_inner_text() {
        let input = "Before\n\n```rust\nlet x = 1;\n```\n\nAfter";
        let out = strip_markdown(input);
        assert!(out.contains("[Code]\nlet x = 1;"));
        assert!(out.starts_with("Before"));
        assert!(out.ends_with("After"));
    }

    #[test]
    fn markdown_bullets_become_dots() {
        let input = "- first\n- second\n* third";
        assert_eq!(strip_markdown(input), "• first\n• second\n• third");
    }
}
