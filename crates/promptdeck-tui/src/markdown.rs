//! Markdown rendering for the terminal.
//!
//! Converts a markdown body into styled ratatui lines and pulls fenced code
//! blocks out into a side list so the UI can offer one-click copy of the
//! raw code rather than the surrounding markdown.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const HEADING: Color = Color::Rgb(238, 121, 72);
const TEXT: Color = Color::Rgb(238, 238, 238);
const TEXT_MUTED: Color = Color::Rgb(128, 128, 128);
const CODE: Color = Color::Rgb(229, 192, 123);

/// A fenced code block extracted from the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag from the fence, empty when unspecified.
    pub language: String,
    /// Raw code without the fences or trailing newline.
    pub code: String,
}

/// Result of rendering one markdown document.
#[derive(Debug, Clone, Default)]
pub struct RenderedMarkdown {
    /// Styled lines ready for a `Paragraph`.
    pub lines: Vec<Line<'static>>,
    /// Fenced code blocks in document order.
    pub code_blocks: Vec<CodeBlock>,
}

/// Running parser state while walking markdown events.
struct Renderer {
    lines: Vec<Line<'static>>,
    code_blocks: Vec<CodeBlock>,
    spans: Vec<Span<'static>>,
    bold: u8,
    italic: u8,
    in_block_quote: u8,
    code_block: Option<CodeBlock>,
    list_stack: Vec<Option<u64>>,
}

/// Render a markdown body into terminal lines plus extracted code blocks.
pub fn render(source: &str) -> RenderedMarkdown {
    let mut renderer = Renderer {
        lines: Vec::new(),
        code_blocks: Vec::new(),
        spans: Vec::new(),
        bold: 0,
        italic: 0,
        in_block_quote: 0,
        code_block: None,
        list_stack: Vec::new(),
    };

    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH);
    for event in parser {
        renderer.apply(event);
    }
    renderer.flush_line();

    RenderedMarkdown {
        lines: renderer.lines,
        code_blocks: renderer.code_blocks,
    }
}

impl Renderer {
    fn apply(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some(block) = &mut self.code_block {
                    block.code.push_str(&text);
                } else {
                    self.push_text(&text);
                }
            }
            Event::Code(code) => {
                self.spans.push(Span::styled(
                    code.to_string(),
                    Style::default().fg(CODE),
                ));
            }
            Event::SoftBreak | Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.lines.push(Line::from(Span::styled(
                    "────────",
                    Style::default().fg(TEXT_MUTED),
                )));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { .. } => {
                self.blank_separator();
                self.bold += 1;
            }
            Tag::Paragraph => {
                if self.list_stack.is_empty() {
                    self.blank_separator();
                }
            }
            Tag::BlockQuote(..) => {
                self.blank_separator();
                self.in_block_quote += 1;
            }
            Tag::CodeBlock(kind) => {
                self.blank_separator();
                let language = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code_block = Some(CodeBlock {
                    language,
                    code: String::new(),
                });
            }
            Tag::List(start) => {
                if self.list_stack.is_empty() {
                    self.blank_separator();
                }
                self.list_stack.push(start);
            }
            Tag::Item => {
                self.flush_line();
                let depth = self.list_stack.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                let marker = match self.list_stack.last_mut() {
                    Some(Some(index)) => {
                        let marker = format!("{indent}{index}. ");
                        *index += 1;
                        marker
                    }
                    _ => format!("{indent}- "),
                };
                self.spans
                    .push(Span::styled(marker, Style::default().fg(TEXT_MUTED)));
            }
            Tag::Emphasis => self.italic += 1,
            Tag::Strong => self.bold += 1,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(..) => {
                self.bold = self.bold.saturating_sub(1);
                self.flush_line();
            }
            TagEnd::Paragraph => self.flush_line(),
            TagEnd::BlockQuote(..) => {
                self.in_block_quote = self.in_block_quote.saturating_sub(1);
                self.flush_line();
            }
            TagEnd::CodeBlock => {
                if let Some(mut block) = self.code_block.take() {
                    if block.code.ends_with('\n') {
                        block.code.pop();
                    }
                    self.emit_code_block(&block);
                    self.code_blocks.push(block);
                }
            }
            TagEnd::List(_) => {
                self.list_stack.pop();
                self.flush_line();
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            _ => {}
        }
    }

    /// Push styled text into the current line.
    fn push_text(&mut self, text: &str) {
        let mut style = Style::default().fg(if self.bold > 0 { HEADING } else { TEXT });
        if self.bold > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.in_block_quote > 0 {
            style = Style::default().fg(TEXT_MUTED).add_modifier(Modifier::ITALIC);
        }
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.spans.push(Span::styled(first.to_string(), style));
            for part in parts {
                self.flush_line();
                self.spans.push(Span::styled(part.to_string(), style));
            }
        }
    }

    /// Render a finished code block into the line stream with a label.
    fn emit_code_block(&mut self, block: &CodeBlock) {
        let index = self.code_blocks.len() + 1;
        let label = if block.language.is_empty() {
            format!("── code [{index}] ──")
        } else {
            format!("── code [{index}] {} ──", block.language)
        };
        self.lines
            .push(Line::from(Span::styled(label, Style::default().fg(TEXT_MUTED))));
        for line in block.code.lines() {
            self.lines.push(Line::from(Span::styled(
                format!("  {line}"),
                Style::default().fg(CODE),
            )));
        }
    }

    /// Complete the current line, if any content is pending.
    fn flush_line(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut spans = std::mem::take(&mut self.spans);
        if self.in_block_quote > 0 {
            spans.insert(0, Span::styled("│ ", Style::default().fg(TEXT_MUTED)));
        }
        self.lines.push(Line::from(spans));
    }

    /// Insert a blank line between top-level blocks.
    fn blank_separator(&mut self) {
        self.flush_line();
        if !self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::render;
    use pretty_assertions::assert_eq;

    #[test]
    fn fenced_code_blocks_are_extracted_raw() {
        let rendered = render(
            "Intro text.\n\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```\n\nOutro.\n",
        );
        assert_eq!(rendered.code_blocks.len(), 1);
        let block = &rendered.code_blocks[0];
        assert_eq!(block.language, "rust");
        assert_eq!(block.code, "fn main() {\n    println!(\"hi\");\n}");
        // The fences themselves never reach the copyable code.
        assert!(!block.code.contains("```"));
    }

    #[test]
    fn multiple_blocks_keep_document_order() {
        let rendered = render("```\nfirst\n```\n\ntext\n\n```sh\nsecond\n```\n");
        let codes: Vec<&str> = rendered
            .code_blocks
            .iter()
            .map(|block| block.code.as_str())
            .collect();
        assert_eq!(codes, vec!["first", "second"]);
        assert_eq!(rendered.code_blocks[0].language, "");
        assert_eq!(rendered.code_blocks[1].language, "sh");
    }

    #[test]
    fn plain_text_renders_lines() {
        let rendered = render("# Title\n\nBody paragraph.\n");
        let text: Vec<String> = rendered
            .lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect();
        assert!(text.iter().any(|line| line == "Title"));
        assert!(text.iter().any(|line| line == "Body paragraph."));
    }

    #[test]
    fn list_items_get_markers() {
        let rendered = render("- one\n- two\n");
        let text: Vec<String> = rendered
            .lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect();
        assert!(text.iter().any(|line| line == "- one"));
        assert!(text.iter().any(|line| line == "- two"));
    }
}
