use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Intermediate representation of a parsed markdown block.
/// Rendered to terminal lines by [`render_markdown`], and directly testable.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkdownBlock {
    Paragraph(Vec<Span<'static>>),
    Heading {
        level: u8,
        spans: Vec<Span<'static>>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    List(Vec<ListItem>),
    Quote(Vec<Span<'static>>),
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub depth: usize,
    pub marker: String,
    pub spans: Vec<Span<'static>>,
}

const CODE_STYLE: Style = Style::new().fg(Color::Yellow);
const LINK_STYLE: Style = Style::new().fg(Color::DarkGray);

/// Inline formatting currently open while walking the event stream.
#[derive(Default)]
struct InlineState {
    bold: usize,
    italic: usize,
    strike: usize,
}

impl InlineState {
    fn style(&self) -> Style {
        let mut style = Style::default();
        if self.bold > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strike > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        style
    }
}

/// Parse markdown into intermediate blocks with styled spans.
pub fn markdown_to_blocks(content: &str) -> Vec<MarkdownBlock> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(content, options);
    let mut blocks = Vec::new();
    let mut inline_buf: Vec<Span<'static>> = Vec::new();
    let mut inline = InlineState::default();

    let mut in_code_block: Option<Option<String>> = None;
    let mut code_buf = String::new();
    // One entry per open list: the next number for ordered lists
    let mut list_stack: Vec<Option<u64>> = Vec::new();
    let mut list_items: Vec<ListItem> = Vec::new();
    let mut item_marker: Option<String> = None;
    let mut in_quote = false;
    let mut link_url: Option<String> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Paragraph) if list_stack.is_empty() => inline_buf.clear(),
            Event::Start(Tag::Heading { .. }) => inline_buf.clear(),
            Event::Start(Tag::CodeBlock(kind)) => {
                code_buf.clear();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let language = info.trim().to_string();
                        if language.is_empty() {
                            None
                        } else {
                            Some(language)
                        }
                    }
                    CodeBlockKind::Indented => None,
                };
                in_code_block = Some(language);
            }
            Event::Start(Tag::List(start)) => {
                // A nested list ends the text of the enclosing item
                if let Some(depth) = list_stack.len().checked_sub(1) {
                    flush_item(&mut list_items, &mut item_marker, &mut inline_buf, depth);
                }
                list_stack.push(start);
            }
            Event::Start(Tag::Item) => {
                inline_buf.clear();
                let marker = match list_stack.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{next}.");
                        *next += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                item_marker = Some(marker);
            }
            Event::Start(Tag::BlockQuote(_)) => in_quote = true,
            Event::Start(Tag::Emphasis) => inline.italic += 1,
            Event::End(TagEnd::Emphasis) => inline.italic = inline.italic.saturating_sub(1),
            Event::Start(Tag::Strong) => inline.bold += 1,
            Event::End(TagEnd::Strong) => inline.bold = inline.bold.saturating_sub(1),
            Event::Start(Tag::Strikethrough) => inline.strike += 1,
            Event::End(TagEnd::Strikethrough) => inline.strike = inline.strike.saturating_sub(1),
            Event::Start(Tag::Link { dest_url, .. }) => {
                link_url = Some(dest_url.to_string());
            }
            Event::End(TagEnd::Link) => {
                if let Some(url) = link_url.take() {
                    inline_buf.push(Span::styled(format!(" ({url})"), LINK_STYLE));
                }
            }
            Event::Text(text) => {
                if in_code_block.is_some() {
                    code_buf.push_str(&text);
                } else {
                    inline_buf.push(Span::styled(text.into_string(), inline.style()));
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                if in_code_block.is_some() {
                    code_buf.push_str(&html);
                } else {
                    inline_buf.push(Span::styled(html.into_string(), inline.style()));
                }
            }
            Event::Code(code) => {
                inline_buf.push(Span::styled(code.into_string(), CODE_STYLE));
            }
            Event::SoftBreak | Event::HardBreak => {
                if in_code_block.is_some() {
                    code_buf.push('\n');
                } else {
                    inline_buf.push(Span::raw(" "));
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if !list_stack.is_empty() {
                    // Loose list items wrap their text in paragraphs
                    inline_buf.push(Span::raw(" "));
                    continue;
                }
                let spans = std::mem::take(&mut inline_buf);
                if spans.is_empty() {
                    continue;
                }
                if in_quote {
                    blocks.push(MarkdownBlock::Quote(spans));
                } else {
                    blocks.push(MarkdownBlock::Paragraph(spans));
                }
            }
            Event::End(TagEnd::Heading(level)) => {
                blocks.push(MarkdownBlock::Heading {
                    level: level as u8,
                    spans: std::mem::take(&mut inline_buf),
                });
            }
            Event::End(TagEnd::CodeBlock) => {
                let code = code_buf.trim_end_matches('\n').to_string();
                let language = in_code_block.take().flatten();
                blocks.push(MarkdownBlock::CodeBlock { language, code });
            }
            Event::End(TagEnd::Item) => {
                let depth = list_stack.len().saturating_sub(1);
                while inline_buf.last().is_some_and(|span| span.content == " ") {
                    inline_buf.pop();
                }
                flush_item(&mut list_items, &mut item_marker, &mut inline_buf, depth);
            }
            Event::End(TagEnd::List(_)) => {
                list_stack.pop();
                if list_stack.is_empty() {
                    blocks.push(MarkdownBlock::List(std::mem::take(&mut list_items)));
                }
            }
            Event::End(TagEnd::BlockQuote(_)) => in_quote = false,
            Event::Rule => blocks.push(MarkdownBlock::Rule),
            _ => {}
        }
    }

    blocks
}

fn flush_item(
    list_items: &mut Vec<ListItem>,
    marker: &mut Option<String>,
    spans: &mut Vec<Span<'static>>,
    depth: usize,
) {
    if let Some(marker) = marker.take() {
        list_items.push(ListItem {
            depth,
            marker,
            spans: std::mem::take(spans),
        });
    }
}

/// Render markdown into terminal lines, one blank line between blocks.
pub fn render_markdown(content: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, block) in markdown_to_blocks(content).into_iter().enumerate() {
        if index > 0 {
            lines.push(Line::default());
        }
        render_block(&mut lines, block);
    }
    lines
}

fn render_block(lines: &mut Vec<Line<'static>>, block: MarkdownBlock) {
    match block {
        MarkdownBlock::Paragraph(spans) => lines.push(Line::from(spans)),
        MarkdownBlock::Heading { level, spans } => {
            let mut style = Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD);
            if level == 1 {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            let spans = spans
                .into_iter()
                .map(|span| {
                    let merged = style.patch(span.style);
                    span.style(merged)
                })
                .collect::<Vec<_>>();
            lines.push(Line::from(spans));
        }
        MarkdownBlock::CodeBlock { language, code } => {
            let border = Style::new().fg(Color::DarkGray);
            let label = language.unwrap_or_default();
            lines.push(Line::from(Span::styled(format!("┌─ {label}"), border)));
            for code_line in code.lines() {
                lines.push(Line::from(vec![
                    Span::styled("│ ", border),
                    Span::styled(code_line.to_string(), CODE_STYLE),
                ]));
            }
            lines.push(Line::from(Span::styled("└─", border)));
        }
        MarkdownBlock::List(items) => {
            for item in items {
                let mut spans = vec![Span::raw(format!(
                    "{}{} ",
                    "  ".repeat(item.depth),
                    item.marker
                ))];
                spans.extend(item.spans);
                lines.push(Line::from(spans));
            }
        }
        MarkdownBlock::Quote(spans) => {
            let mut quoted = vec![Span::styled("▎ ", Style::new().fg(Color::DarkGray))];
            quoted.extend(
                spans
                    .into_iter()
                    .map(|span| {
                        let merged = span.style.add_modifier(Modifier::ITALIC);
                        span.style(merged)
                    }),
            );
            lines.push(Line::from(quoted));
        }
        MarkdownBlock::Rule => {
            lines.push(Line::from(Span::styled(
                "─".repeat(24),
                Style::new().fg(Color::DarkGray),
            )));
        }
    }
}

/// Contents of every fenced or indented code block, in order.
pub fn code_blocks(content: &str) -> Vec<String> {
    markdown_to_blocks(content)
        .into_iter()
        .filter_map(|block| match block {
            MarkdownBlock::CodeBlock { code, .. } => Some(code),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(spans: &[Span<'_>]) -> String {
        spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_paragraph_keeps_emphasis_styles() {
        let blocks = markdown_to_blocks("Try **data science** or *teaching*.");
        let [MarkdownBlock::Paragraph(spans)] = blocks.as_slice() else {
            panic!("expected one paragraph, got {blocks:?}");
        };

        assert_eq!(plain(spans), "Try data science or teaching.");
        let bold = spans.iter().find(|s| s.content == "data science").unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        let italic = spans.iter().find(|s| s.content == "teaching").unwrap();
        assert!(italic.style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn test_heading_level() {
        let blocks = markdown_to_blocks("## Careers in physics");
        assert!(matches!(
            &blocks[0],
            MarkdownBlock::Heading { level: 2, spans } if plain(spans) == "Careers in physics"
        ));
    }

    #[test]
    fn test_fenced_code_block_with_language() {
        let blocks = markdown_to_blocks("```python\nprint('hi')\n```");
        assert_eq!(
            blocks,
            vec![MarkdownBlock::CodeBlock {
                language: Some("python".into()),
                code: "print('hi')".into(),
            }]
        );
    }

    #[test]
    fn test_ordered_and_nested_lists() {
        let blocks = markdown_to_blocks("1. Research\n2. Teaching\n   - High school\n3. Data");
        let [MarkdownBlock::List(items)] = blocks.as_slice() else {
            panic!("expected one list, got {blocks:?}");
        };

        let summary: Vec<_> = items
            .iter()
            .map(|item| (item.depth, item.marker.as_str(), plain(&item.spans)))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, "1.", "Research".to_string()),
                (0, "2.", "Teaching".to_string()),
                (1, "•", "High school".to_string()),
                (0, "3.", "Data".to_string()),
            ]
        );
    }

    #[test]
    fn test_render_separates_blocks_with_blank_line() {
        let lines = render_markdown("First\n\nSecond");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].spans.is_empty());
    }

    #[test]
    fn test_code_blocks_are_extracted_in_order() {
        let text = "Intro\n\n```\nfirst\n```\n\nMiddle\n\n```rust\nsecond\n```";
        assert_eq!(code_blocks(text), vec!["first", "second"]);
    }

    #[test]
    fn test_partial_markdown_still_renders() {
        // A reply cut mid-reveal may leave constructs unterminated
        let lines = render_markdown("Some **bold te");
        assert_eq!(lines.len(), 1);
        let text: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "Some **bold te");
    }
}
