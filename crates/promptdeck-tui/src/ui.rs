//! Rendering routines for the promptdeck TUI.

use crate::app::{App, CopyTarget, Overlay, PURGE_CHOICES, View};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar,
    ScrollbarOrientation, ScrollbarState, Wrap,
};

const PRIMARY: Color = Color::Rgb(236, 91, 43);
const SECONDARY: Color = Color::Rgb(238, 121, 72);
const TEXT: Color = Color::Rgb(238, 238, 238);
const TEXT_MUTED: Color = Color::Rgb(128, 128, 128);
const BORDER: Color = Color::Rgb(60, 60, 60);
const BORDER_ACTIVE: Color = Color::Rgb(238, 121, 72);
const GREEN: Color = Color::Rgb(120, 220, 140);
const YELLOW: Color = Color::Rgb(229, 192, 123);

const HEADER_HEIGHT: u16 = 3;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Draw the entire TUI frame.
pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT), // header bar
            Constraint::Min(0),                // main content
            Constraint::Length(3),             // input / hint line
            Constraint::Length(1),             // status bar
        ])
        .split(area);

    draw_header(frame, app, root[0]);
    match app.view {
        View::Catalog => draw_catalog(frame, app, root[1]),
        View::Detail => draw_detail(frame, app, root[1]),
        View::Chat => draw_chat(frame, app, root[1]),
    }
    draw_input(frame, app, root[2]);
    draw_status_bar(frame, app, root[3]);

    match app.overlay {
        Some(Overlay::Settings) => draw_settings(frame, app, area),
        Some(Overlay::CredentialPrompt) => draw_credential_prompt(frame, app, area),
        Some(Overlay::ConfirmClearChat) => draw_confirm(
            frame,
            area,
            " Clear Chat History ",
            "Are you sure you want to clear the chat history? This action cannot be undone.",
        ),
        Some(Overlay::ConfirmPurge) => {
            let choice = PURGE_CHOICES[app.purge_index];
            let message = format!(
                "Are you sure you want to delete chat histories ({})? This action cannot be undone.",
                choice.label()
            );
            draw_confirm(frame, area, " Purge Chats ", &message);
        }
        None => {}
    }
}

/// Draw the header with the app name and the current context.
fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let label_style = Style::default().fg(TEXT_MUTED);
    let value_style = Style::default().fg(TEXT);
    let mut spans = vec![
        Span::styled(
            " promptdeck ",
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("v{VERSION}  "), label_style),
    ];

    match app.view {
        View::Catalog => {
            spans.push(Span::styled("prompts ", label_style));
            spans.push(Span::styled(app.filtered().len().to_string(), value_style));
            spans.push(Span::styled("  sort ", label_style));
            spans.push(Span::styled(app.sort.label(), value_style));
            spans.push(Span::styled("  category ", label_style));
            let category = app.selected_category();
            spans.push(Span::styled(
                if category.is_empty() { "all" } else { category }.to_string(),
                value_style,
            ));
        }
        View::Detail | View::Chat => {
            if let Some(slug) = &app.detail_slug {
                let title = app
                    .prompts
                    .iter()
                    .find(|prompt| &prompt.slug == slug)
                    .map(|prompt| prompt.title.clone())
                    .unwrap_or_else(|| slug.clone());
                spans.push(Span::styled(title, value_style));
                spans.push(Span::styled("  votes ", label_style));
                let count = app.upvotes.get(slug).copied().unwrap_or(0);
                spans.push(Span::styled(count.to_string(), value_style));
            }
            if app.view == View::Chat {
                spans.push(Span::styled("  chat", Style::default().fg(SECONDARY)));
            }
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

/// Draw the catalog list with upvote counts and descriptions.
fn draw_catalog(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Prompts ", Style::default().fg(TEXT_MUTED)));

    let filtered = app.filtered();
    if filtered.is_empty() {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let message = match &app.catalog_error {
            Some(error) => format!(" Failed to load prompts: {error}"),
            None => " No prompts match the current filters.".to_string(),
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                message,
                Style::default().fg(TEXT_MUTED),
            ))),
            inner,
        );
        return;
    }

    let items: Vec<ListItem> = filtered
        .iter()
        .map(|prompt| {
            let count = app.upvotes.get(&prompt.slug).copied().unwrap_or(0);
            let line = Line::from(vec![
                Span::styled(
                    format!(" ▲{count:<4}"),
                    Style::default().fg(SECONDARY),
                ),
                Span::styled(
                    prompt.title.clone(),
                    Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  [{}]", prompt.category),
                    Style::default().fg(TEXT_MUTED),
                ),
                Span::styled(
                    format!("  {}", prompt.description),
                    Style::default().fg(TEXT_MUTED),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(40, 40, 40))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    let mut state = ListState::default();
    state.select(Some(app.selected.min(filtered.len().saturating_sub(1))));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the prompt detail view: metadata plus the rendered markdown body.
fn draw_detail(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let Some(slug) = app.detail_slug.clone() else {
        return;
    };
    let Some(prompt) = app.prompts.iter().find(|prompt| prompt.slug == slug).cloned() else {
        let block = bordered(" Prompt ");
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                " Prompt not found.",
                Style::default().fg(TEXT_MUTED),
            ))),
            inner,
        );
        return;
    };

    let mut lines: Vec<Line<'static>> = Vec::new();
    lines.push(Line::from(Span::styled(
        prompt.title.clone(),
        Style::default().fg(SECONDARY).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        format!("[{}]  {}", prompt.category, prompt.description),
        Style::default().fg(TEXT_MUTED),
    )));
    if let Some(author) = &prompt.author {
        lines.push(Line::from(Span::styled(
            format!("Created by {author}"),
            Style::default().fg(TEXT_MUTED),
        )));
    }
    lines.push(Line::from(""));
    lines.extend(app.detail.lines.iter().cloned());

    let title = if app.detail.code_blocks.is_empty() {
        " Prompt ".to_string()
    } else {
        format!(
            " Prompt | code block {}/{} selected ",
            app.selected_block + 1,
            app.detail.code_blocks.len()
        )
    };
    let block = bordered(&title);
    draw_scrollable(frame, app, area, block, lines);
}

/// Draw the chat transcript with border and scrollbar.
fn draw_chat(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let lines = app.render_chat_lines();
    let block = bordered(" Chat ");
    draw_scrollable(frame, app, area, block, lines);
}

/// Render wrapped lines inside a block, maintaining scroll bounds and a
/// scrollbar when the content overflows.
fn draw_scrollable(
    frame: &mut Frame<'_>,
    app: &mut App,
    area: Rect,
    block: Block<'_>,
    lines: Vec<Line<'static>>,
) {
    let inner = block.inner(area);
    let content_width = inner.width.saturating_sub(1); // -1 for scrollbar
    let content_height = inner.height as usize;

    // Use ratatui's own line_count to get the exact wrapped line total,
    // avoiding any mismatch with a hand-written wrap estimator.
    let total_lines = Paragraph::new(lines.clone())
        .wrap(Wrap { trim: false })
        .line_count(content_width)
        .max(1);

    let max_scroll = total_lines.saturating_sub(content_height) as u16;
    app.update_scroll_bounds(max_scroll);
    let scroll = app.scroll;

    let content_inner = Rect {
        width: inner.width.saturating_sub(1),
        ..inner
    };
    let content = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(block, area);
    frame.render_widget(content, content_inner);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::default()
            .content_length(total_lines)
            .position(scroll as usize)
            .viewport_content_length(content_height);
        let scrollbar_area = Rect {
            x: inner.x + inner.width.saturating_sub(1),
            y: inner.y,
            width: 1,
            height: inner.height,
        };
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .style(Style::default().fg(BORDER))
                .thumb_style(Style::default().fg(TEXT_MUTED)),
            scrollbar_area,
            &mut scrollbar_state,
        );
    }
}

/// Draw the input area: search box, chat box, or detail key hints.
fn draw_input(frame: &mut Frame<'_>, app: &App, area: Rect) {
    match app.view {
        View::Catalog => {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_ACTIVE))
                .title(Span::styled(" Search ", Style::default().fg(SECONDARY)));
            let inner = block.inner(area);
            let line = if app.search.is_empty() {
                Line::from(Span::styled(
                    " Search prompts...",
                    Style::default().fg(TEXT_MUTED),
                ))
            } else {
                Line::from(Span::styled(
                    format!(" {}", app.search),
                    Style::default().fg(TEXT),
                ))
            };
            frame.render_widget(block, area);
            frame.render_widget(Paragraph::new(line), inner);
            frame.set_cursor_position((inner.x + 1 + app.search.len() as u16, inner.y));
        }
        View::Detail => {
            let mut spans = vec![Span::styled(
                " c copy prompt   s share   u upvote   Enter chat",
                Style::default().fg(TEXT_MUTED),
            )];
            if !app.detail.code_blocks.is_empty() {
                spans.push(Span::styled(
                    "   Tab next code   y copy code",
                    Style::default().fg(TEXT_MUTED),
                ));
            }
            if let Some(feedback) = copy_feedback_label(app) {
                spans.push(Span::styled(
                    format!("   {feedback}"),
                    Style::default().fg(GREEN),
                ));
            }
            let block = bordered(" Actions ");
            let inner = block.inner(area);
            frame.render_widget(block, area);
            frame.render_widget(Paragraph::new(Line::from(spans)), inner);
        }
        View::Chat => {
            let sending = app.is_sending();
            let border_color = if sending { BORDER } else { BORDER_ACTIVE };
            let title = if sending { " Sending... " } else { " Message " };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border_color))
                .title(Span::styled(
                    title,
                    Style::default().fg(if sending { PRIMARY } else { SECONDARY }),
                ));
            let inner = block.inner(area);
            let line = if app.chat_input.is_empty() && !sending {
                Line::from(Span::styled(
                    " Type your message...",
                    Style::default().fg(TEXT_MUTED),
                ))
            } else {
                Line::from(Span::styled(
                    format!(" {}", app.chat_input),
                    Style::default().fg(TEXT),
                ))
            };
            frame.render_widget(block, area);
            frame.render_widget(Paragraph::new(line), inner);
            if !sending {
                frame.set_cursor_position((inner.x + 1 + app.chat_input.len() as u16, inner.y));
            }
        }
    }
}

/// Copy acknowledgment text for the detail view, if one is active.
fn copy_feedback_label(app: &App) -> Option<&'static str> {
    match app.copied {
        Some((CopyTarget::Prompt, _)) => Some("prompt copied!"),
        Some((CopyTarget::ShareLink, _)) => Some("link copied!"),
        Some((CopyTarget::CodeBlock(_), _)) => Some("code copied!"),
        _ => None,
    }
}

/// Draw the status bar at the bottom.
fn draw_status_bar(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let status_color = match app.status.as_str() {
        "sending" => PRIMARY,
        "idle" => TEXT_MUTED,
        _ => YELLOW,
    };

    let shortcuts = match app.view {
        View::Catalog => vec![
            Span::styled(" Esc", Style::default().fg(TEXT_MUTED)),
            Span::styled(" quit", Style::default().fg(BORDER)),
            Span::styled("  Tab", Style::default().fg(TEXT_MUTED)),
            Span::styled(" category", Style::default().fg(BORDER)),
            Span::styled("  Ctrl+S", Style::default().fg(TEXT_MUTED)),
            Span::styled(" sort", Style::default().fg(BORDER)),
            Span::styled("  Ctrl+U", Style::default().fg(TEXT_MUTED)),
            Span::styled(" upvote", Style::default().fg(BORDER)),
            Span::styled("  Ctrl+P", Style::default().fg(TEXT_MUTED)),
            Span::styled(" settings", Style::default().fg(BORDER)),
        ],
        View::Detail => vec![
            Span::styled(" Esc", Style::default().fg(TEXT_MUTED)),
            Span::styled(" back", Style::default().fg(BORDER)),
            Span::styled("  PgUp/PgDn", Style::default().fg(TEXT_MUTED)),
            Span::styled(" scroll", Style::default().fg(BORDER)),
            Span::styled("  Ctrl+P", Style::default().fg(TEXT_MUTED)),
            Span::styled(" settings", Style::default().fg(BORDER)),
        ],
        View::Chat => vec![
            Span::styled(" Esc", Style::default().fg(TEXT_MUTED)),
            Span::styled(" back", Style::default().fg(BORDER)),
            Span::styled("  Ctrl+Y", Style::default().fg(TEXT_MUTED)),
            Span::styled(" copy msg", Style::default().fg(BORDER)),
            Span::styled("  Ctrl+L", Style::default().fg(TEXT_MUTED)),
            Span::styled(" clear", Style::default().fg(BORDER)),
            Span::styled("  PgUp/PgDn", Style::default().fg(TEXT_MUTED)),
            Span::styled(" scroll", Style::default().fg(BORDER)),
        ],
    };

    let right_text = format!(" {} ", app.status);
    let right_len = right_text.len() as u16;
    let left_area = Rect {
        width: area.width.saturating_sub(right_len),
        ..area
    };
    let right_area = Rect {
        x: area.x + area.width.saturating_sub(right_len),
        width: right_len,
        ..area
    };

    frame.render_widget(Paragraph::new(Line::from(shortcuts)), left_area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            right_text,
            Style::default().fg(status_color),
        ))),
        right_area,
    );
}

/// Draw the settings overlay: credential entry and chat purging.
fn draw_settings(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let overlay = centered_rect(area, 60, 12);
    frame.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACTIVE))
        .title(Span::styled(" Settings ", Style::default().fg(SECONDARY)));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let masked = "•".repeat(app.credential_input.len());
    let credential_state = if app.credential_present {
        Span::styled("stored", Style::default().fg(GREEN))
    } else {
        Span::styled("not set", Style::default().fg(YELLOW))
    };
    let choice = PURGE_CHOICES[app.purge_index];

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  API key: ", Style::default().fg(TEXT_MUTED)),
            credential_state,
        ]),
        Line::from(vec![
            Span::styled("  New key: ", Style::default().fg(TEXT_MUTED)),
            Span::styled(masked, Style::default().fg(TEXT)),
        ]),
        Line::from(Span::styled(
            "  Enter save key   Ctrl+F forget key",
            Style::default().fg(TEXT_MUTED),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Purge chats: ", Style::default().fg(TEXT_MUTED)),
            Span::styled(choice.label(), Style::default().fg(TEXT)),
        ]),
        Line::from(Span::styled(
            "  Tab change threshold   Ctrl+D purge",
            Style::default().fg(TEXT_MUTED),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  Esc close",
            Style::default().fg(TEXT_MUTED),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

/// Draw the credential prompt shown when chat is opened without a key.
fn draw_credential_prompt(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let overlay = centered_rect(area, 60, 8);
    frame.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACTIVE))
        .title(Span::styled(" API Key Setup ", Style::default().fg(SECONDARY)));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let masked = "•".repeat(app.credential_input.len());
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Chat needs an API key for the completion service.",
            Style::default().fg(TEXT),
        )),
        Line::from(vec![
            Span::styled("  Key: ", Style::default().fg(TEXT_MUTED)),
            Span::styled(masked, Style::default().fg(TEXT)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Enter save and continue   Esc cancel",
            Style::default().fg(TEXT_MUTED),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

/// Draw a yes/no confirmation overlay.
fn draw_confirm(frame: &mut Frame<'_>, area: Rect, title: &str, message: &str) {
    let overlay = centered_rect(area, 64, 7);
    frame.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(PRIMARY))
        .title(Span::styled(title, Style::default().fg(PRIMARY)));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {message}"),
            Style::default().fg(TEXT),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  y confirm   n cancel",
            Style::default().fg(TEXT_MUTED),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

/// A rounded block with a muted title.
fn bordered(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(
            title.to_string(),
            Style::default().fg(TEXT_MUTED),
        ))
}

/// Center a fixed-size rect within the area.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}
