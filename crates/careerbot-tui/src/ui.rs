use careerbot_core::{Attachment, Conversation, Identity, Sender};
use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Paragraph, Wrap};

use crate::app::{App, FlashLevel, Screen};
use crate::chat::ChatScreen;
use crate::markdown::render_markdown;
use crate::sign_in::{Field, SignInForm};

const SIDEBAR_WIDTH: u16 = 32;
const USER_ACCENT: Color = Color::Blue;
const BOT_ACCENT: Color = Color::Cyan;
const MUTED: Color = Color::DarkGray;

pub fn draw(frame: &mut Frame, app: &App) {
    let [body, status] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());

    match &app.screen {
        Screen::SignIn(form) => draw_sign_in(frame, body, form, &app.config().base_url),
        Screen::Chat(chat) => draw_chat(frame, body, chat),
    }
    draw_status(frame, status, app);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}

pub fn draw_sign_in(frame: &mut Frame, area: Rect, form: &SignInForm, base_url: &str) {
    let area = centered(area, 60_u16.min(area.width), 13_u16.min(area.height));
    let block = Block::bordered()
        .title(" CareerBot ")
        .border_style(Style::new().fg(BOT_ACCENT));

    let mut lines = vec![
        Line::from("Career advice for students, one question at a time.".bold()),
        Line::default(),
    ];

    if form.needs_credentials {
        let field = |label: &str, value: String, focused: bool| {
            let marker = if focused { "> " } else { "  " };
            let style = if focused {
                Style::new().fg(BOT_ACCENT)
            } else {
                Style::new()
            };
            Line::from(vec![
                Span::styled(format!("{marker}{label:<10}"), style),
                Span::raw(value),
            ])
        };
        lines.push(field(
            "Email",
            form.email.clone(),
            form.focus == Field::Email,
        ));
        lines.push(field(
            "Password",
            "•".repeat(form.password.chars().count()),
            form.focus == Field::Password,
        ));
        lines.push(Line::default());
        lines.push(Line::styled(
            "Enter sign in · Tab switch field · Esc quit",
            Style::new().fg(MUTED),
        ));
    } else {
        lines.push(Line::from("Press Enter to continue with your access token."));
        lines.push(Line::default());
        lines.push(Line::styled("Esc quit", Style::new().fg(MUTED)));
    }

    lines.push(Line::default());
    lines.push(Line::styled(
        format!("Service: {base_url}"),
        Style::new().fg(MUTED),
    ));

    if form.pending {
        lines.push(Line::default());
        lines.push(Line::styled(
            "Signing in... (Esc to cancel)",
            Style::new().add_modifier(Modifier::ITALIC),
        ));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_chat(frame: &mut Frame, area: Rect, chat: &ChatScreen) {
    let [sidebar, main] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)]).areas(area);
    draw_sidebar(frame, sidebar, chat);

    let preview_height = match &chat.attachment {
        Some(_) => 6,
        None => 0,
    };
    let [transcript, typing, preview, input] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(preview_height),
        Constraint::Length(3),
    ])
    .areas(main);

    let conversation = chat.controller().conversation();
    draw_transcript(frame, transcript, conversation, chat.scroll_back);

    if conversation.is_awaiting_reply() {
        frame.render_widget(
            Paragraph::new(Line::styled(
                "CareerBot is typing...",
                Style::new().fg(MUTED).add_modifier(Modifier::ITALIC),
            )),
            typing,
        );
    }

    if let Some(attachment) = &chat.attachment {
        draw_attachment(frame, preview, attachment);
    }
    draw_input(frame, input, chat);
}

fn draw_sidebar(frame: &mut Frame, area: Rect, chat: &ChatScreen) {
    let identity: &Identity = chat.controller().identity();
    let conversation = chat.controller().conversation();
    let inner_width = area.width.saturating_sub(4) as usize;

    let mut lines = vec![Line::from(Span::styled(
        identity.display_name.clone(),
        Style::new().add_modifier(Modifier::BOLD),
    ))];
    if let Some(email) = &identity.email {
        lines.push(Line::styled(email.clone(), Style::new().fg(MUTED)));
    }
    lines.push(Line::default());
    lines.push(Line::from(format!(
        "Questions asked: {}",
        conversation.questions_asked()
    )));
    lines.push(Line::from(format!("Language: {} (F3)", chat.language.label())));
    lines.push(Line::default());
    lines.push(Line::from("Your questions".bold()));

    let questions: Vec<&str> = conversation.questions().collect();
    if questions.is_empty() {
        lines.push(Line::styled("None yet", Style::new().fg(MUTED)));
    }
    for (index, question) in questions.iter().enumerate() {
        lines.push(Line::from(truncate(
            &format!("{}. {}", index + 1, question),
            inner_width,
        )));
    }

    if !chat.uploaded_files.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from("Uploaded files".bold()));
        for file in &chat.uploaded_files {
            lines.push(Line::from(truncate(&format!("• {file}"), inner_width)));
        }
    }

    let block = Block::bordered().title(" Profile ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Rendered transcript, including the partially revealed latest reply.
pub fn transcript_lines(conversation: &Conversation) -> Vec<Line<'static>> {
    let messages = conversation.messages();
    if messages.is_empty() {
        return vec![Line::styled(
            "Ask CareerBot anything about courses, skills or career paths.",
            Style::new().fg(MUTED),
        )];
    }

    let mut lines = Vec::new();
    for (index, message) in messages.iter().enumerate() {
        let text = conversation.display_text(index).unwrap_or_default();
        match message.sender {
            Sender::User => {
                lines.push(Line::from(Span::styled(
                    "You",
                    Style::new().fg(USER_ACCENT).add_modifier(Modifier::BOLD),
                )));
                lines.extend(text.lines().map(|line| Line::from(line.to_string())));
            }
            Sender::Bot => {
                let style = if message.is_fallback() {
                    Style::new().fg(Color::Red).add_modifier(Modifier::BOLD)
                } else {
                    Style::new().fg(BOT_ACCENT).add_modifier(Modifier::BOLD)
                };
                lines.push(Line::from(Span::styled("CareerBot", style)));
                lines.extend(render_markdown(text));
            }
        }
        lines.push(Line::default());
    }
    lines
}

/// Rows `paragraph` takes at `width` columns, using the widget's own word wrap.
/// The paragraph must not carry a block yet.
pub fn wrapped_height(paragraph: &Paragraph<'_>, width: u16) -> u16 {
    u16::try_from(paragraph.line_count(width)).unwrap_or(u16::MAX)
}

fn draw_transcript(frame: &mut Frame, area: Rect, conversation: &Conversation, scroll_back: u16) {
    let block = Block::bordered().title(" Conversation ");
    let inner = block.inner(area);
    let paragraph =
        Paragraph::new(Text::from(transcript_lines(conversation))).wrap(Wrap { trim: false });

    // Pin to the newest entry unless the user scrolled back
    let total = wrapped_height(&paragraph, inner.width);
    let bottom = total.saturating_sub(inner.height);
    let offset = bottom.saturating_sub(scroll_back);

    frame.render_widget(paragraph.block(block).scroll((offset, 0)), area);
}

fn draw_attachment(frame: &mut Frame, area: Rect, attachment: &Attachment) {
    let title = format!(
        " Attachment: {} ({} KB) · Ctrl-U upload ",
        attachment.file_name,
        attachment.size.div_ceil(1024)
    );
    let body = match &attachment.preview {
        Some(preview) => Text::from(preview.clone()),
        None => Text::styled("No preview for this file type.", Style::new().fg(MUTED)),
    };
    frame.render_widget(
        Paragraph::new(body)
            .block(Block::bordered().title(title))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_input(frame: &mut Frame, area: Rect, chat: &ChatScreen) {
    let conversation = chat.controller().conversation();
    let width = usize::from(area.width.saturating_sub(2));

    let (title, text, enabled) = match &chat.prompt {
        Some(prompt) => (
            " Attach file: path (Enter load · Esc cancel) ",
            prompt.input.as_str(),
            true,
        ),
        None if conversation.is_input_enabled() => (" Ask CareerBot ", conversation.input(), true),
        None => (" Waiting for CareerBot... ", conversation.input(), false),
    };

    let visible = tail(text, width.saturating_sub(1));
    let mut block = Block::bordered().title(title);
    if !enabled {
        block = block.border_style(Style::new().fg(MUTED));
    }
    frame.render_widget(Paragraph::new(visible.clone()).block(block), area);

    if enabled {
        let x = area.x + 1 + visible.chars().count() as u16;
        frame.set_cursor_position((x, area.y + 1));
    }
}

fn draw_status(frame: &mut Frame, area: Rect, app: &App) {
    let line = match &app.flash_message {
        Some((message, level)) => {
            let color = match level {
                FlashLevel::Info => Color::Yellow,
                FlashLevel::Success => Color::Green,
                FlashLevel::Error => Color::Red,
            };
            Line::styled(message.clone(), Style::new().fg(color))
        }
        None => match app.screen {
            Screen::SignIn(_) => Line::styled("Ctrl-C quit", Style::new().fg(MUTED)),
            Screen::Chat(_) => Line::styled(
                format!(
                    "Enter send · Tab skip · Ctrl-L clear · Ctrl-E export ({}, F4) · Ctrl-O attach · Ctrl-Y copy · F2 voice · Ctrl-D sign out · Esc quit",
                    app.export_format().file_name()
                ),
                Style::new().fg(MUTED),
            ),
        },
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max)).collect()
}
