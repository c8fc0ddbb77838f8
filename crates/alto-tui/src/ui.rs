use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use alto_core::{Sender, Snapshot};
use crate::app::App;

const PRODUCT_NAME: &str = "AltoGPT";

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Push any accumulated plain text
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, snapshot: &Snapshot, frame: &mut Frame) {
    let area = frame.area();

    // Input box: content rows plus borders
    let input_height = app.input_height() + 2;

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, snapshot, frame, chat_area);
    render_input(app, snapshot.busy, frame, input_area);
    render_footer(app, snapshot.busy, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", PRODUCT_NAME), Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_transcript(app: &mut App, snapshot: &Snapshot, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    // Store inner dimensions for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    if snapshot.is_empty() && !snapshot.busy {
        render_welcome(frame, block, area);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();

    for msg in &snapshot.transcript {
        match msg.sender() {
            Sender::User => {
                lines.push(Line::from(Span::styled(
                    format!("{}:", msg.sender().label()),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text().split('\n') {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Sender::Bot => {
                lines.push(Line::from(Span::styled(
                    format!("{}:", msg.sender().label()),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text().split('\n') {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if snapshot.busy {
        lines.push(Line::from(Span::styled(
            format!("{}:", Sender::Bot.label()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    // Count rows with the same word wrapping the view uses, before the
    // block is attached so borders don't enter the count
    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let total_rows = chat.line_count(app.chat_width).min(u16::MAX as usize) as u16;
    app.sync_scroll(total_rows);

    let chat = chat.block(block).scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_welcome(frame: &mut Frame, block: Block, area: Rect) {
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [_, banner_area, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(3),
        Constraint::Fill(1),
    ])
    .areas(inner);

    let banner = Paragraph::new(vec![
        Line::from(Span::styled(
            PRODUCT_NAME,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "How can I help you today?",
            Style::default().fg(Color::Gray),
        )),
    ])
    .alignment(Alignment::Center);

    frame.render_widget(banner, banner_area);
}

fn render_input(app: &App, busy: bool, frame: &mut Frame, area: Rect) {
    let (border_color, title) = if busy {
        (Color::DarkGray, " Waiting for reply... ")
    } else {
        (Color::Yellow, " Message ")
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (row, col) = app.cursor_row_col();

    // Scroll offsets keep the cursor visible in both directions
    let row_offset = if inner_height == 0 { 0 } else { (row + 1).saturating_sub(inner_height) };
    let col_offset = if inner_width == 0 { 0 } else { (col + 1).saturating_sub(inner_width) };

    let input = if app.input.is_empty() {
        Paragraph::new(Span::styled(
            format!("Message {}...", PRODUCT_NAME),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        // Use cyan text to match the "You:" style; grey it out while disabled
        let fg = if busy { Color::DarkGray } else { Color::Cyan };
        Paragraph::new(app.input.as_str())
            .style(Style::default().fg(fg))
            .scroll((row_offset as u16, col_offset as u16))
    };

    frame.render_widget(input.block(block), area);

    if !busy {
        frame.set_cursor_position((
            area.x + 1 + (col - col_offset) as u16,
            area.y + 1 + (row - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, busy: bool, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = if busy {
        (" WAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let disabled_style = Style::default().bg(Color::Black).fg(Color::DarkGray);

    let send_style = if app.can_send() { label_style } else { disabled_style };

    let hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", send_style),
        Span::styled(" Shift+Enter ", key_style),
        Span::styled(" newline ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ];

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
