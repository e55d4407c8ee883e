use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};

use crate::app::{App, FocusPane};
use crate::preview::PreviewBox;
use crate::project::{ChatRole, ResponsiveMode, ViewMode};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_body(app, frame, body_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = if app.busy {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        format!(" generating{dots} ")
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" maqueta ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(format!(" {} ", app.model), Style::default().fg(Color::DarkGray)),
        Span::styled(status, Style::default().fg(Color::Yellow)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_body(app: &mut App, frame: &mut Frame, area: Rect) {
    let files_visible = app.view_mode == ViewMode::Code && !app.files.is_empty();

    let chat_cols = app.chat_cols.min(area.width.saturating_sub(2));
    if files_visible {
        let [chat_area, chat_gap, files_area, files_gap, content_area] = Layout::horizontal([
            Constraint::Length(chat_cols),
            Constraint::Length(1),
            Constraint::Length(app.files_cols),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(area);

        app.chat_area = Some(chat_area);
        app.files_area = Some(files_area);
        app.content_area = Some(content_area);

        render_chat(app, frame, chat_area);
        render_divider(frame, chat_gap);
        render_files(app, frame, files_area);
        render_divider(frame, files_gap);
        render_content(app, frame, content_area);
    } else {
        let [chat_area, chat_gap, content_area] = Layout::horizontal([
            Constraint::Length(chat_cols),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(area);

        app.chat_area = Some(chat_area);
        app.files_area = None;
        app.content_area = Some(content_area);

        render_chat(app, frame, chat_area);
        render_divider(frame, chat_gap);
        render_content(app, frame, content_area);
    }
}

/// One-column gap between panels, drawn as a drag handle.
fn render_divider(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = (0..area.height)
        .map(|_| Line::from(Span::styled("│", Style::default().fg(Color::DarkGray))))
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let suggestions_height = if app.suggestions_visible() {
        (app.suggestions.len() as u16 + 2).min(area.height / 2)
    } else {
        0
    };

    let [transcript_area, suggestions_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(suggestions_height),
        Constraint::Length(3),
    ])
    .areas(area);

    render_transcript(app, frame, transcript_area);
    if suggestions_height > 0 {
        render_suggestions(app, frame, suggestions_area);
    }
    render_input(app, frame, input_area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let chat_focused = app.focus == FocusPane::Chat;
    let border_color = if chat_focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Chat ");

    // Store inner dimensions for scroll calculations (minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let mut lines: Vec<Line> = Vec::new();
    for turn in &app.turns {
        match turn.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
            }
            ChatRole::Model => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
            }
            ChatRole::Error => {
                lines.push(Line::from(Span::styled(
                    "Error:",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )));
            }
        }
        let content_style = match turn.role {
            ChatRole::Error => Style::default().fg(Color::Red),
            _ => Style::default(),
        };
        for line in turn.content.lines() {
            lines.push(Line::from(Span::styled(line.to_string(), content_style)));
        }
        if turn.image.is_some() {
            lines.push(Line::from(Span::styled(
                "[image attached]",
                Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC),
            )));
        }
        lines.push(Line::default());
    }

    if app.busy {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let transcript = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(transcript, area);

    let total = app.chat_total_lines();
    if total > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));
        let mut scrollbar_state =
            ScrollbarState::new(total as usize).position(app.chat_scroll as usize);
        frame.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_suggestions(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Ideas (Up/Down, Enter) ");

    let items: Vec<ListItem> = app
        .suggestions
        .iter()
        .map(|s| ListItem::new(format!(" {} ", s.label)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.suggestion_state);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_focused = app.focus == FocusPane::Chat;
    let border_color = if input_focused { Color::Yellow } else { Color::DarkGray };

    let title = match &app.pending_image_name {
        Some(name) => format!(" Describe ({} attached) ", name),
        None => " Describe ".to_string(),
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scroll keeps the cursor in view
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if input_focused {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_files(app: &mut App, frame: &mut Frame, area: Rect) {
    let files_focused = app.focus == FocusPane::Files;
    let border_color = if files_focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Files ({}) ", app.files.len()));

    let items: Vec<ListItem> = app
        .files
        .iter()
        .map(|f| ListItem::new(format!(" {} ", f.name)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.files_state);
}

fn render_content(app: &mut App, frame: &mut Frame, area: Rect) {
    match app.view_mode {
        ViewMode::Code => render_code(app, frame, area),
        ViewMode::Preview => render_preview(app, frame, area),
    }
}

fn render_code(app: &mut App, frame: &mut Frame, area: Rect) {
    let content_focused = app.focus == FocusPane::Content;
    let border_color = if content_focused { Color::Cyan } else { Color::DarkGray };

    let title = match app.selected_file.as_deref() {
        Some(name) => format!(" {} ", name),
        None => " Code ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let Some(file) = app.selected_file_node() else {
        let placeholder = Paragraph::new("Describe a website in the chat to generate files")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    };

    let lines: Vec<Line> = file
        .content
        .lines()
        .enumerate()
        .map(|(i, line)| {
            Line::from(vec![
                Span::styled(format!("{:>4} ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::raw(line.to_string()),
            ])
        })
        .collect();
    let total_lines = lines.len() as u16;

    let code = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.code_scroll, 0));
    frame.render_widget(code, area);

    let inner_height = area.height.saturating_sub(2);
    if total_lines > inner_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));
        let mut scrollbar_state =
            ScrollbarState::new(total_lines as usize).position(app.code_scroll as usize);
        frame.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_preview(app: &mut App, frame: &mut Frame, area: Rect) {
    let content_focused = app.focus == FocusPane::Content;
    let border_color = if content_focused { Color::Cyan } else { Color::DarkGray };

    let title = match app.responsive_mode {
        ResponsiveMode::Desktop => " Preview ",
        ResponsiveMode::Mobile => " Preview (mobile 375px) ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    app.preview.sync(&app.files, app.responsive_mode, inner);

    let hovered = app.preview.engine.hovered();
    let dragging = app.preview.engine.drag_target();

    // Paint order doubles as stacking order, parents underneath children.
    let boxes: Vec<PreviewBox> = app.preview.boxes.clone();
    for preview_box in &boxes {
        let Some(rect) = app.preview.rendered_rect(preview_box) else {
            continue;
        };
        let style = if dragging == Some(preview_box.node) {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if hovered == Some(preview_box.node) {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };

        frame.render_widget(Clear, rect);
        let boxed = Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title(Span::styled(
                format!(" {} ", preview_box.label),
                style.add_modifier(Modifier::DIM),
            ));
        let body = boxed.inner(rect);
        frame.render_widget(boxed, rect);

        if !preview_box.text.is_empty() && body.height > 0 {
            let text = Paragraph::new(preview_box.text.as_str())
                .style(Style::default().fg(Color::White));
            frame.render_widget(text, body);
        }
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.focus {
        FocusPane::Chat => Style::default().bg(Color::Yellow).fg(Color::Black),
        _ => Style::default().bg(Color::Blue).fg(Color::White),
    };
    let mode_text = match app.focus {
        FocusPane::Chat => " CHAT ",
        FocusPane::Files => " FILES ",
        FocusPane::Content => match app.view_mode {
            ViewMode::Code => " CODE ",
            ViewMode::Preview => " PREVIEW ",
        },
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.focus {
        FocusPane::Chat => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" /image <path> ", key_style),
            Span::styled(" attach ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" clear ", label_style),
        ],
        FocusPane::Files => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" file ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" view ", label_style),
        ],
        FocusPane::Content => {
            let mut hints = vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
            ];
            if app.view_mode == ViewMode::Preview {
                hints.extend(vec![
                    Span::styled(" drag ", key_style),
                    Span::styled(" move element ", label_style),
                    Span::styled(" m ", key_style),
                    Span::styled(
                        match app.responsive_mode {
                            ResponsiveMode::Desktop => " mobile ",
                            ResponsiveMode::Mobile => " desktop ",
                        },
                        label_style,
                    ),
                    Span::styled(" p ", key_style),
                    Span::styled(" capture ", label_style),
                ]);
            }
            hints
        }
    };

    // Common hints
    hints.extend(vec![
        Span::styled(" Tab ", key_style),
        Span::styled(" focus ", label_style),
    ]);
    if app.focus != FocusPane::Chat {
        hints.extend(vec![
            Span::styled(" v ", key_style),
            Span::styled(
                match app.view_mode {
                    ViewMode::Code => " preview ",
                    ViewMode::Preview => " code ",
                },
                label_style,
            ),
            Span::styled(" z ", key_style),
            Span::styled(" zip ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ]);
    }

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
