use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::app::{App, Divider, FocusPane, MIN_CHAT_COLS, MIN_CONTENT_COLS, MIN_FILES_COLS};
use crate::project::{ResponsiveMode, ViewMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(
    app: &mut App,
    event: AppEvent,
    reports: &UnboundedSender<AppEvent>,
) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse, reports),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_generation().await;
        }
        AppEvent::DragReport(report) => app.report_drag(report),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any pane
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }
    if key.code == KeyCode::Tab {
        app.focus = match app.focus {
            FocusPane::Chat => {
                if app.view_mode == ViewMode::Code && !app.files.is_empty() {
                    FocusPane::Files
                } else {
                    FocusPane::Content
                }
            }
            FocusPane::Files => FocusPane::Content,
            FocusPane::Content => FocusPane::Chat,
        };
        return;
    }

    match app.focus {
        FocusPane::Chat => handle_chat_key(app, key),
        FocusPane::Files => handle_files_key(app, key),
        FocusPane::Content => handle_content_key(app, key),
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if app.suggestions_visible() {
                // Empty input: Enter adopts the highlighted starter prompt.
                app.insert_suggestion();
            } else {
                submit_input(app);
            }
        }
        KeyCode::Esc => {
            app.input.clear();
            app.input_cursor = 0;
            app.pending_image = None;
            app.pending_image_name = None;
        }
        KeyCode::Up => {
            if app.suggestions_visible() {
                app.suggestion_nav_up();
            } else {
                app.chat_scroll_up(1);
            }
        }
        KeyCode::Down => {
            if app.suggestions_visible() {
                app.suggestion_nav_down();
            } else {
                app.chat_scroll_down(1);
            }
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Enter in the chat pane: either the /image command or a prompt submission.
fn submit_input(app: &mut App) {
    let text = app.input.trim().to_string();
    if text.is_empty() {
        return;
    }
    if let Some(path) = text.strip_prefix("/image ") {
        app.attach_image(path.trim());
        app.input.clear();
        app.input_cursor = 0;
        return;
    }
    if app.busy {
        // Refused, not queued; the input stays put so nothing is lost.
        return;
    }
    let image = app.take_pending_image();
    app.input.clear();
    app.input_cursor = 0;
    app.submit(text, image, true);
}

fn handle_files_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.select_next_file(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_file(),
        KeyCode::Enter => app.focus = FocusPane::Content,
        _ => handle_workspace_key(app, key),
    }
}

fn handle_content_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => scroll_content(app, 1, true),
        KeyCode::Char('k') | KeyCode::Up => scroll_content(app, 1, false),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            scroll_content(app, half_page(app), true);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            scroll_content(app, half_page(app), false);
        }
        _ => handle_workspace_key(app, key),
    }
}

/// View, responsive, and export keys shared by the non-typing panes.
fn handle_workspace_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('v') => {
            app.view_mode = match app.view_mode {
                ViewMode::Code => ViewMode::Preview,
                ViewMode::Preview => ViewMode::Code,
            };
            if app.view_mode == ViewMode::Preview && app.focus == FocusPane::Files {
                // The files panel is hidden in preview view.
                app.focus = FocusPane::Content;
            }
        }
        KeyCode::Char('m') => {
            let target = match app.responsive_mode {
                ResponsiveMode::Desktop => ResponsiveMode::Mobile,
                ResponsiveMode::Mobile => ResponsiveMode::Desktop,
            };
            app.change_responsive_target(target);
        }
        KeyCode::Char('z') => app.export_archive(),
        KeyCode::Char('p') => app.export_snapshot(),
        _ => {}
    }
}

fn half_page(app: &App) -> u16 {
    app.content_area.map(|r| r.height / 2).unwrap_or(5).max(1)
}

fn scroll_content(app: &mut App, amount: u16, down: bool) {
    match app.view_mode {
        ViewMode::Preview => {
            if down {
                app.preview.scroll_down(amount);
            } else {
                app.preview.scroll_up(amount);
            }
        }
        ViewMode::Code => {
            if down {
                let total = app
                    .selected_file_node()
                    .map(|f| f.content.lines().count().min(usize::from(u16::MAX)) as u16)
                    .unwrap_or(0);
                let height = app.content_area.map(|r| r.height).unwrap_or(0);
                let max = total.saturating_sub(height.saturating_sub(2));
                app.code_scroll = app.code_scroll.saturating_add(amount).min(max);
            } else {
                app.code_scroll = app.code_scroll.saturating_sub(amount);
            }
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, reports: &UnboundedSender<AppEvent>) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_files = app.files_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_content = app
        .content_area
        .map(|r| point_in_rect(x, y, r))
        .unwrap_or(false);
    let in_preview = in_content && app.view_mode == ViewMode::Preview;

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(divider) = divider_at(app, x, y) {
                app.divider_drag = Some(divider);
            } else if in_chat {
                app.focus = FocusPane::Chat;
            } else if in_files {
                app.focus = FocusPane::Files;
                if let Some(area) = app.files_area {
                    // One list row per file, below the panel border; the list
                    // may be scrolled past its first entry.
                    let row = app.files_state.offset() + y.saturating_sub(area.y + 1) as usize;
                    if row < app.files.len() {
                        app.select_file(row);
                    }
                }
            } else if in_content {
                app.focus = FocusPane::Content;
                if in_preview {
                    app.preview.press(x, y);
                }
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(divider) = app.divider_drag {
                resize_panels(app, divider, x);
            } else if in_preview || app.preview.engine.is_dragging() {
                app.preview.drag_to(x, y);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if app.divider_drag.take().is_some() {
                return;
            }
            if let Some(report) = app.preview.release(x, y) {
                // Fire-and-forget into the event channel; the orchestrator
                // picks it up as its own AppEvent.
                let _ = reports.send(AppEvent::DragReport(report));
            }
        }
        MouseEventKind::Moved => {
            // Outside the panel the hit test misses everything, which is
            // exactly the hover-out the engine needs.
            if app.view_mode == ViewMode::Preview {
                app.preview.hover(x, y);
            }
        }
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.chat_scroll_down(3);
            } else if in_files {
                app.select_next_file();
            } else if in_content {
                scroll_content(app, 3, true);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.chat_scroll_up(3);
            } else if in_files {
                app.select_prev_file();
            } else if in_content {
                scroll_content(app, 3, false);
            }
        }
        _ => {}
    }
}

/// The one-column gaps between panels double as drag handles.
fn divider_at(app: &App, x: u16, y: u16) -> Option<Divider> {
    let chat = app.chat_area?;
    if y < chat.y || y >= chat.y + chat.height {
        return None;
    }
    if x == chat.x + chat.width {
        return Some(Divider::Chat);
    }
    if let Some(files) = app.files_area {
        if x == files.x + files.width {
            return Some(Divider::Files);
        }
    }
    None
}

fn resize_panels(app: &mut App, divider: Divider, x: u16) {
    let Some(chat) = app.chat_area else { return };
    let Some(content) = app.content_area else {
        return;
    };
    let total = content.x + content.width - chat.x;
    match divider {
        Divider::Chat => {
            let files_span = if app.view_mode == ViewMode::Code && !app.files.is_empty() {
                app.files_cols + 1
            } else {
                0
            };
            let max = total
                .saturating_sub(files_span + MIN_CONTENT_COLS + 1)
                .max(MIN_CHAT_COLS);
            app.chat_cols = x.saturating_sub(chat.x).clamp(MIN_CHAT_COLS, max);
        }
        Divider::Files => {
            let Some(files) = app.files_area else { return };
            let max = total
                .saturating_sub(app.chat_cols + MIN_CONTENT_COLS + 2)
                .max(MIN_FILES_COLS);
            app.files_cols = x.saturating_sub(files.x).clamp(MIN_FILES_COLS, max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: crossterm::event::KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn app() -> App {
        App::new(Config::new())
    }

    fn mouse(kind: MouseEventKind, x: u16, y: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column: x,
            row: y,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn file(name: &str) -> crate::project::FileNode {
        crate::project::FileNode {
            name: name.to_string(),
            content: String::new(),
        }
    }

    #[test]
    fn test_typing_edits_input_at_cursor() {
        let mut app = app();
        for c in "hero".chars() {
            handle_chat_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_chat_key(&mut app, key(KeyCode::Left));
        handle_chat_key(&mut app, key(KeyCode::Char('!')));
        assert_eq!(app.input, "her!o");
        handle_chat_key(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.input, "hero");
    }

    #[test]
    fn test_escape_clears_input_and_attachment() {
        let mut app = app();
        app.input = "half a thought".to_string();
        app.input_cursor = 5;
        app.pending_image = Some("abcd".to_string());
        handle_chat_key(&mut app, key(KeyCode::Esc));
        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
        assert!(app.pending_image.is_none());
    }

    #[test]
    fn test_enter_with_empty_input_adopts_suggestion() {
        let mut app = app();
        assert!(app.suggestions_visible());
        handle_chat_key(&mut app, key(KeyCode::Down));
        handle_chat_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.input, app.suggestions[1].prompt);
        assert!(!app.busy);
    }

    #[tokio::test]
    async fn test_enter_submits_and_busy_refusal_keeps_input() {
        let mut app = app();
        app.input = "build a landing page".to_string();
        app.input_cursor = app.input.chars().count();
        submit_input(&mut app);
        assert!(app.busy);
        assert!(app.input.is_empty());

        app.input = "second prompt".to_string();
        submit_input(&mut app);
        assert_eq!(app.input, "second prompt");
    }

    #[test]
    fn test_image_command_routes_to_attachment() {
        let mut app = app();
        app.input = "/image /no/such/wireframe.png".to_string();
        submit_input(&mut app);
        assert!(app.input.is_empty());
        assert!(!app.busy);
        assert!(app
            .turns
            .last()
            .unwrap()
            .content
            .contains("/no/such/wireframe.png"));
    }

    #[test]
    fn test_tab_skips_files_pane_in_preview_view() {
        let mut app = app();
        app.files.push(crate::project::FileNode {
            name: "index.html".to_string(),
            content: String::new(),
        });
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.focus, FocusPane::Files);

        app.focus = FocusPane::Chat;
        app.view_mode = ViewMode::Preview;
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.focus, FocusPane::Content);
    }

    #[test]
    fn test_view_toggle_moves_focus_out_of_hidden_pane() {
        let mut app = app();
        app.focus = FocusPane::Files;
        handle_workspace_key(&mut app, key(KeyCode::Char('v')));
        assert_eq!(app.view_mode, ViewMode::Preview);
        assert_eq!(app.focus, FocusPane::Content);
    }

    #[test]
    fn test_hover_clears_when_pointer_leaves_preview() {
        let mut app = app();
        app.view_mode = ViewMode::Preview;
        let area = Rect::new(20, 1, 60, 22);
        app.content_area = Some(area);
        app.files = vec![crate::project::FileNode {
            name: "index.html".to_string(),
            content: "<html><head></head><body><div id=\"hero\"><h1>Hi</h1></div></body></html>"
                .to_string(),
        }];
        app.preview.sync(&app.files, ResponsiveMode::Desktop, area);
        let (reports, _rx) = tokio::sync::mpsc::unbounded_channel();

        let hero = app.preview.boxes[0].clone();
        let rect = app.preview.rendered_rect(&hero).unwrap();
        handle_mouse(&mut app, mouse(MouseEventKind::Moved, rect.x, rect.y), &reports);
        assert_eq!(app.preview.engine.hovered(), Some(hero.node));

        // Pointer leaves the panel entirely; the highlight must not stick.
        handle_mouse(&mut app, mouse(MouseEventKind::Moved, 0, 0), &reports);
        assert_eq!(app.preview.engine.hovered(), None);
    }

    #[test]
    fn test_file_click_respects_list_scroll() {
        let mut app = app();
        for i in 0..10 {
            app.files.push(file(&format!("file{i}.css")));
        }
        app.files_area = Some(Rect::new(41, 1, 24, 6));
        *app.files_state.offset_mut() = 4;
        let (reports, _rx) = tokio::sync::mpsc::unbounded_channel();

        // Second visible row, one below the border: offset 4 + index 1.
        let event = mouse(MouseEventKind::Down(MouseButton::Left), 45, 3);
        handle_mouse(&mut app, event, &reports);
        assert_eq!(app.selected_file.as_deref(), Some("file5.css"));
    }

    #[test]
    fn test_divider_hit_and_resize_clamping() {
        let mut app = app();
        for name in ["index.html", "style.css"] {
            app.files.push(crate::project::FileNode {
                name: name.to_string(),
                content: String::new(),
            });
        }
        app.chat_area = Some(Rect::new(0, 1, 40, 20));
        app.files_area = Some(Rect::new(41, 1, 24, 20));
        app.content_area = Some(Rect::new(66, 1, 54, 20));

        assert_eq!(divider_at(&app, 40, 5), Some(Divider::Chat));
        assert_eq!(divider_at(&app, 65, 5), Some(Divider::Files));
        assert_eq!(divider_at(&app, 39, 5), None);
        assert_eq!(divider_at(&app, 40, 0), None);

        resize_panels(&mut app, Divider::Chat, 10);
        assert_eq!(app.chat_cols, MIN_CHAT_COLS);
        resize_panels(&mut app, Divider::Chat, 119);
        assert!(app.chat_cols + app.files_cols + MIN_CONTENT_COLS + 2 <= 120);

        resize_panels(&mut app, Divider::Files, 42);
        assert_eq!(app.files_cols, MIN_FILES_COLS);
    }
}
