use crate::app::{Action, App};
use crate::blit;
use crate::scheduler::SchedulerState;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 24;

/// Max scroll for help content (generous to account for text wrapping on small screens)
pub const HELP_CONTENT_LINES: u16 = 60;

/// Keys listed in the controls box
const CONTROL_KEYS: [Action; 14] = [
    Action::WaterfallDown,
    Action::WaterfallUp,
    Action::MoveLeft,
    Action::MoveRight,
    Action::Shuffle,
    Action::Trickle,
    Action::Freeze,
    Action::Erase,
    Action::CyclePaintVariant,
    Action::TogglePause,
    Action::ToggleManual,
    Action::NewSeed,
    Action::Screenshot,
    Action::ToggleRecording,
];

/// Number of lines in controls content
pub const CONTROLS_CONTENT_LINES: u16 = CONTROL_KEYS.len() as u16 + 7;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;
const RECORD_COLOR: Color = Color::Red;

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if let Some(menu) = &app.menu {
        render_menu(frame, area, app, menu.selected_idx);
    }
    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Screen rect of the canvas interior (excluding borders)
pub fn canvas_rect(frame_area: Rect, fullscreen: bool) -> Rect {
    let left = if fullscreen { 0 } else { SIDEBAR_WIDTH.min(frame_area.width) };
    let (width, height) = get_canvas_size(frame_area, fullscreen);
    Rect {
        x: frame_area.x + left + 1,
        y: frame_area.y + 1,
        width,
        height,
    }
}

/// Calculate the canvas size (excluding borders)
pub fn get_canvas_size(frame_area: Rect, fullscreen: bool) -> (u16, u16) {
    if fullscreen {
        (frame_area.width.saturating_sub(2), frame_area.height.saturating_sub(2))
    } else {
        let canvas_width = frame_area.width.saturating_sub(SIDEBAR_WIDTH + 2);
        let canvas_height = frame_area.height.saturating_sub(2);
        (canvas_width, canvas_height)
    }
}

/// Map a screen position to a canvas cell, if it lies on the canvas
pub fn screen_to_canvas(frame_area: Rect, fullscreen: bool, column: u16, row: u16) -> Option<(u16, u16)> {
    let canvas = canvas_rect(frame_area, fullscreen);
    let inside = column >= canvas.x
        && row >= canvas.y
        && column < canvas.x + canvas.width
        && row < canvas.y + canvas.height;
    inside.then(|| (column - canvas.x, row - canvas.y))
}

/// Visible lines in the controls box for a terminal of `height` rows
pub fn get_controls_visible_lines(height: u16) -> u16 {
    // status (6) and parameters (10) above, borders around
    height.saturating_sub(6 + 10 + 2)
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),  // Status
            Constraint::Length(10), // Parameters
            Constraint::Min(8),     // Controls
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_params_box(frame, sections[1], app);
    render_controls_box(frame, sections[2], app);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" fluxpaint ");

    let (state_text, state_color) = match app.scheduler.state() {
        _ if !app.world.is_allocated() => ("NO CANVAS", DIM_TEXT_COLOR),
        SchedulerState::Idle => ("IDLE", DIM_TEXT_COLOR),
        SchedulerState::Frozen => ("PAUSED", HIGHLIGHT_COLOR),
        SchedulerState::Running => ("RUNNING", Color::Green),
    };

    let mut state_line = vec![Span::styled(state_text, Style::default().fg(state_color))];
    if let Some(recorder) = &app.recorder {
        state_line.push(Span::styled(
            format!(" ● REC {} {}K", recorder.frames(), recorder.bytes_written() / 1024),
            Style::default().fg(RECORD_COLOR),
        ));
    }

    let content = vec![
        Line::from(state_line),
        Line::from(Span::styled(app.mode_label(), Style::default().fg(TEXT_COLOR))),
        Line::from(Span::styled(
            format!("brush {}", app.brush_label()),
            Style::default().fg(TEXT_COLOR),
        )),
        Line::from(Span::styled(
            app.status.clone().unwrap_or_default(),
            Style::default().fg(DIM_TEXT_COLOR),
        )),
    ];

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_params_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Parameters ");

    let line = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{}: ", label), Style::default().fg(DIM_TEXT_COLOR)),
            Span::styled(value, Style::default().fg(TEXT_COLOR)),
        ])
    };
    let on_off = |flag: bool| if flag { "on" } else { "off" }.to_string();

    let params = &app.params;
    let grid = params
        .grid_divisor()
        .map_or_else(|| "off".to_string(), |scale| format!("{}x{}", scale, scale));

    let content = vec![
        line("Seed", format!("{}", app.seed)),
        line("Grid", grid),
        line("Waterfall", on_off(params.waterfall_enabled())),
        line("Manual", on_off(app.manual_mode)),
        line("Grayscale", on_off(params.use_grayscale)),
        line(
            "FPS",
            format!("{:.0} / {:.0}", app.scheduler.observed_fps(), app.scheduler.target_fps()),
        ),
        line("Frame", format!("{}", app.scheduler.frame())),
        line("Time", format!("{:.1}s", app.scheduler.time())),
    ];

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let make_control = |key: &str, desc: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc.to_lowercase()), desc_style),
        ])
    };

    let mut content: Vec<Line> = CONTROL_KEYS
        .iter()
        .map(|action| make_control(action.key_hint(), action.label()))
        .collect();
    content.push(make_control("1-4", "paint variants"));
    content.push(make_control("[/]", "brush size"));
    content.push(make_control("+/-", "target fps"));
    content.push(make_control("M", "menu"));
    content.push(make_control("V", "fullscreen"));
    content.push(make_control("H/?", "help"));
    content.push(make_control("Q", "quit"));

    let content_height = content.len() as u16;
    let visible_height = area.height.saturating_sub(2); // minus borders
    let max_scroll = content_height.saturating_sub(visible_height);

    let title = if max_scroll > 0 {
        " Controls (J/K) "
    } else {
        " Controls "
    };

    let paragraph = Paragraph::new(content)
        .block(styled_block(title))
        .scroll((app.controls_scroll.min(max_scroll), 0));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block("");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(surface) = app.world.current() else {
        return;
    };

    let cells = blit::render_to_half_blocks(surface, inner.width, inner.height);
    let buffer = frame.buffer_mut();
    for cell in cells {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            if let Some(target) = buffer.cell_mut((x, y)) {
                target
                    .set_char(blit::HALF_BLOCK)
                    .set_fg(cell.top)
                    .set_bg(cell.bottom);
            }
        }
    }
}

/// Centered rect inside the canvas part of the screen
fn canvas_popup_area(area: Rect, fullscreen: bool, width: u16, height: u16) -> Rect {
    let canvas_x = if fullscreen { 0 } else { SIDEBAR_WIDTH };
    let canvas_width = if fullscreen {
        area.width
    } else {
        area.width.saturating_sub(SIDEBAR_WIDTH)
    };

    let width = width.min(canvas_width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect {
        x: area.x + canvas_x + canvas_width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

fn render_menu(frame: &mut Frame, area: Rect, app: &App, selected_idx: usize) {
    let menu_area = canvas_popup_area(area, app.fullscreen_mode, 34, Action::MENU.len() as u16 + 2);
    frame.render_widget(Clear, menu_area);

    let content: Vec<Line> = Action::MENU
        .iter()
        .enumerate()
        .map(|(i, action)| {
            let selected = i == selected_idx;
            let prefix = if selected { "> " } else { "  " };
            let style = if selected {
                Style::default().fg(HIGHLIGHT_COLOR)
            } else {
                Style::default().fg(TEXT_COLOR)
            };
            Line::from(vec![
                Span::styled(format!("{}{:<24}", prefix, action.label()), style),
                Span::styled(action.key_hint(), Style::default().fg(DIM_TEXT_COLOR)),
            ])
        })
        .collect();

    // keep the selection visible on short screens
    let visible_height = menu_area.height.saturating_sub(2);
    let scroll = (selected_idx as u16).saturating_sub(visible_height.saturating_sub(1));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(" Actions (Enter/Esc) ");

    let paragraph = Paragraph::new(content).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, menu_area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let help_area = canvas_popup_area(area, app.fullscreen_mode, 56, 40);

    // Clear the background
    frame.render_widget(Clear, help_area);

    let heading = |text: &'static str| Line::from(Span::styled(text, Style::default().fg(HIGHLIGHT_COLOR)));
    let entry = |text: &'static str| Line::from(Span::styled(text, Style::default().fg(TEXT_COLOR)));

    let content = vec![
        Line::from(""),
        Line::from(Span::styled("FLUXPAINT", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("A pixel world feeds back into itself every frame. Each seed derives its own rules for falling, drifting, noise and resets. Paint with the mouse to steer it."),
        Line::from(""),
        heading("BRUSH MODES:"),
        entry("Arrows - Waterfall up/down, move left/right"),
        Line::from("Painted cells keep pushing pixels in that direction."),
        entry("S - Shuffle"),
        Line::from("Scrambles pixels locally."),
        entry("T - Trickle"),
        Line::from("A slow leak downward."),
        entry("F - Freeze"),
        Line::from("Painted pixels stop evolving."),
        entry("D / 1-4 - Paint"),
        Line::from("Rebuilds painted areas as reset, empty, static or gem. D cycles the variant."),
        entry("E - Erase"),
        Line::from("Removes paint under the brush."),
        Line::from(""),
        heading("WORLD:"),
        entry("Space - Pause"),
        Line::from("Time stops; paint still shows and applies."),
        entry("X - Manual mode"),
        Line::from("Autonomous motion off; only painted cells move."),
        entry("B - Grid mode"),
        Line::from("Snaps the brush and motion to blocks."),
        entry("W - Waterfalls"),
        entry("C - Clear paint"),
        entry("Z - Reset everything"),
        entry("N - New random seed"),
        Line::from(""),
        heading("CAPTURE:"),
        entry("P - Screenshot (PNG)"),
        entry("R - Start/stop recording"),
        Line::from("Stops on its own at the duration or size limit."),
        Line::from(""),
        heading("OTHER:"),
        Line::from("[/] = Brush size, +/- = Target FPS, M = Action menu, V = Fullscreen, Q = Quit"),
        Line::from(""),
    ];

    let content_height = content.len() as u16;
    let visible_height = help_area.height.saturating_sub(2); // minus borders
    let max_scroll = content_height.saturating_sub(visible_height);

    // Update title to show scroll hint if scrollable
    let title = if max_scroll > 0 {
        " Help (J/K scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_canvas_size_and_rect_agree() {
        let area = Rect::new(0, 0, 100, 30);
        let (w, h) = get_canvas_size(area, false);
        assert_eq!((w, h), (100 - SIDEBAR_WIDTH - 2, 28));
        let rect = canvas_rect(area, false);
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (SIDEBAR_WIDTH + 1, 1, w, h));

        let full = canvas_rect(area, true);
        assert_eq!((full.x, full.width), (1, 98));
    }

    #[test]
    fn test_screen_to_canvas() {
        let area = Rect::new(0, 0, 100, 30);
        assert_eq!(screen_to_canvas(area, true, 1, 1), Some((0, 0)));
        assert_eq!(screen_to_canvas(area, true, 0, 1), None);
        assert_eq!(screen_to_canvas(area, true, 98, 28), Some((97, 27)));
        assert_eq!(screen_to_canvas(area, true, 99, 28), None);
        assert_eq!(screen_to_canvas(area, false, 5, 5), None);
    }

    #[test]
    fn test_render_draws_half_blocks() {
        let backend = TestBackend::new(60, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        let area = Rect::new(0, 0, 60, 20);
        let mut app = App::new(AppConfig::default(), 3, get_canvas_size(area, false), 0.0);
        app.frame(0.0);

        terminal.draw(|f| render(f, &app)).unwrap();
        let buffer = terminal.backend().buffer();
        let canvas = canvas_rect(area, false);
        let cell = &buffer[(canvas.x, canvas.y)];
        assert_eq!(cell.symbol(), "▀");
    }
}
