use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use sceneplay::{gate::Feedback, lesson::Interaction};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const TAKEAWAY_MAX_WIDTH: u16 = 60;

fn clock_label(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.player.is_complete() {
            render_completion(self, area, buf);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Length(1), // padding
                Constraint::Length(1), // progress
                Constraint::Length(1), // padding
                Constraint::Min(3),    // interaction panel
                Constraint::Length(5), // subtitles
                Constraint::Length(1), // footer
            ])
            .split(area);

        render_header(self, chunks[0], buf);
        render_progress(self, chunks[2], buf);
        render_interaction(self, chunks[4], buf);
        render_subtitles(self, chunks[5], buf);
        render_footer(self, chunks[6], buf);

        if let Some(takeaway) = self.player.visible_takeaway() {
            render_takeaway(takeaway, area, buf);
        }
    }
}

fn render_header(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let player = &app.player;

    let mut spans = vec![
        Span::styled(player.lesson().title().to_string(), bold_style),
        Span::raw("  "),
        Span::styled(
            format!("Scene {}/{}", player.scene_index() + 1, player.lesson().len()),
            dim_style,
        ),
        Span::raw("  "),
        Span::styled(player.state().label(), Style::default().fg(Color::Cyan)),
    ];
    if player.is_muted() {
        spans.push(Span::styled("  muted", Style::default().fg(Color::Yellow)));
    }

    Paragraph::new(Line::from(spans)).render(area, buf);
}

fn render_progress(app: &App, area: Rect, buf: &mut Buffer) {
    let player = &app.player;
    let total = player.total_duration();
    let ratio = if total > 0.0 {
        (player.elapsed_seconds() / total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(ratio)
        .label(format!(
            "{} / {}",
            clock_label(player.elapsed_seconds()),
            clock_label(total)
        ))
        .render(area, buf);
}

fn numbered(index: usize, text: &str, style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {} ", index + 1), Style::default().add_modifier(Modifier::REVERSED)),
        Span::raw(" "),
        Span::styled(text.to_string(), style),
    ])
}

fn render_interaction(app: &App, area: Rect, buf: &mut Buffer) {
    let gate = app.player.gate();
    let Some(interaction) = &app.player.scene().interaction else {
        return;
    };

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let mut lines = Vec::new();

    match interaction {
        Interaction::Choice { question, options } => {
            lines.push(Line::from(Span::styled(question.clone(), bold_style)));
            lines.push(Line::default());
            for (i, option) in options.iter().enumerate() {
                let style = match (gate.selected() == Some(option.id.as_str()), gate.feedback()) {
                    (true, Feedback::Correct) => Style::default().fg(Color::Green).patch(bold_style),
                    (true, Feedback::Incorrect) => Style::default().fg(Color::Red).patch(bold_style),
                    _ => Style::default(),
                };
                lines.push(numbered(i, &option.text, style));
            }
            lines.push(Line::default());
            match gate.feedback() {
                Feedback::Correct => lines.push(Line::from(Span::styled(
                    gate.selected_feedback_text().unwrap_or("Correct!").to_string(),
                    Style::default().fg(Color::Green),
                ))),
                Feedback::Incorrect => {
                    if let Some(text) = gate.selected_feedback_text() {
                        lines.push(Line::from(Span::styled(text.to_string(), Style::default().fg(Color::Red))));
                    }
                    lines.push(Line::from(Span::styled("press r to try again", dim_style)));
                }
                Feedback::None => {}
            }
        }
        Interaction::ClickReveal { prompt, items } => {
            if let Some(prompt) = prompt {
                lines.push(Line::from(Span::styled(prompt.clone(), bold_style)));
                lines.push(Line::default());
            }
            for (i, item) in items.iter().enumerate() {
                if gate.is_revealed(&item.id) {
                    let mut line = numbered(i, &item.label, bold_style);
                    if let Some(detail) = &item.detail {
                        line.spans.push(Span::raw(format!(": {detail}")));
                    }
                    lines.push(line);
                } else {
                    lines.push(numbered(i, &item.label, dim_style));
                }
            }
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                format!("{}/{} opened", gate.revealed_count(), items.len()),
                dim_style,
            )));
        }
    }

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(interaction.kind()))
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

fn render_subtitles(app: &App, area: Rect, buf: &mut Buffer) {
    let spoken_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let pending_style = Style::default().add_modifier(Modifier::DIM);

    let lines: Vec<Line> = app
        .player
        .subtitle()
        .lines()
        .iter()
        .map(|words| {
            let mut spans = Vec::with_capacity(words.len() * 2);
            for (i, word) in words.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::raw(" "));
                }
                let style = if word.emphasized { spoken_style } else { pending_style };
                spans.push(Span::styled(word.text.to_string(), style));
            }
            Line::from(spans)
        })
        .collect();

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP))
        .render(area, buf);
}

fn render_footer(app: &App, area: Rect, buf: &mut Buffer) {
    let play = if app.player.is_playing() { "pause" } else { "play" };
    let mute = if app.player.is_muted() { "unmute" } else { "mute" };
    let help = format!("(space) {play} / (m) {mute} / (←/→) scene / (1-9) answer / (esc) quit");

    Paragraph::new(Span::styled(
        help,
        Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(area, buf);
}

fn render_takeaway(text: &str, area: Rect, buf: &mut Buffer) {
    let inner_width = area
        .width
        .saturating_sub(HORIZONTAL_MARGIN * 2 + 2)
        .min(TAKEAWAY_MAX_WIDTH);
    if inner_width == 0 {
        return;
    }
    let text_lines = (text.width() as u16).div_ceil(inner_width).max(1);
    let height = (text_lines + 2).min(area.height);
    let width = inner_width + 2;
    let overlay = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    Clear.render(overlay, buf);
    Paragraph::new(text.to_string())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green))
                .title("Key takeaway"),
        )
        .render(overlay, buf);
}

fn render_completion(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let lesson = app.player.lesson();

    let runs = app.previous_runs + usize::from(app.recorded);
    let lines = vec![
        Line::from(Span::styled("Lesson complete", bold_style.fg(Color::Green))),
        Line::default(),
        Line::from(Span::styled(lesson.title().to_string(), bold_style)),
        Line::from(format!(
            "{} scenes, {}",
            lesson.len(),
            clock_label(lesson.total_duration())
        )),
        Line::from(Span::styled(
            match runs {
                0 | 1 => "first completion".to_string(),
                n => format!("completed {n} times"),
            },
            dim_style,
        )),
        Line::default(),
        Line::from(Span::styled("(esc) quit", Style::default().add_modifier(Modifier::ITALIC).patch(dim_style))),
    ];

    let height = lines.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
}
