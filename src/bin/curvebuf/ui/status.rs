//! Writer status panel

use curvebuf::CurveError;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Snapshot of what the status panel shows
pub struct StatusLine<'a> {
    pub buffer: &'a str,
    pub frames: usize,
    pub sample_rate: f32,
    pub segments: usize,
    pub clamped: bool,
    pub curvature_bias: f32,
    pub value: f32,
    pub passes: usize,
    pub completions: usize,
    pub error: Option<&'a CurveError>,
}

pub fn render_status(frame: &mut Frame, area: Rect, status: &StatusLine<'_>) {
    let block = Block::default()
        .title(" curvebuf ")
        .borders(Borders::ALL);

    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().add_modifier(Modifier::BOLD);

    let millis = status.frames as f32 * 1000.0 / status.sample_rate.max(1.0);
    let segments = if status.clamped {
        format!("{} (clamped)", status.segments)
    } else {
        status.segments.to_string()
    };

    let first = Line::from(vec![
        Span::styled(" buffer ", label),
        Span::styled(status.buffer.to_owned(), value),
        Span::styled(format!(" {} frames / {millis:.0} ms", status.frames), label),
        Span::styled("  segments ", label),
        Span::styled(segments, value),
        Span::styled("  curve ", label),
        Span::styled(format!("{:+.2}", status.curvature_bias), value),
        Span::styled("  out ", label),
        Span::styled(format!("{:.4}", status.value), value),
        Span::styled("  passes ", label),
        Span::styled(status.passes.to_string(), value),
        Span::styled("  done ", label),
        Span::styled(status.completions.to_string(), value),
    ]);

    let second = match status.error {
        Some(err) => Line::from(Span::styled(
            format!(" {err}"),
            Style::default().fg(Color::Red),
        )),
        None => Line::default(),
    };

    let paragraph = Paragraph::new(vec![first, second]).block(block);
    frame.render_widget(paragraph, area);
}
