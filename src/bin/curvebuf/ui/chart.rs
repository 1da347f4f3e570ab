//! Buffer contents as a line chart

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Most points handed to the chart; longer buffers are decimated.
const MAX_POINTS: usize = 2048;

/// Render the buffer as a curve over normalized time
pub fn render_curve(frame: &mut Frame, area: Rect, samples: &[f32]) {
    let block = Block::default()
        .title(" Buffer ")
        .borders(Borders::ALL);

    let stride = (samples.len() / MAX_POINTS).max(1);
    let data: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .step_by(stride)
        .map(|(i, &sample)| {
            let x = i as f64 / samples.len().max(1) as f64;
            (x, sample as f64)
        })
        .collect();

    let (low, high) = value_bounds(samples);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([low, high])
                .labels([format!("{low:.2}"), format!("{high:.2}")])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

/// Y range covering the samples and at least [-1, 1].
fn value_bounds(samples: &[f32]) -> (f64, f64) {
    samples
        .iter()
        .filter(|s| s.is_finite())
        .fold((-1.0f64, 1.0f64), |(low, high), &s| {
            (low.min(s as f64), high.max(s as f64))
        })
}
