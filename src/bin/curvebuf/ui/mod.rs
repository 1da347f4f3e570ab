//! TUI module for curvebuf
//!
//! Shows the destination buffer as a chart and drives the writer from the
//! keyboard.

mod chart;
mod status;

use std::{sync::Arc, time::Duration};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use curvebuf::{
    engine::{MemoryBufferStore, SharedBuffer, WorkerScheduler},
    io::{converter::parse_message, Atom, Message},
    CurveError, CurveWriter,
};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;

use chart::render_curve;
use status::{render_status, StatusLine};

type Writer = CurveWriter<MemoryBufferStore, WorkerScheduler>;

const BIAS_STEP: f32 = 0.1;

/// UI application state
pub struct CurveApp {
    writer: Writer,
    /// The buffer the writer draws into
    buffer: Arc<SharedBuffer>,
    /// Completion notifications from the scheduler thread
    completion_rx: Consumer<()>,
    /// List re-sent with R
    values: Vec<f32>,
    /// Latest copy of the buffer contents
    samples: Vec<f32>,
    completions: usize,
    passes: usize,
    last_error: Option<CurveError>,
    /// Message being typed after `:`
    input: Option<String>,
    should_quit: bool,
}

impl CurveApp {
    pub fn new(
        writer: Writer,
        buffer: Arc<SharedBuffer>,
        completion_rx: Consumer<()>,
        values: Vec<f32>,
    ) -> Self {
        let samples = buffer.snapshot();
        Self {
            writer,
            buffer,
            completion_rx,
            values,
            samples,
            completions: 0,
            passes: 0,
            last_error: None,
            input: None,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_completions();
            self.poll_buffer();

            terminal.draw(|frame| self.render(frame))?;

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        Ok(())
    }

    /// Compile and draw the stored list.
    pub fn send_list(&mut self) {
        let values = self.values.clone();
        let result = self.writer.list_values(&values);
        self.record(result.map(|outcome| outcome.is_some()));
    }

    fn render_next(&mut self) {
        let result = self.writer.render();
        self.record(result.map(|_| true));
    }

    fn dispatch(&mut self, line: &str) {
        let result = parse_message(line).and_then(|message| {
            // Keep typed lists around for R
            if let Message::List(atoms) = &message {
                let values: Option<Vec<f32>> = atoms.iter().map(Atom::as_float).collect();
                if let Some(values) = values {
                    self.values = values;
                }
            }
            self.writer.handle_message(message)
        });
        self.record(result.map(|()| true));
    }

    fn record(&mut self, result: Result<bool, CurveError>) {
        match result {
            Ok(rendered) => {
                if rendered {
                    self.passes += 1;
                }
                self.last_error = None;
            }
            Err(err) => self.last_error = Some(err),
        }
    }

    fn poll_completions(&mut self) {
        while let Ok(()) = self.completion_rx.pop() {
            self.completions += 1;
        }
    }

    fn poll_buffer(&mut self) {
        if self.buffer.take_dirty() {
            self.samples = self.buffer.snapshot();
        }
    }

    /// Handle keyboard input
    fn handle_key(&mut self, key: KeyCode) {
        if self.input.is_some() {
            self.handle_input_key(key);
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.send_list(),
            KeyCode::Char(' ') => self.render_next(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_bias(BIAS_STEP),
            KeyCode::Char('-') => self.nudge_bias(-BIAS_STEP),
            KeyCode::Char(':') => self.input = Some(String::new()),
            _ => {}
        }
    }

    /// Keys while a message is being typed
    fn handle_input_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                if let Some(line) = self.input.take() {
                    self.dispatch(&line);
                }
            }
            KeyCode::Esc => self.input = None,
            KeyCode::Backspace => {
                if let Some(input) = self.input.as_mut() {
                    input.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(input) = self.input.as_mut() {
                    input.push(c);
                }
            }
            _ => {}
        }
    }

    fn nudge_bias(&mut self, delta: f32) {
        let bias = self.writer.curvature_bias() + delta;
        self.writer.set_curvature_bias(bias);
    }

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // Main layout: status, chart, help
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Status
                Constraint::Min(8),    // Buffer chart
                Constraint::Length(1), // Help / input
            ])
            .split(area);

        let generator = self.writer.generator();
        let status = StatusLine {
            buffer: self.writer.buffer_name().unwrap_or("-"),
            frames: self.writer.buffer_frames(),
            sample_rate: self.writer.config().sample_rate,
            segments: generator.segments().len(),
            clamped: generator.segments().was_clamped(),
            curvature_bias: self.writer.curvature_bias(),
            value: self.writer.value(),
            passes: self.passes,
            completions: self.completions,
            error: self.last_error.as_ref(),
        };
        render_status(frame, chunks[0], &status);

        render_curve(frame, chunks[1], &self.samples);

        let help = match &self.input {
            Some(input) => Paragraph::new(format!(" :{input}"))
                .style(Style::default().fg(Color::Yellow)),
            None => Paragraph::new(
                " [Q] Quit  [R] Re-send list  [Space] Next buffer  [+/-] Curve  [:] Message",
            )
            .style(Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(help, chunks[2]);
    }
}
