use std::{
    io::{self, Stdout, Write},
    sync::{Mutex, PoisonError},
};

use fortune_pricing::{
    multipliers::MultiplierOutcomeSet,
    presenter::{Presentation, multiplier_label},
    surface::RevealSurface,
};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use tracing::debug;

#[derive(Debug)]
struct Screen<W> {
    out: W,
    reel: Vec<String>,
}

/// Renders the reveal as a single redrawn line of multiplier labels.
#[derive(Debug)]
pub(crate) struct TerminalSurface<W> {
    screen: Mutex<Screen<W>>,
}

impl TerminalSurface<Stdout> {
    pub(crate) fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            screen: Mutex::new(Screen {
                out,
                reel: Vec::new(),
            }),
        }
    }

    fn draw(&self, render: impl FnOnce(&mut Screen<W>) -> io::Result<()>) {
        let mut screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);

        if let Err(error) = render(&mut *screen).and_then(|()| screen.out.flush()) {
            debug!("failed to write to terminal: {error}");
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.screen
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .out
    }
}

impl<W: Write + Send> RevealSurface for TerminalSurface<W> {
    fn set_trigger_enabled(&self, enabled: bool) {
        debug!(enabled, "trigger");
    }

    fn show_reel(&self, multipliers: &MultiplierOutcomeSet) {
        self.draw(|screen| {
            screen.reel = multipliers
                .entries()
                .iter()
                .map(|entry| multiplier_label(entry.multiplier))
                .collect();

            writeln!(screen.out, "Drawing a multiplier...")
        });
    }

    fn highlight(&self, index: Option<usize>) {
        self.draw(|screen| {
            let line = screen
                .reel
                .iter()
                .enumerate()
                .map(|(idx, label)| {
                    if Some(idx) == index {
                        format!("[{label}]")
                    } else {
                        format!(" {label} ")
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");

            write!(screen.out, "\r{line}")
        });
    }

    fn hide_reel(&self) {
        self.draw(|screen| {
            if screen.reel.is_empty() {
                return Ok(());
            }

            screen.reel.clear();

            writeln!(screen.out)
        });
    }

    fn show_result(&self, presentation: &Presentation) {
        self.draw(|screen| {
            writeln!(screen.out, "Multiplier: {}", presentation.multiplier())?;

            if !presentation.lines().is_empty() {
                let mut builder = Builder::default();

                builder.push_record(["#", "Qty", "Final Price"]);

                for line in presentation.lines() {
                    builder.push_record([
                        line.option_number.to_string(),
                        line.quantity.to_string(),
                        line.final_price.clone(),
                    ]);
                }

                let mut table = builder.build();

                table.with(Style::modern_rounded());
                table.modify(Columns::new(1..3), Alignment::right());

                writeln!(screen.out, "{table}")?;
            }

            writeln!(screen.out, "Total Final Price: {}", presentation.formatted_total())
        });
    }

    fn hide_result(&self) {}

    fn show_error(&self, message: &str) {
        self.draw(|screen| writeln!(screen.out, "{message}"));
    }
}
