use std::io::Write;

use psyflow_experiment::{Screen, SessionView};

const RULE: &str = "----------------------------------------";

/// Prints session screens to any writer, stdout by default.
pub struct TerminalView<W: Write = std::io::Stdout> {
    out: W,
}

impl TerminalView {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> TerminalView<W> {
    #[cfg(test)]
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SessionView for TerminalView<W> {
    fn render(&mut self, screen: Screen<'_>) {
        let result = writeln!(self.out, "{RULE}\n{}\n{RULE}", screen.to_text())
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::warn!(screen = screen.name(), error = %e, "could not draw screen");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screens_are_framed() {
        let mut view = TerminalView::new(Vec::new());
        view.render(Screen::PleaseWait);
        let text = String::from_utf8(view.into_inner()).unwrap();
        assert!(text.starts_with(RULE));
        assert!(text.contains("please wait"));
    }
}
