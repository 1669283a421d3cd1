use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use crawl_console_core::ErrorId;

use super::render::{ConsoleCommand, Panel};

/// Line-oriented terminal surface. It remembers what it already printed so
/// repeated renders of an unchanged view stay silent.
pub struct Console<W: Write> {
    out: W,
    panels: HashMap<Panel, String>,
    log_printed: usize,
    errors_shown: HashSet<ErrorId>,
    preview: Option<Vec<String>>,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            panels: HashMap::new(),
            log_printed: 0,
            errors_shown: HashSet::new(),
            preview: None,
        }
    }

    pub fn apply(&mut self, commands: Vec<ConsoleCommand>) -> io::Result<()> {
        for command in commands {
            match command {
                ConsoleCommand::SetPanel { panel, text } => self.set_panel(panel, text)?,
                ConsoleCommand::SetStatusLog(lines) => self.set_status_log(&lines)?,
                ConsoleCommand::SetErrors(errors) => self.set_errors(errors)?,
                ConsoleCommand::SetPreview(lines) => self.set_preview(lines)?,
            }
        }
        self.out.flush()
    }

    /// Free-form line outside the rendered view (help text, warnings).
    pub fn note(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    fn set_panel(&mut self, panel: Panel, text: String) -> io::Result<()> {
        if self.panels.get(&panel) == Some(&text) {
            return Ok(());
        }
        if !text.is_empty() {
            writeln!(self.out, "{text}")?;
        }
        self.panels.insert(panel, text);
        Ok(())
    }

    fn set_status_log(&mut self, lines: &[String]) -> io::Result<()> {
        // A shorter log means a new crawl replaced the old one.
        if lines.len() < self.log_printed {
            self.log_printed = 0;
            if !lines.is_empty() {
                writeln!(self.out, "----")?;
            }
        }
        for line in &lines[self.log_printed..] {
            writeln!(self.out, "  {line}")?;
        }
        self.log_printed = lines.len();
        Ok(())
    }

    fn set_errors(&mut self, errors: Vec<(ErrorId, String)>) -> io::Result<()> {
        // Oldest first so the newest banner ends up closest to the prompt.
        for (id, message) in errors.iter().rev() {
            if !self.errors_shown.contains(id) {
                writeln!(self.out, "Error #{id}: {message} (dismiss {id})")?;
            }
        }
        self.errors_shown = errors.into_iter().map(|(id, _)| id).collect();
        Ok(())
    }

    fn set_preview(&mut self, lines: Option<Vec<String>>) -> io::Result<()> {
        if self.preview == lines {
            return Ok(());
        }
        if let Some(lines) = &lines {
            for line in lines {
                writeln!(self.out, "{line}")?;
            }
        }
        self.preview = lines;
        Ok(())
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(console: &Console<Vec<u8>>) -> String {
        String::from_utf8(console.output().clone()).unwrap()
    }

    fn panel(panel: Panel, text: &str) -> ConsoleCommand {
        ConsoleCommand::SetPanel {
            panel,
            text: text.to_string(),
        }
    }

    #[test]
    fn unchanged_panels_are_not_reprinted() {
        let mut console = Console::new(Vec::new());
        console.apply(vec![panel(Panel::Status, "Phase: Idle")]).unwrap();
        console.apply(vec![panel(Panel::Status, "Phase: Idle")]).unwrap();
        console
            .apply(vec![panel(Panel::Status, "Phase: Crawling")])
            .unwrap();
        assert_eq!(text(&console), "Phase: Idle\nPhase: Crawling\n");
    }

    #[test]
    fn empty_panel_text_is_silent() {
        let mut console = Console::new(Vec::new());
        console.apply(vec![panel(Panel::Download, "")]).unwrap();
        assert_eq!(text(&console), "");
    }

    #[test]
    fn status_log_prints_only_new_entries_and_restarts_after_reset() {
        let mut console = Console::new(Vec::new());
        let log = |lines: &[&str]| {
            ConsoleCommand::SetStatusLog(lines.iter().map(|s| s.to_string()).collect())
        };
        console.apply(vec![log(&["a"])]).unwrap();
        console.apply(vec![log(&["a", "b"])]).unwrap();
        console.apply(vec![log(&[])]).unwrap();
        console.apply(vec![log(&["c"])]).unwrap();
        assert_eq!(text(&console), "  a\n  b\n  c\n");
    }

    #[test]
    fn shrinking_non_empty_log_prints_separator() {
        let mut console = Console::new(Vec::new());
        console
            .apply(vec![ConsoleCommand::SetStatusLog(vec![
                "a".to_string(),
                "b".to_string(),
            ])])
            .unwrap();
        console
            .apply(vec![ConsoleCommand::SetStatusLog(vec!["x".to_string()])])
            .unwrap();
        assert_eq!(text(&console), "  a\n  b\n----\n  x\n");
    }

    #[test]
    fn errors_are_announced_once() {
        let mut console = Console::new(Vec::new());
        console
            .apply(vec![ConsoleCommand::SetErrors(vec![(1, "boom".to_string())])])
            .unwrap();
        console
            .apply(vec![ConsoleCommand::SetErrors(vec![
                (2, "again".to_string()),
                (1, "boom".to_string()),
            ])])
            .unwrap();
        console.apply(vec![ConsoleCommand::SetErrors(vec![])]).unwrap();
        assert_eq!(
            text(&console),
            "Error #1: boom (dismiss 1)\nError #2: again (dismiss 2)\n"
        );
    }

    #[test]
    fn preview_is_printed_when_it_changes() {
        let mut console = Console::new(Vec::new());
        let preview = ConsoleCommand::SetPreview(Some(vec!["Preview: 0 pages".to_string()]));
        console.apply(vec![preview.clone()]).unwrap();
        console.apply(vec![preview]).unwrap();
        console.apply(vec![ConsoleCommand::SetPreview(None)]).unwrap();
        assert_eq!(text(&console), "Preview: 0 pages\n");
    }
}
