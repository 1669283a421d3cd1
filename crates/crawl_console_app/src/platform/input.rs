use crawl_console_core::{ErrorId, Msg};

/// One line typed on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Messages to feed through `update`, in order.
    Send(Vec<Msg>),
    Help,
    Quit,
    Unknown(String),
}

pub(crate) const HELP_TEXT: &str = "Commands: crawl <url> | preview | download | dismiss <id> | help | quit";

pub(crate) fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        // A bare `crawl` resubmits whatever the input already holds.
        "crawl" if rest.is_empty() => Command::Send(vec![Msg::CrawlSubmitted]),
        "crawl" => Command::Send(vec![
            Msg::InputChanged(rest.to_string()),
            Msg::CrawlSubmitted,
        ]),
        "preview" => Command::Send(vec![Msg::PreviewClicked]),
        "download" => Command::Send(vec![Msg::DownloadClicked]),
        "dismiss" => match rest.parse::<ErrorId>() {
            Ok(id) => Command::Send(vec![Msg::ErrorDismissed(id)]),
            Err(_) => Command::Unknown(line.to_string()),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn crawl_sets_input_then_submits() {
        assert_eq!(
            parse_command("  crawl   https://example.com "),
            Some(Command::Send(vec![
                Msg::InputChanged("https://example.com".to_string()),
                Msg::CrawlSubmitted,
            ]))
        );
        assert_eq!(
            parse_command("crawl"),
            Some(Command::Send(vec![Msg::CrawlSubmitted]))
        );
    }

    #[test]
    fn simple_commands_map_to_clicks() {
        assert_eq!(
            parse_command("preview"),
            Some(Command::Send(vec![Msg::PreviewClicked]))
        );
        assert_eq!(
            parse_command("DOWNLOAD"),
            Some(Command::Send(vec![Msg::DownloadClicked]))
        );
        assert_eq!(parse_command("quit"), Some(Command::Quit));
        assert_eq!(parse_command("help"), Some(Command::Help));
    }

    #[test]
    fn dismiss_needs_a_numeric_id() {
        assert_eq!(
            parse_command("dismiss 3"),
            Some(Command::Send(vec![Msg::ErrorDismissed(3)]))
        );
        assert_eq!(
            parse_command("dismiss x"),
            Some(Command::Unknown("dismiss x".to_string()))
        );
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_command("   "), None);
        assert_eq!(
            parse_command("fly away"),
            Some(Command::Unknown("fly away".to_string()))
        );
    }
}
