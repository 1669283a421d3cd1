use crawl_console_core::{AppViewModel, ButtonView, ErrorId, Phase, PreviewView, ResourceCounts};

const PROGRESS_WIDTH: usize = 30;

/// Single-line regions of the console, each redrawn only when its text changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Status,
    Progress,
    Resources,
    Actions,
    Download,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// An empty text hides the panel.
    SetPanel { panel: Panel, text: String },
    /// Full status log; the console prints entries it has not shown yet.
    SetStatusLog(Vec<String>),
    SetErrors(Vec<(ErrorId, String)>),
    SetPreview(Option<Vec<String>>),
}

pub fn render(view: &AppViewModel) -> Vec<ConsoleCommand> {
    let phase_label = match view.phase {
        Phase::Idle => "Idle",
        Phase::Starting => "Starting",
        Phase::Crawling => "Crawling",
        Phase::Completed => "Completed",
        Phase::Failed => "Failed",
    };
    let updates = if view.feed_connected {
        "live"
    } else if view.polling {
        "polling"
    } else {
        "idle"
    };
    let status_text = format!(
        "Phase: {} | Task: {} | Updates: {}",
        phase_label,
        view.current_task.as_deref().unwrap_or("-"),
        updates
    );

    let progress_text = if view.current_task.is_some() || view.progress > 0 {
        progress_bar(view.progress)
    } else {
        String::new()
    };

    let mut actions = vec![button_label(&view.crawl_button)];
    if view.download_visible {
        actions.push("[Download]".to_string());
    }
    if let Some(button) = &view.preview_button {
        actions.push(button_label(button));
    }

    let download_text = view
        .last_download
        .as_ref()
        .map(|path| format!("Saved archive to {}", path.display()))
        .unwrap_or_default();

    vec![
        ConsoleCommand::SetPanel {
            panel: Panel::Status,
            text: status_text,
        },
        ConsoleCommand::SetPanel {
            panel: Panel::Progress,
            text: progress_text,
        },
        ConsoleCommand::SetStatusLog(view.status_log.clone()),
        ConsoleCommand::SetPanel {
            panel: Panel::Resources,
            text: resources_text(&view.resources),
        },
        ConsoleCommand::SetPanel {
            panel: Panel::Actions,
            text: format!("Actions: {}", actions.join(" ")),
        },
        ConsoleCommand::SetPanel {
            panel: Panel::Download,
            text: download_text,
        },
        ConsoleCommand::SetErrors(
            view.errors
                .iter()
                .map(|banner| (banner.id, banner.message.clone()))
                .collect(),
        ),
        ConsoleCommand::SetPreview(view.preview.as_ref().map(preview_lines)),
    ]
}

fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = PROGRESS_WIDTH * percent as usize / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled),
        percent
    )
}

/// Disabled buttons are shown in parentheses.
fn button_label(button: &ButtonView) -> String {
    if button.enabled {
        format!("[{}]", button.label)
    } else {
        format!("({})", button.label)
    }
}

fn resources_text(counts: &ResourceCounts) -> String {
    if counts.total() == 0 {
        return String::new();
    }
    format!(
        "Resources: HTML {} | CSS {} | JS {} | Images {} | Fonts {} | Other {} ({} files)",
        format_with_commas(counts.html),
        format_with_commas(counts.css),
        format_with_commas(counts.js),
        format_with_commas(counts.images),
        format_with_commas(counts.fonts),
        format_with_commas(counts.other),
        format_with_commas(counts.total())
    )
}

fn preview_lines(preview: &PreviewView) -> Vec<String> {
    let mut lines = vec![format!(
        "Preview: {} pages, {} files",
        preview.pages.len(),
        format_with_commas(preview.total_files)
    )];
    if let Some(notice) = preview.notice {
        lines.push(format!("  {notice}"));
    }
    for page in &preview.pages {
        let title = if page.title.is_empty() {
            "(untitled)"
        } else {
            page.title.as_str()
        };
        lines.push(format!("  {}  {}", title, page.path));
    }
    lines
}

fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}
