use std::collections::HashMap;
use std::io::{self, BufRead, Stdout};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use crawl_console_core::{update, AppState, AppViewModel, Msg, Phase, TaskId};
use crawl_console_engine::EngineHandle;
use engine_logging::{engine_info, engine_warn};

use super::cli::Cli;
use super::effects::EffectRunner;
use super::input::{parse_command, Command, HELP_TEXT};
use super::settings::{load_settings, save_settings, AppConfig, DownloadRecord, PersistedSettings};
use super::ui::console::Console;
use super::ui::render::render;

pub(crate) enum AppEvent {
    Msg(Msg),
    Input(Command),
    InputClosed,
}

pub fn run_app() -> Result<()> {
    let cli = Cli::parse();
    if let Some(destination) = cli.log_destination() {
        engine_logging::initialize(&destination, cli.log_level());
    }

    let mut saved = load_settings(&cli.settings);
    let config = AppConfig::resolve(&cli, &saved)?;
    config.store_into(&mut saved);
    save_settings(&cli.settings, &saved);
    engine_info!(
        "Crawl console starting server={} output={:?} feed={}",
        config.service.base_url,
        config.service.output_dir,
        config.use_feed
    );

    let (engine, events) = EngineHandle::spawn(&config.service, config.use_feed)
        .context("failed to start the crawl engine")?;
    let (msg_tx, msg_rx) = mpsc::channel::<AppEvent>();
    let effects = EffectRunner::new(engine, events, msg_tx.clone());
    if config.use_feed {
        effects.connect_feed();
    }
    spawn_input_reader(msg_tx);

    let mut app = App {
        state: AppState::with_poll_interval(config.poll_interval),
        effects,
        console: Console::new(io::stdout()),
        settings_path: cli.settings.clone(),
        saved,
        autopilot: Autopilot::new(&config),
        submitted_url: None,
        task_urls: HashMap::new(),
    };
    app.render()?;

    match config.initial_url {
        Some(url) => {
            app.dispatch(Msg::InputChanged(url))?;
            app.dispatch(Msg::CrawlSubmitted)?;
        }
        None => app.console.note(HELP_TEXT)?,
    }

    let one_shot = app.autopilot.one_shot;
    let phase = app.run(msg_rx)?;
    if one_shot && phase != Phase::Completed {
        bail!("crawl did not complete");
    }
    Ok(())
}

fn spawn_input_reader(tx: mpsc::Sender<AppEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if let Some(command) = parse_command(&line) {
                if tx.send(AppEvent::Input(command)).is_err() {
                    return;
                }
            }
        }
        let _ = tx.send(AppEvent::InputClosed);
    });
}

struct App {
    state: AppState,
    effects: EffectRunner,
    console: Console<Stdout>,
    settings_path: PathBuf,
    saved: PersistedSettings,
    autopilot: Autopilot,
    submitted_url: Option<String>,
    task_urls: HashMap<TaskId, String>,
}

/// Why the loop may end. A first `quit` waits for outstanding cleanups so the
/// server releases the task; a second one leaves immediately.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ExitRequest {
    input_closed: bool,
    quit: bool,
    forced: bool,
}

impl ExitRequest {
    fn quit(&mut self) {
        if self.quit {
            self.forced = true;
        }
        self.quit = true;
    }
}

fn ready_to_exit(state: &AppState, autopilot: &Autopilot, request: ExitRequest) -> bool {
    if request.forced {
        return true;
    }
    if request.quit {
        return !state.has_pending_cleanup();
    }
    if autopilot.one_shot {
        autopilot.finished(&state.view())
    } else {
        request.input_closed && state.is_settled()
    }
}

impl App {
    fn run(mut self, rx: mpsc::Receiver<AppEvent>) -> Result<Phase> {
        let mut request = ExitRequest::default();
        while !ready_to_exit(&self.state, &self.autopilot, request) {
            let Ok(event) = rx.recv() else {
                break;
            };
            match event {
                AppEvent::Msg(msg) => self.dispatch(msg)?,
                AppEvent::Input(Command::Send(msgs)) => {
                    for msg in msgs {
                        self.dispatch(msg)?;
                    }
                }
                AppEvent::Input(Command::Help) => self.console.note(HELP_TEXT)?,
                AppEvent::Input(Command::Unknown(line)) => self
                    .console
                    .note(&format!("Unknown command: {line}\n{HELP_TEXT}"))?,
                AppEvent::Input(Command::Quit) => {
                    request.quit();
                    if !request.forced && self.state.has_pending_cleanup() {
                        self.console.note(
                            "Waiting for the server to clean up the task (quit again to exit now)",
                        )?;
                    }
                }
                AppEvent::InputClosed => request.input_closed = true,
            }
        }

        self.effects.shutdown();
        engine_info!("Crawl console exiting in phase {:?}", self.state.phase());
        Ok(self.state.phase())
    }

    fn dispatch(&mut self, msg: Msg) -> Result<()> {
        self.observe(&msg);

        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let dirty = state.consume_dirty();
        self.state = state;
        self.effects.enqueue(effects);
        if dirty {
            self.render()?;
        }

        let view = self.state.view();
        for follow_up in self.autopilot.follow_up(&view) {
            self.dispatch(follow_up)?;
        }
        Ok(())
    }

    fn observe(&mut self, msg: &Msg) {
        match msg {
            Msg::CrawlSubmitted => {
                self.submitted_url = Some(self.state.view().input.trim().to_string());
            }
            Msg::CrawlStarted { task_id } => {
                if let Some(url) = self.submitted_url.take() {
                    self.task_urls.insert(task_id.clone(), url);
                }
            }
            Msg::DownloadFinished { task_id, path } => self.record_download(task_id, path),
            _ => {}
        }
    }

    fn record_download(&mut self, task_id: &str, path: &std::path::Path) {
        self.saved.record_download(DownloadRecord {
            task_id: task_id.to_string(),
            url: self.task_urls.get(task_id).cloned(),
            path: path.to_path_buf(),
            downloaded_utc: Utc::now().to_rfc3339(),
        });
        save_settings(&self.settings_path, &self.saved);
    }

    fn render(&mut self) -> Result<()> {
        let view = self.state.view();
        if let Err(err) = self.console.apply(render(&view)) {
            engine_warn!("Failed to write to the terminal: {}", err);
            return Err(err.into());
        }
        Ok(())
    }
}

/// Drives the optional unattended run: a crawl given on the command line,
/// followed by preview and/or download once the archive is ready.
#[derive(Debug)]
struct Autopilot {
    one_shot: bool,
    preview: bool,
    download: bool,
    handled_task: Option<TaskId>,
}

impl Autopilot {
    fn new(config: &AppConfig) -> Self {
        Self {
            one_shot: config.initial_url.is_some(),
            preview: config.auto_preview,
            download: config.auto_download,
            handled_task: None,
        }
    }

    /// Clicks to issue for a freshly completed task; each task is handled once.
    fn follow_up(&mut self, view: &AppViewModel) -> Vec<Msg> {
        if !view.download_visible || view.current_task == self.handled_task {
            return Vec::new();
        }
        self.handled_task = view.current_task.clone();

        let mut msgs = Vec::new();
        if self.preview {
            msgs.push(Msg::PreviewClicked);
        }
        if self.download {
            msgs.push(Msg::DownloadClicked);
        }
        msgs
    }

    fn finished(&self, view: &AppViewModel) -> bool {
        if !view.settled {
            return false;
        }
        match view.phase {
            Phase::Completed => view.current_task == self.handled_task,
            Phase::Failed | Phase::Idle => true,
            Phase::Starting | Phase::Crawling => false,
        }
    }
}
