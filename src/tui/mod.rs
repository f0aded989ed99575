pub mod app;
pub mod ui;

use std::io;
use std::path::Path;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::ProcessError;
use crate::models::{ProcessedResult, TransferEvent};
use crate::session::{PendingTransfer, Session, SessionEvent};
use crate::transfer::{ChannelListener, Orchestrator};

use app::{App, Field, View};

/// Everything the event loop reacts to, in arrival order.
enum UiMessage {
    Key(KeyEvent),
    Transfer(TransferEvent),
    Finished {
        id: u64,
        outcome: Result<ProcessedResult, ProcessError>,
    },
}

pub async fn run(config: &ClientConfig, initial_file: Option<&Path>) -> Result<()> {
    let orchestrator = Orchestrator::new(config.transfer_settings())?;
    let session = Session::new(config.max_upload_bytes);
    let mut app = App::new(session, config.endpoint.clone(), config.output_dir.clone());

    if let Some(path) = initial_file {
        app.path_input = path.display().to_string();
        app.load_path();
    }

    let (tx, rx) = mpsc::unbounded_channel::<UiMessage>();

    // Keyboard input blocks, so it gets its own thread.
    let key_tx = tx.clone();
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(Event::Key(key)) => {
                if key_tx.send(UiMessage::Key(key)).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    });

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    info!("TUI started against {}", config.endpoint);
    let result = run_loop(&mut terminal, &mut app, &orchestrator, tx, rx).await;

    // Restore terminal
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result
}

fn spawn_transfer(orchestrator: &Orchestrator, pending: PendingTransfer, tx: mpsc::UnboundedSender<UiMessage>) {
    let orchestrator = orchestrator.clone();
    tokio::spawn(async move {
        let mut listener = ChannelListener::new(tx.clone(), UiMessage::Transfer);
        let outcome = orchestrator
            .transfer(&pending.payload, &mut listener, &pending.cancel)
            .await;
        let _ = tx.send(UiMessage::Finished {
            id: pending.id,
            outcome,
        });
    });
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    orchestrator: &Orchestrator,
    tx: mpsc::UnboundedSender<UiMessage>,
    mut rx: mpsc::UnboundedReceiver<UiMessage>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let Some(message) = rx.recv().await else {
            break;
        };

        match message {
            UiMessage::Transfer(event) => {
                app.session.apply(SessionEvent::Transfer(event));
            }
            UiMessage::Finished { id, outcome } => {
                debug!("transfer #{} resolved (ok={})", id, outcome.is_ok());
                app.session.apply(SessionEvent::Finished { id, outcome });
            }
            UiMessage::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(pending) = handle_key(app, key) {
                    spawn_transfer(orchestrator, pending, tx.clone());
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Apply one key press. Returns a transfer to start if it triggered a submit.
fn handle_key(app: &mut App, key: KeyEvent) -> Option<PendingTransfer> {
    // Notices are modal: nothing else gets through until dismissed.
    if app.session.notice().is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.session.apply(SessionEvent::DismissNotice);
        }
        return None;
    }

    if app.view == View::About {
        if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q')) {
            app.view = View::Main;
        }
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Char('r') => app.reset(),
            KeyCode::Char('p') => {
                app.session.apply(SessionEvent::TogglePlayback);
            }
            KeyCode::Char('d') => app.download(),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Esc => {
            app.should_quit = true;
            return None;
        }
        KeyCode::F(1) => {
            app.view = View::About;
            return None;
        }
        KeyCode::Tab | KeyCode::Down => {
            app.focus_next();
            return None;
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.focus_prev();
            return None;
        }
        _ => {}
    }

    match app.focus {
        Field::File => match key.code {
            KeyCode::Enter => {
                app.load_path();
                app.focus_next();
            }
            KeyCode::Backspace => {
                app.path_input.pop();
            }
            KeyCode::Char(c) => app.path_input.push(c),
            _ => {}
        },
        Field::Mode => {
            if matches!(key.code, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') | KeyCode::Enter) {
                app.toggle_mode();
            }
        }
        Field::Semitones => match key.code {
            KeyCode::Left => app.step_semitones(-1),
            KeyCode::Right => app.step_semitones(1),
            KeyCode::Backspace => app.type_number(None),
            KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => app.type_number(Some(c)),
            KeyCode::Enter => app.focus_next(),
            _ => {}
        },
        Field::Note => match key.code {
            KeyCode::Backspace => app.type_note(None),
            KeyCode::Char(c) => app.type_note(Some(c)),
            KeyCode::Enter => app.focus_next(),
            _ => {}
        },
        Field::Submit => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                return app.submit();
            }
        }
    }

    None
}
