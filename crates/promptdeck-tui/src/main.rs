//! Terminal UI for browsing the prompt library and chatting against the
//! configured completion API.

mod app;
mod clipboard;
mod event;
mod markdown;
mod ui;

use anyhow::Context;
use app::{App, CopyTarget, Overlay, PURGE_CHOICES, PurgeChoice, View};
use clap::Parser;
use clipboard::copy_to_clipboard;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyCode, KeyEvent,
    KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use event::AppEvent;
use log::{debug, info, warn};
use promptdeck_client::{ChatCompletionsClient, RestUpvoteClient};
use promptdeck_config::{CredentialStore, PromptdeckConfig};
use promptdeck_core::{
    ChatHistoryStore, ChatSessionManager, PromptCatalog, Upvoter, VoteGuard,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Command-line options for the promptdeck TUI.
#[derive(Parser)]
#[command(name = "promptdeck", version)]
struct Cli {
    /// Optional path to a promptdeck.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the prompt snapshot directory
    #[arg(long)]
    prompts: Option<PathBuf>,
    /// Override the local data directory
    #[arg(long)]
    data: Option<PathBuf>,
}

/// Long-lived services shared by the event handlers.
struct Services {
    config: PromptdeckConfig,
    history: Arc<ChatHistoryStore>,
    credentials: CredentialStore,
    upvoter: Option<Arc<Upvoter>>,
}

/// Entry point for the promptdeck TUI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    info!(
        "starting TUI (config_set={}, prompts_set={})",
        cli.config.is_some(),
        cli.prompts.is_some()
    );
    let config = if let Some(path) = cli.config.as_ref() {
        PromptdeckConfig::load_from_path(path).context("failed to load config")?
    } else {
        let cwd = std::env::current_dir().context("cwd")?;
        let layered =
            PromptdeckConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };

    let prompts_dir = cli
        .prompts
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.catalog.path));
    let data_dir = cli.data.clone().unwrap_or_else(|| config.data_dir());

    let history = Arc::new(
        ChatHistoryStore::new(data_dir.join("chats")).context("failed to open chat store")?,
    );
    let credentials =
        CredentialStore::new(&data_dir).context("failed to open credential store")?;
    let guard = VoteGuard::new(&data_dir).context("failed to open vote guard")?;
    let upvoter = RestUpvoteClient::from_config(&config.store)
        .map(|client| Arc::new(Upvoter::new(guard, Arc::new(client))));

    let mut app = App::new();
    match PromptCatalog::load(&prompts_dir).await {
        Ok(catalog) => app.set_catalog(&catalog),
        Err(err) => {
            warn!("failed to load prompt catalog: {err}");
            app.catalog_error = Some(err.to_string());
        }
    }
    app.credential_present = credentials.get().unwrap_or(None).is_some();

    let services = Services {
        config,
        history,
        credentials,
        upvoter,
    };

    let mut terminal = setup_terminal()?;
    let (tx, mut rx) = mpsc::channel(256);
    spawn_input_handler(tx.clone());
    spawn_tick(tx.clone());
    refresh_upvotes(&services, tx.clone());

    loop {
        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        let Some(event) = rx.recv().await else { break };
        if handle_app_event(event, &services, &mut app, tx.clone()) {
            break;
        }
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}

/// Dispatch a UI event and return true when the app should exit.
fn handle_app_event(
    event: AppEvent,
    services: &Services,
    app: &mut App,
    sender: mpsc::Sender<AppEvent>,
) -> bool {
    match event {
        AppEvent::Input(key) => handle_input(key, services, app, sender),
        AppEvent::Tick => {
            app.tick();
            false
        }
        AppEvent::Scroll(delta) => {
            if delta < 0 {
                app.scroll_up((-delta) as u16);
            } else if delta > 0 {
                app.scroll_down(delta as u16);
            }
            false
        }
        AppEvent::UpvotesLoaded(upvotes) => {
            app.set_upvotes(upvotes);
            false
        }
        AppEvent::TurnCompleted { slug } => {
            info!("turn completed (slug={slug})");
            if app
                .session
                .as_ref()
                .is_some_and(|session| session.slug() == slug)
            {
                app.sending_since = None;
                app.waiting_hint = None;
                app.auto_scroll = true;
                app.push_status("idle");
            }
            false
        }
        AppEvent::ActionError(message) => {
            warn!("action failed: {message}");
            app.push_status(message);
            false
        }
    }
}

/// Handle keyboard input and dispatch actions.
fn handle_input(
    key: KeyEvent,
    services: &Services,
    app: &mut App,
    sender: mpsc::Sender<AppEvent>,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    if app.overlay.is_some() {
        handle_overlay_input(key, services, app);
        return false;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('p') {
        app.credential_input.clear();
        app.credential_present = services.credentials.get().unwrap_or(None).is_some();
        app.overlay = Some(Overlay::Settings);
        return false;
    }

    match app.view {
        View::Catalog => handle_catalog_input(key, services, app, sender),
        View::Detail => {
            handle_detail_input(key, services, app, sender);
            false
        }
        View::Chat => {
            handle_chat_input(key, app, sender);
            false
        }
    }
}

/// Keys in the catalog view. Plain characters feed the search box.
fn handle_catalog_input(
    key: KeyEvent,
    services: &Services,
    app: &mut App,
    sender: mpsc::Sender<AppEvent>,
) -> bool {
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        KeyCode::PageUp => {
            for _ in 0..5 {
                app.select_previous();
            }
        }
        KeyCode::PageDown => {
            for _ in 0..5 {
                app.select_next();
            }
        }
        KeyCode::Tab => app.cycle_category(),
        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => app.toggle_sort(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            upvote_selected(services, app, sender);
        }
        KeyCode::Enter => {
            if let Some(prompt) = app.selected_prompt().cloned() {
                app.open_detail(&prompt);
            }
        }
        KeyCode::Backspace => {
            app.search.pop();
            app.selected = 0;
        }
        KeyCode::Char(ch) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                app.search.push(ch);
                app.selected = 0;
            }
        }
        _ => {}
    }
    false
}

/// Keys in the detail view: copy/share/upvote affordances and chat entry.
fn handle_detail_input(
    key: KeyEvent,
    services: &Services,
    app: &mut App,
    sender: mpsc::Sender<AppEvent>,
) {
    match key.code {
        KeyCode::Esc => app.back_to_catalog(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(5),
        KeyCode::PageDown => app.scroll_down(5),
        KeyCode::Tab => app.cycle_code_block(),
        KeyCode::Char('c') => {
            if let Some(prompt) = current_prompt(app) {
                let text = format!("{}\n\n{}", prompt.title, prompt.content);
                copy_with_feedback(app, &text, CopyTarget::Prompt, "prompt copied");
            }
        }
        KeyCode::Char('s') => {
            if let Some(prompt) = current_prompt(app) {
                let url = format!(
                    "{}/prompt/{}",
                    services.config.share.base_url.trim_end_matches('/'),
                    prompt.slug
                );
                copy_with_feedback(app, &url, CopyTarget::ShareLink, "share link copied");
            }
        }
        KeyCode::Char('y') => {
            let block = app.detail.code_blocks.get(app.selected_block).cloned();
            if let Some(block) = block {
                let index = app.selected_block;
                copy_with_feedback(app, &block.code, CopyTarget::CodeBlock(index), "code copied");
            }
        }
        KeyCode::Char('u') => upvote_selected_detail(services, app, sender),
        KeyCode::Enter => open_chat(services, app),
        _ => {}
    }
}

/// Keys in the chat view. Plain characters feed the message box.
fn handle_chat_input(key: KeyEvent, app: &mut App, sender: mpsc::Sender<AppEvent>) {
    match key.code {
        KeyCode::Esc => app.back_to_detail(),
        KeyCode::Enter => submit_chat(app, sender),
        KeyCode::Up if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.select_previous_message();
        }
        KeyCode::Down if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.select_next_message();
        }
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(5),
        KeyCode::PageDown => app.scroll_down(5),
        KeyCode::Char('y') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let message = app.session.as_ref().and_then(|session| {
                session
                    .visible_messages()
                    .get(app.selected_message)
                    .cloned()
            });
            if let Some(message) = message {
                let index = app.selected_message;
                copy_with_feedback(app, &message.content, CopyTarget::Message(index), "copied");
            }
        }
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if app.session.is_some() {
                app.overlay = Some(Overlay::ConfirmClearChat);
            }
        }
        KeyCode::Backspace => {
            app.chat_input.pop();
        }
        KeyCode::Char(ch) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                app.chat_input.push(ch);
            }
        }
        _ => {}
    }
}

/// Keys while an overlay is open.
fn handle_overlay_input(key: KeyEvent, services: &Services, app: &mut App) {
    match app.overlay {
        Some(Overlay::Settings) => match key.code {
            KeyCode::Esc => {
                app.overlay = None;
                app.credential_input.clear();
            }
            KeyCode::Enter => {
                let credential = std::mem::take(&mut app.credential_input);
                match services.credentials.set(&credential) {
                    Ok(()) => {
                        app.credential_present =
                            services.credentials.get().unwrap_or(None).is_some();
                        app.push_status(if app.credential_present {
                            "API key saved"
                        } else {
                            "API key cleared"
                        });
                    }
                    Err(err) => app.push_status(format!("failed to save key: {err}")),
                }
            }
            KeyCode::Char('f') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                match services.credentials.forget() {
                    Ok(()) => {
                        app.credential_present = false;
                        app.push_status("API key forgotten");
                    }
                    Err(err) => app.push_status(format!("failed to forget key: {err}")),
                }
            }
            KeyCode::Tab => {
                app.purge_index = (app.purge_index + 1) % PURGE_CHOICES.len();
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.overlay = Some(Overlay::ConfirmPurge);
            }
            KeyCode::Backspace => {
                app.credential_input.pop();
            }
            KeyCode::Char(ch) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL) {
                    app.credential_input.push(ch);
                }
            }
            _ => {}
        },
        Some(Overlay::CredentialPrompt) => match key.code {
            KeyCode::Esc => {
                app.overlay = None;
                app.credential_input.clear();
            }
            KeyCode::Enter => {
                let credential = std::mem::take(&mut app.credential_input);
                if credential.trim().is_empty() {
                    app.push_status("API key is required");
                    return;
                }
                match services.credentials.set(&credential) {
                    Ok(()) => {
                        app.credential_present = true;
                        app.overlay = None;
                        open_chat(services, app);
                    }
                    Err(err) => app.push_status(format!("failed to save key: {err}")),
                }
            }
            KeyCode::Backspace => {
                app.credential_input.pop();
            }
            KeyCode::Char(ch) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL) {
                    app.credential_input.push(ch);
                }
            }
            _ => {}
        },
        Some(Overlay::ConfirmClearChat) => match key.code {
            KeyCode::Char('y') => {
                if let Some(session) = app.session.clone() {
                    match session.clear() {
                        Ok(()) => app.push_status("chat history cleared"),
                        Err(err) => app.push_status(format!("failed to clear chat: {err}")),
                    }
                }
                app.overlay = None;
            }
            KeyCode::Char('n') | KeyCode::Esc => app.overlay = None,
            _ => {}
        },
        Some(Overlay::ConfirmPurge) => match key.code {
            KeyCode::Char('y') => {
                let result = match PURGE_CHOICES[app.purge_index] {
                    PurgeChoice::Days(days) => services.history.purge_older_than(days),
                    PurgeChoice::All => services.history.purge_all(),
                };
                match result {
                    Ok(removed) => app.push_status(format!("purged {removed} chats")),
                    Err(err) => app.push_status(format!("failed to purge chats: {err}")),
                }
                app.overlay = Some(Overlay::Settings);
            }
            KeyCode::Char('n') | KeyCode::Esc => app.overlay = Some(Overlay::Settings),
            _ => {}
        },
        None => {}
    }
}

/// The prompt shown in the detail view, if still present.
fn current_prompt(app: &App) -> Option<promptdeck_core::Prompt> {
    let slug = app.detail_slug.as_ref()?;
    app.prompts
        .iter()
        .find(|prompt| &prompt.slug == slug)
        .cloned()
}

/// Copy text and record the 2-second acknowledgment.
fn copy_with_feedback(app: &mut App, text: &str, target: CopyTarget, status: &str) {
    match copy_to_clipboard(text) {
        Ok(()) => {
            app.set_copied(target);
            app.push_status(status);
        }
        Err(err) => app.push_status(format!("copy failed: {err}")),
    }
}

/// Upvote the prompt selected in the catalog.
fn upvote_selected(services: &Services, app: &mut App, sender: mpsc::Sender<AppEvent>) {
    let Some(prompt) = app.selected_prompt().cloned() else {
        return;
    };
    spawn_upvote(services, app, prompt.slug, sender);
}

/// Upvote the prompt shown in the detail view.
fn upvote_selected_detail(services: &Services, app: &mut App, sender: mpsc::Sender<AppEvent>) {
    let Some(prompt) = current_prompt(app) else {
        return;
    };
    spawn_upvote(services, app, prompt.slug, sender);
}

/// Run the guarded upvote in the background, then refresh the counts.
fn spawn_upvote(services: &Services, app: &mut App, slug: String, sender: mpsc::Sender<AppEvent>) {
    let Some(upvoter) = services.upvoter.clone() else {
        app.push_status("upvote store not configured");
        return;
    };
    if upvoter.has_voted(&slug) {
        app.push_status("already upvoted");
        return;
    }
    app.push_status("upvoting");
    tokio::spawn(async move {
        debug!("dispatching upvote (slug={slug})");
        match upvoter.upvote(&slug).await {
            Ok(_) => match upvoter.load_all().await {
                Ok(upvotes) => {
                    let _ = sender.send(AppEvent::UpvotesLoaded(upvotes)).await;
                }
                Err(err) => {
                    let _ = sender
                        .send(AppEvent::ActionError(format!("upvote refresh failed: {err}")))
                        .await;
                }
            },
            Err(err) => {
                let _ = sender
                    .send(AppEvent::ActionError(format!("upvote failed: {err}")))
                    .await;
            }
        }
    });
}

/// Open the chat view for the detail prompt, gated on the credential.
fn open_chat(services: &Services, app: &mut App) {
    let Some(prompt) = current_prompt(app) else {
        return;
    };
    let credential = match services.credentials.get() {
        Ok(Some(credential)) => credential,
        Ok(None) => {
            app.credential_input.clear();
            app.overlay = Some(Overlay::CredentialPrompt);
            return;
        }
        Err(err) => {
            app.push_status(format!("failed to read credential: {err}"));
            return;
        }
    };

    let backend = Arc::new(ChatCompletionsClient::new(&services.config.chat, credential));
    match ChatSessionManager::open(
        prompt.slug.clone(),
        prompt.content.clone(),
        services.history.clone(),
        backend,
    ) {
        Ok(session) => app.open_chat(session),
        Err(err) => app.push_status(format!("failed to open chat: {err}")),
    }
}

/// Submit the chat input to the session in the background.
fn submit_chat(app: &mut App, sender: mpsc::Sender<AppEvent>) {
    let Some(session) = app.session.clone() else {
        return;
    };
    if app.chat_input.trim().is_empty() || app.is_sending() {
        return;
    }
    let text = std::mem::take(&mut app.chat_input);
    app.sending_since = Some(Instant::now());
    app.auto_scroll = true;
    app.push_status("sending");
    tokio::spawn(async move {
        let slug = session.slug().to_string();
        debug!("dispatching chat turn (slug={slug}, text_len={})", text.len());
        match session.submit(&text).await {
            Ok(_) => {
                let _ = sender.send(AppEvent::TurnCompleted { slug }).await;
            }
            Err(err) => {
                let _ = sender
                    .send(AppEvent::ActionError(format!("send message failed: {err}")))
                    .await;
            }
        }
    });
}

/// Fetch upvote counts in the background.
fn refresh_upvotes(services: &Services, sender: mpsc::Sender<AppEvent>) {
    let Some(upvoter) = services.upvoter.clone() else {
        return;
    };
    tokio::spawn(async move {
        match upvoter.load_all().await {
            Ok(upvotes) => {
                let _ = sender.send(AppEvent::UpvotesLoaded(upvotes)).await;
            }
            Err(err) => {
                let _ = sender
                    .send(AppEvent::ActionError(format!("failed to load upvotes: {err}")))
                    .await;
            }
        }
    });
}

/// Spawn a task to poll for input events.
fn spawn_input_handler(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        const MOUSE_SCROLL_LINES: i16 = 3;
        loop {
            if let Ok(true) = crossterm::event::poll(Duration::from_millis(30)) {
                while let Ok(true) = crossterm::event::poll(Duration::from_millis(0)) {
                    let event = match crossterm::event::read() {
                        Ok(event) => event,
                        Err(_) => break,
                    };
                    match event {
                        CrosstermEvent::Key(key) => {
                            let _ = sender.send(AppEvent::Input(key)).await;
                        }
                        CrosstermEvent::Mouse(mouse) => match mouse.kind {
                            MouseEventKind::ScrollUp => {
                                let _ = sender.send(AppEvent::Scroll(-MOUSE_SCROLL_LINES)).await;
                            }
                            MouseEventKind::ScrollDown => {
                                let _ = sender.send(AppEvent::Scroll(MOUSE_SCROLL_LINES)).await;
                            }
                            _ => {}
                        },
                        _ => {}
                    }
                }
            }
        }
    });
}

/// Spawn a periodic tick event generator.
fn spawn_tick(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            let _ = sender.send(AppEvent::Tick).await;
        }
    });
}

/// Configure terminal in raw mode with alternate screen.
fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    debug!("setting up terminal");
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal state on exit.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    debug!("restoring terminal");
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
