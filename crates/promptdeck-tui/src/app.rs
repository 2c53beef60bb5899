//! Application state for the promptdeck TUI.

use crate::markdown::{self, RenderedMarkdown};
use log::{debug, info};
use promptdeck_core::{ChatSessionManager, Message, Prompt, PromptCatalog, Role, SortOrder, browse, session};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::cmp::min;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a copy acknowledgment stays visible before self-reverting.
pub const COPY_FEEDBACK_TTL: Duration = Duration::from_secs(2);

/// Active screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Search/filter/sort over the whole catalog.
    Catalog,
    /// One prompt with its rendered body.
    Detail,
    /// Conversation against the chat API.
    Chat,
}

/// Modal overlay drawn over the active view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    /// Credential and purge settings.
    Settings,
    /// Credential prompt shown when chat is opened without a key.
    CredentialPrompt,
    /// Confirmation before clearing the open chat.
    ConfirmClearChat,
    /// Confirmation before purging stored chats.
    ConfirmPurge,
}

/// What was last copied, for the self-reverting acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyTarget {
    /// The prompt text (`title\n\ncontent`).
    Prompt,
    /// The prompt's share URL.
    ShareLink,
    /// A fenced code block, by index.
    CodeBlock(usize),
    /// A chat message, by visible index.
    Message(usize),
}

/// Purge threshold choices offered in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeChoice {
    /// Remove records older than this many days.
    Days(u32),
    /// Remove every record.
    All,
}

impl PurgeChoice {
    /// Label shown in the settings overlay.
    pub fn label(&self) -> String {
        match self {
            PurgeChoice::Days(1) => "older than 1 day".to_string(),
            PurgeChoice::Days(days) => format!("older than {days} days"),
            PurgeChoice::All => "all chats".to_string(),
        }
    }
}

/// Purge options in the order the settings overlay cycles them.
pub const PURGE_CHOICES: [PurgeChoice; 4] = [
    PurgeChoice::Days(1),
    PurgeChoice::Days(7),
    PurgeChoice::Days(14),
    PurgeChoice::All,
];

/// Top-level application state for the TUI.
pub struct App {
    /// All loaded prompts in filename order.
    pub prompts: Vec<Prompt>,
    /// Distinct categories in first-seen order.
    pub categories: Vec<String>,
    /// Catalog load failure, shown as an empty-state message.
    pub catalog_error: Option<String>,
    /// Latest upvote counts from the remote store.
    pub upvotes: HashMap<String, u64>,
    /// Current search term.
    pub search: String,
    /// Selected category index; 0 means no category filter.
    pub category_index: usize,
    /// Current sort order.
    pub sort: SortOrder,
    /// Selection index into the filtered list.
    pub selected: usize,
    /// Active view.
    pub view: View,
    /// Active overlay, if any.
    pub overlay: Option<Overlay>,
    /// Slug shown in the detail/chat views.
    pub detail_slug: Option<String>,
    /// Rendered markdown for the detail view.
    pub detail: RenderedMarkdown,
    /// Selected code block index in the detail view.
    pub selected_block: usize,
    /// Open chat session, if any.
    pub session: Option<ChatSessionManager>,
    /// Chat input buffer (the Composing part of the session state).
    pub chat_input: String,
    /// When the in-flight request started.
    pub sending_since: Option<Instant>,
    /// Filler phrase shown once the request is slow.
    pub waiting_hint: Option<&'static str>,
    /// Selected message index in the chat view (for copying).
    pub selected_message: usize,
    /// Last copy action, with its timestamp.
    pub copied: Option<(CopyTarget, Instant)>,
    /// Credential input buffer for the settings/prompt overlays.
    pub credential_input: String,
    /// Whether a credential is currently stored.
    pub credential_present: bool,
    /// Selected purge threshold index into `PURGE_CHOICES`.
    pub purge_index: usize,
    /// Status line text.
    pub status: String,
    /// Current scroll offset in the active view.
    pub scroll: u16,
    /// Whether to auto-scroll the chat to the bottom.
    pub auto_scroll: bool,
    /// Maximum scroll offset for the active view.
    pub max_scroll: u16,
}

impl App {
    /// Create a new application state with defaults.
    pub fn new() -> Self {
        Self {
            prompts: Vec::new(),
            categories: Vec::new(),
            catalog_error: None,
            upvotes: HashMap::new(),
            search: String::new(),
            category_index: 0,
            sort: SortOrder::Popular,
            selected: 0,
            view: View::Catalog,
            overlay: None,
            detail_slug: None,
            detail: RenderedMarkdown::default(),
            selected_block: 0,
            session: None,
            chat_input: String::new(),
            sending_since: None,
            waiting_hint: None,
            selected_message: 0,
            copied: None,
            credential_input: String::new(),
            credential_present: false,
            purge_index: 1,
            status: "idle".to_string(),
            scroll: 0,
            auto_scroll: true,
            max_scroll: 0,
        }
    }

    /// Replace the catalog contents.
    pub fn set_catalog(&mut self, catalog: &PromptCatalog) {
        debug!("set catalog (count={})", catalog.len());
        self.prompts = catalog.prompts().to_vec();
        self.categories = catalog.categories();
        self.selected = 0;
    }

    /// Replace the upvote counts.
    pub fn set_upvotes(&mut self, upvotes: HashMap<String, u64>) {
        debug!("set upvotes (count={})", upvotes.len());
        self.upvotes = upvotes;
    }

    /// The category filter as a string; empty means all.
    pub fn selected_category(&self) -> &str {
        if self.category_index == 0 {
            ""
        } else {
            self.categories
                .get(self.category_index - 1)
                .map(String::as_str)
                .unwrap_or("")
        }
    }

    /// The catalog filtered and sorted for display.
    pub fn filtered(&self) -> Vec<&Prompt> {
        browse(
            &self.prompts,
            &self.search,
            self.selected_category(),
            self.sort,
            &self.upvotes,
        )
    }

    /// The prompt under the cursor, if any.
    pub fn selected_prompt(&self) -> Option<&Prompt> {
        self.filtered().get(self.selected).copied()
    }

    /// Cycle to the next category filter (all -> each category -> all).
    pub fn cycle_category(&mut self) {
        self.category_index = (self.category_index + 1) % (self.categories.len() + 1);
        self.selected = 0;
    }

    /// Toggle between popular and recent ordering.
    pub fn toggle_sort(&mut self) {
        self.sort = self.sort.toggled();
        self.selected = 0;
    }

    /// Move the catalog selection up.
    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move the catalog selection down.
    pub fn select_next(&mut self) {
        let len = self.filtered().len();
        if len > 0 && self.selected + 1 < len {
            self.selected += 1;
        }
    }

    /// Switch to the detail view for a prompt.
    pub fn open_detail(&mut self, prompt: &Prompt) {
        info!("opening prompt detail (slug={})", prompt.slug);
        self.detail_slug = Some(prompt.slug.clone());
        self.detail = markdown::render(&prompt.content);
        self.selected_block = 0;
        self.view = View::Detail;
        self.scroll = 0;
        self.max_scroll = 0;
    }

    /// Switch to the chat view with an open session.
    pub fn open_chat(&mut self, session: ChatSessionManager) {
        info!("opening chat (slug={})", session.slug());
        self.session = Some(session);
        self.chat_input.clear();
        self.selected_message = 0;
        self.view = View::Chat;
        self.scroll = 0;
        self.auto_scroll = true;
        self.max_scroll = 0;
    }

    /// Return from detail to the catalog.
    pub fn back_to_catalog(&mut self) {
        self.view = View::Catalog;
        self.detail_slug = None;
        self.detail = RenderedMarkdown::default();
        self.scroll = 0;
        self.max_scroll = 0;
    }

    /// Return from chat to the detail view.
    pub fn back_to_detail(&mut self) {
        self.view = View::Detail;
        self.session = None;
        self.sending_since = None;
        self.waiting_hint = None;
        self.scroll = 0;
        self.max_scroll = 0;
    }

    /// Select the next code block in the detail view.
    pub fn cycle_code_block(&mut self) {
        let count = self.detail.code_blocks.len();
        if count > 0 {
            self.selected_block = (self.selected_block + 1) % count;
        }
    }

    /// Whether a chat request is in flight.
    pub fn is_sending(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.is_sending())
    }

    /// Record a copy action for the 2-second acknowledgment.
    pub fn set_copied(&mut self, target: CopyTarget) {
        self.copied = Some((target, Instant::now()));
    }

    /// Whether the given target currently shows a copy acknowledgment.
    pub fn copied_matches(&self, target: CopyTarget) -> bool {
        self.copied
            .as_ref()
            .is_some_and(|(copied, _)| *copied == target)
    }

    /// Set the status line.
    pub fn push_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Advance time-based state: copy acknowledgments revert after two
    /// seconds, and a slow request earns a waiting hint after five.
    pub fn tick(&mut self) {
        if self
            .copied
            .as_ref()
            .is_some_and(|(_, since)| since.elapsed() >= COPY_FEEDBACK_TTL)
        {
            self.copied = None;
        }
        if self.is_sending() {
            if let Some(since) = self.sending_since
                && since.elapsed() >= session::WAITING_HINT_DELAY
                && self.waiting_hint.is_none()
            {
                self.waiting_hint = Some(session::waiting_hint());
            }
        } else {
            self.sending_since = None;
            self.waiting_hint = None;
        }
    }

    /// Move the chat message selection up.
    pub fn select_previous_message(&mut self) {
        self.selected_message = self.selected_message.saturating_sub(1);
    }

    /// Move the chat message selection down.
    pub fn select_next_message(&mut self) {
        let count = self
            .session
            .as_ref()
            .map(|session| session.visible_messages().len())
            .unwrap_or(0);
        if count > 0 && self.selected_message + 1 < count {
            self.selected_message += 1;
        }
    }

    /// Scroll the active view upward.
    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    /// Scroll the active view downward.
    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = min(self.scroll.saturating_add(lines), self.max_scroll);
        if self.scroll >= self.max_scroll {
            self.auto_scroll = true;
        }
    }

    /// Update scroll bounds after layout changes, pinning to the bottom
    /// while auto-scroll is on.
    pub fn update_scroll_bounds(&mut self, max_scroll: u16) {
        let was_at_bottom = self.scroll >= self.max_scroll;
        self.max_scroll = max_scroll;
        if self.auto_scroll || was_at_bottom {
            self.scroll = max_scroll;
            self.auto_scroll = true;
        } else {
            self.scroll = self.scroll.min(max_scroll);
        }
    }

    /// Render chat messages into styled lines for the UI.
    pub fn render_chat_lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let messages: Vec<Message> = self
            .session
            .as_ref()
            .map(|session| session.visible_messages())
            .unwrap_or_default();

        if messages.is_empty() {
            lines.push(Line::from(Span::styled(
                " No messages yet. Type a message below to start.",
                Style::default().fg(Color::Rgb(128, 128, 128)),
            )));
        }

        for (idx, message) in messages.iter().enumerate() {
            let (prefix, prefix_style) = match message.role {
                Role::User => (
                    " you ",
                    Style::default()
                        .fg(Color::Rgb(10, 10, 10))
                        .bg(Color::Rgb(107, 161, 230))
                        .add_modifier(Modifier::BOLD),
                ),
                _ => (
                    " assistant ",
                    Style::default()
                        .fg(Color::Rgb(10, 10, 10))
                        .bg(Color::Rgb(238, 121, 72))
                        .add_modifier(Modifier::BOLD),
                ),
            };

            let mut badge = vec![Span::styled(prefix, prefix_style)];
            if idx == self.selected_message {
                badge.push(Span::styled(
                    " ◂",
                    Style::default().fg(Color::Rgb(238, 121, 72)),
                ));
            }
            if self.copied_matches(CopyTarget::Message(idx)) {
                badge.push(Span::styled(
                    " copied!",
                    Style::default().fg(Color::Rgb(120, 220, 140)),
                ));
            }
            lines.push(Line::from(badge));

            let content_style = Style::default().fg(Color::Rgb(238, 238, 238));
            for line in message.content.lines() {
                lines.push(Line::from(Span::styled(
                    format!(" {line}"),
                    content_style,
                )));
            }

            if idx + 1 < messages.len() {
                lines.push(Line::from(Span::raw("")));
            }
        }

        if self.is_sending() {
            lines.push(Line::from(Span::raw("")));
            lines.push(Line::from(Span::styled(
                format!(" {}", self.waiting_hint.unwrap_or("Loading...")),
                Style::default().fg(Color::Rgb(128, 128, 128)),
            )));
        }

        lines.push(Line::from(Span::raw("")));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::{App, COPY_FEEDBACK_TTL, CopyTarget, PURGE_CHOICES, PurgeChoice};
    use promptdeck_core::{Prompt, SortOrder};
    use std::time::Instant;

    fn prompt(slug: &str, title: &str, category: &str) -> Prompt {
        Prompt {
            slug: slug.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            description: format!("{title} description"),
            content: "body".to_string(),
            author: None,
        }
    }

    fn app_with_prompts() -> App {
        let mut app = App::new();
        app.prompts = vec![
            prompt("alpha", "Alpha Helper", "Writing"),
            prompt("beta", "Beta Helper", "Coding"),
            prompt("gamma", "Gamma Helper", "Writing"),
        ];
        app.categories = vec!["Writing".to_string(), "Coding".to_string()];
        app
    }

    #[test]
    fn search_narrows_the_filtered_list() {
        let mut app = app_with_prompts();
        app.search = "beta".to_string();
        let slugs: Vec<&str> = app.filtered().iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["beta"]);
    }

    #[test]
    fn category_cycle_wraps_back_to_all() {
        let mut app = app_with_prompts();
        assert_eq!(app.selected_category(), "");
        app.cycle_category();
        assert_eq!(app.selected_category(), "Writing");
        app.cycle_category();
        assert_eq!(app.selected_category(), "Coding");
        app.cycle_category();
        assert_eq!(app.selected_category(), "");
    }

    #[test]
    fn sort_toggle_switches_order() {
        let mut app = app_with_prompts();
        assert_eq!(app.sort, SortOrder::Popular);
        app.toggle_sort();
        assert_eq!(app.sort, SortOrder::Recent);
        let slugs: Vec<&str> = app.filtered().iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["gamma", "beta", "alpha"]);
    }

    #[test]
    fn selection_stays_within_bounds() {
        let mut app = app_with_prompts();
        app.select_previous();
        assert_eq!(app.selected, 0);
        for _ in 0..10 {
            app.select_next();
        }
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn copy_feedback_expires_on_tick() {
        let mut app = App::new();
        app.set_copied(CopyTarget::Prompt);
        assert!(app.copied_matches(CopyTarget::Prompt));

        // Backdate the acknowledgment past its TTL and tick.
        let stale = Instant::now()
            .checked_sub(COPY_FEEDBACK_TTL * 2)
            .expect("backdate");
        app.copied = Some((CopyTarget::Prompt, stale));
        app.tick();
        assert!(app.copied.is_none());
    }

    #[test]
    fn purge_choices_cover_the_settings_menu() {
        assert_eq!(
            PURGE_CHOICES,
            [
                PurgeChoice::Days(1),
                PurgeChoice::Days(7),
                PurgeChoice::Days(14),
                PurgeChoice::All,
            ]
        );
        assert_eq!(PurgeChoice::Days(1).label(), "older than 1 day");
        assert_eq!(PurgeChoice::Days(7).label(), "older than 7 days");
        assert_eq!(PurgeChoice::All.label(), "all chats");
    }
}
