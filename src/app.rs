use std::path::Path;

use anyhow::anyhow;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Config, DEFAULT_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_TEMPERATURE};
use crate::drag::DragReport;
use crate::export;
use crate::ollama::{GeneratedSite, OllamaClient};
use crate::preview::Preview;
use crate::project::{ChatTurn, FileNode, ResponsiveMode, ViewMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Files,
    Content,
}

/// Which panel divider a mouse drag is currently resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divider {
    Chat,
    Files,
}

// Resizer bounds, in terminal columns.
pub const MIN_CHAT_COLS: u16 = 28;
pub const MIN_FILES_COLS: u16 = 14;
pub const MIN_CONTENT_COLS: u16 = 20;

const WELCOME: &str =
    "Hello! Describe the website you want to build. You can also attach a wireframe with /image <path>.";

/// Starter ideas shown while the project is still empty.
const SUGGESTION_PROMPTS: &[&str] = &[
    "A landing page for a coffee shop with a hero and a menu section.",
    "A personal portfolio with a projects grid and an about section.",
    "A pricing page with three tiers and a FAQ.",
    "A blog home page with a featured post and a post list.",
    "A product page with a gallery, description, and reviews.",
    "A simple dashboard layout with a sidebar and stat cards.",
];

const SUGGESTIONS_SHOWN: usize = 4;

const DESIGN_TOKENS_LABEL: &str = "Apply a sample design token set (colors, fonts, spacing).";

const DESIGN_TOKENS_PROMPT: &str = "Please apply the following design tokens to the website. Update the CSS files to use these values, preferably by creating CSS variables in a :root selector. Here are the tokens:\n\n```json\n{\n  \"colors\": {\n    \"primary\": \"#5E35B1\",\n    \"secondary\": \"#EC4899\",\n    \"background\": \"#FFFFFF\",\n    \"text\": \"#111827\",\n    \"text-muted\": \"#6B7280\"\n  },\n  \"fonts\": {\n    \"heading\": \"Georgia, serif\",\n    \"body\": \"'Helvetica Neue', sans-serif\"\n  },\n  \"spacing\": {\n    \"small\": \"8px\",\n    \"medium\": \"16px\",\n    \"large\": \"32px\"\n  },\n  \"radii\": {\n    \"default\": \"8px\",\n    \"full\": \"9999px\"\n  }\n}\n```";

#[derive(Debug, Clone)]
pub struct Suggestion {
    pub label: String,
    pub prompt: String,
}

/// What a finished generation task hands back to the orchestrator.
pub struct GenerationOutcome {
    pub result: anyhow::Result<GeneratedSite>,
    /// Follow-up question fetched after a recorded generation; empty when
    /// none was produced or the submission was silent.
    pub follow_up: String,
    pub recorded: bool,
}

pub struct App {
    pub should_quit: bool,
    pub focus: FocusPane,
    pub view_mode: ViewMode,
    pub responsive_mode: ResponsiveMode,

    // Transcript and prompt input
    pub turns: Vec<ChatTurn>,
    pub input: String,
    pub input_cursor: usize,
    /// Base64 payload attached via /image, consumed by the next submission.
    pub pending_image: Option<String>,
    pub pending_image_name: Option<String>,

    // Starter suggestions (project empty only)
    pub suggestions: Vec<Suggestion>,
    pub suggestion_state: ListState,
    suggestion_offset: usize,

    // Project state. Owned here; every other module sees `&[FileNode]`.
    pub files: Vec<FileNode>,
    pub selected_file: Option<String>,
    pub files_state: ListState,

    // Single-slot generation guard. `busy` is set before a task is spawned
    // and cleared in apply_generation on every completion path.
    pub busy: bool,
    generation: Option<JoinHandle<GenerationOutcome>>,

    pub preview: Preview,

    // Panel Layout Manager
    pub chat_cols: u16,
    pub files_cols: u16,
    pub divider_drag: Option<Divider>,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub files_area: Option<Rect>,
    pub content_area: Option<Rect>,

    // Chat geometry for wrap/scroll calculations (updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub code_scroll: u16,

    // Animation state (0-2 for the thinking ellipsis)
    pub animation_frame: u8,

    // Generative service
    pub client: OllamaClient,
    pub model: String,
    pub temperature: f32,
}

impl App {
    pub fn new(config: Config) -> Self {
        let base_url = config
            .ollama_url
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let temperature = config.temperature.unwrap_or(DEFAULT_TEMPERATURE);

        let mut app = Self {
            should_quit: false,
            focus: FocusPane::Chat,
            view_mode: ViewMode::Code,
            responsive_mode: ResponsiveMode::Desktop,

            turns: vec![ChatTurn::model(WELCOME)],
            input: String::new(),
            input_cursor: 0,
            pending_image: None,
            pending_image_name: None,

            suggestions: Vec::new(),
            suggestion_state: ListState::default(),
            suggestion_offset: 0,

            files: Vec::new(),
            selected_file: None,
            files_state: ListState::default(),

            busy: false,
            generation: None,

            preview: Preview::new(),

            chat_cols: 40,
            files_cols: 24,
            divider_drag: None,

            chat_area: None,
            files_area: None,
            content_area: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            code_scroll: 0,

            animation_frame: 0,

            client: OllamaClient::new(&base_url),
            model,
            temperature,
        };
        app.refresh_suggestions();
        app
    }

    // -- Generation Orchestrator ---------------------------------------

    /// Sends a prompt to the generative service. Recorded submissions show
    /// up in the transcript (user turn now, explanation and follow-up on
    /// completion); silent ones leave no visible trace. Refused while a
    /// generation is already in flight.
    pub fn submit(&mut self, prompt: String, image: Option<String>, record: bool) {
        if self.busy {
            warn!("submission refused, a generation is already in flight");
            return;
        }
        if prompt.trim().is_empty() && image.is_none() {
            return;
        }

        let mut turn = ChatTurn::user(prompt.clone());
        turn.image = image;
        let mut context = self.turns.clone();
        if record {
            self.turns.push(turn.clone());
            self.scroll_chat_to_bottom();
        }
        context.push(turn);

        let files = self.files.clone();
        let client = self.client.clone();
        let model = self.model.clone();
        let temperature = self.temperature;

        self.busy = true;
        info!(recorded = record, "generation started");
        self.generation = Some(tokio::spawn(async move {
            let result = client
                .generate_site(&model, temperature, &context, &files)
                .await;
            let follow_up = match (&result, record) {
                (Ok(site), true) => {
                    client
                        .follow_up_question(&model, temperature, &prompt, &site.explanation)
                        .await
                }
                _ => String::new(),
            };
            GenerationOutcome {
                result,
                follow_up,
                recorded: record,
            }
        }));
    }

    /// Collects the outstanding generation task once it has finished.
    /// Called on tick, so the flag flip and the state mutation happen inside
    /// one event-handler call.
    pub async fn poll_generation(&mut self) {
        let finished = self
            .generation
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }
        let Some(task) = self.generation.take() else {
            return;
        };
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => GenerationOutcome {
                result: Err(anyhow!("The generation task failed: {e}")),
                follow_up: String::new(),
                recorded: true,
            },
        };
        self.apply_generation(outcome);
    }

    /// Applies a completed generation: the response's file list replaces the
    /// project wholesale, the viewed file survives by name when it can.
    pub fn apply_generation(&mut self, outcome: GenerationOutcome) {
        self.busy = false;
        match outcome.result {
            Ok(site) => {
                info!(files = site.files.len(), "generation applied");
                self.files = site.files;
                let still_present = self
                    .selected_file
                    .as_ref()
                    .is_some_and(|name| self.files.iter().any(|f| &f.name == name));
                if !still_present {
                    self.selected_file = self.files.first().map(|f| f.name.clone());
                    self.code_scroll = 0;
                }
                self.sync_file_list_state();
                if outcome.recorded {
                    self.turns.push(ChatTurn::model(site.explanation));
                    if !outcome.follow_up.is_empty() {
                        self.turns.push(ChatTurn::model(outcome.follow_up));
                    }
                    self.scroll_chat_to_bottom();
                }
                self.refresh_suggestions();
            }
            Err(e) => {
                warn!("generation failed: {e}");
                self.turns.push(ChatTurn::error(format!("Error: {e}")));
                self.scroll_chat_to_bottom();
            }
        }
    }

    /// Turns a completed drag into a scoped, silent follow-up instruction.
    pub fn report_drag(&mut self, report: DragReport) {
        info!(selector = %report.selector, transform = %report.transform, "drag reported");
        self.submit(drag_instruction(&report), None, false);
    }

    /// Switches the preview viewport immediately and, when a project exists,
    /// silently asks the service to adapt the styles for the new target.
    pub fn change_responsive_target(&mut self, mode: ResponsiveMode) {
        if mode == self.responsive_mode {
            return;
        }
        self.responsive_mode = mode;
        if self.files.is_empty() {
            return;
        }
        self.submit(responsive_instruction(mode).to_string(), None, false);
    }

    // -- Exports --------------------------------------------------------

    pub fn export_archive(&mut self) {
        if self.files.is_empty() {
            self.turns
                .push(ChatTurn::error("Error: There are no files to archive yet."));
            return;
        }
        match export::write_archive(&self.files, Path::new(export::ARCHIVE_NAME)) {
            Ok(()) => {
                info!("archive written to {}", export::ARCHIVE_NAME);
                self.turns.push(ChatTurn::model(format!(
                    "Saved the project as {}.",
                    export::ARCHIVE_NAME
                )));
            }
            Err(e) => {
                self.turns.push(ChatTurn::error(format!(
                    "Error: Could not create the archive. {e}"
                )));
            }
        }
        self.scroll_chat_to_bottom();
    }

    pub fn export_snapshot(&mut self) {
        if self.view_mode != ViewMode::Preview {
            self.turns.push(ChatTurn::error(
                "Error: Switch to the preview view to capture an image.",
            ));
            self.scroll_chat_to_bottom();
            return;
        }
        match export::write_snapshot(&self.preview, Path::new(export::SNAPSHOT_NAME)) {
            Ok(()) => {
                info!("snapshot written to {}", export::SNAPSHOT_NAME);
                self.turns.push(ChatTurn::model(format!(
                    "Saved the preview as {}.",
                    export::SNAPSHOT_NAME
                )));
            }
            Err(e) => {
                self.turns.push(ChatTurn::error(format!(
                    "Error: Could not capture the preview. {e}"
                )));
            }
        }
        self.scroll_chat_to_bottom();
    }

    // -- Image attachment ------------------------------------------------

    /// Reads a local wireframe image and holds it for the next submission,
    /// encoded as a data-URI with the MIME type taken from the extension.
    pub fn attach_image(&mut self, path: &str) {
        match std::fs::read(path) {
            Ok(bytes) => {
                let mime = image_mime(path);
                self.pending_image = Some(format!("data:{mime};base64,{}", STANDARD.encode(bytes)));
                self.pending_image_name = Some(path.to_string());
                self.turns.push(ChatTurn::model(format!(
                    "Attached {path}. It will be sent with your next prompt."
                )));
            }
            Err(e) => {
                self.turns
                    .push(ChatTurn::error(format!("Error: Could not read {path}. {e}")));
            }
        }
        self.scroll_chat_to_bottom();
    }

    pub fn take_pending_image(&mut self) -> Option<String> {
        self.pending_image_name = None;
        self.pending_image.take()
    }

    // -- File selection --------------------------------------------------

    pub fn selected_file_node(&self) -> Option<&FileNode> {
        let name = self.selected_file.as_ref()?;
        self.files.iter().find(|f| &f.name == name)
    }

    pub fn select_file(&mut self, index: usize) {
        if let Some(file) = self.files.get(index) {
            self.selected_file = Some(file.name.clone());
            self.files_state.select(Some(index));
            self.code_scroll = 0;
        }
    }

    pub fn select_next_file(&mut self) {
        if self.files.is_empty() {
            return;
        }
        let i = self.files_state.selected().unwrap_or(0);
        self.select_file((i + 1).min(self.files.len() - 1));
    }

    pub fn select_prev_file(&mut self) {
        let i = self.files_state.selected().unwrap_or(0);
        self.select_file(i.saturating_sub(1));
    }

    fn sync_file_list_state(&mut self) {
        let index = self
            .selected_file
            .as_ref()
            .and_then(|name| self.files.iter().position(|f| &f.name == name));
        self.files_state.select(index);
    }

    // -- Suggestions -----------------------------------------------------

    /// Rebuilds the starter list. Suggestions only exist while the project
    /// is empty; the window over the prompt list rotates on every refresh.
    pub fn refresh_suggestions(&mut self) {
        if !self.files.is_empty() {
            self.suggestions.clear();
            self.suggestion_state.select(None);
            return;
        }
        let mut suggestions: Vec<Suggestion> = (0..SUGGESTIONS_SHOWN)
            .map(|i| {
                let prompt =
                    SUGGESTION_PROMPTS[(self.suggestion_offset + i) % SUGGESTION_PROMPTS.len()];
                Suggestion {
                    label: prompt.to_string(),
                    prompt: prompt.to_string(),
                }
            })
            .collect();
        suggestions.push(Suggestion {
            label: DESIGN_TOKENS_LABEL.to_string(),
            prompt: DESIGN_TOKENS_PROMPT.to_string(),
        });
        self.suggestion_offset = (self.suggestion_offset + 1) % SUGGESTION_PROMPTS.len();
        self.suggestions = suggestions;
        self.suggestion_state.select(Some(0));
    }

    pub fn suggestions_visible(&self) -> bool {
        !self.suggestions.is_empty() && self.input.is_empty() && !self.busy
    }

    pub fn suggestion_nav_down(&mut self) {
        let len = self.suggestions.len();
        if len > 0 {
            let i = self.suggestion_state.selected().unwrap_or(0);
            self.suggestion_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn suggestion_nav_up(&mut self) {
        let i = self.suggestion_state.selected().unwrap_or(0);
        self.suggestion_state.select(Some(i.saturating_sub(1)));
    }

    /// Copies the highlighted suggestion into the input line.
    pub fn insert_suggestion(&mut self) {
        if let Some(i) = self.suggestion_state.selected() {
            if let Some(suggestion) = self.suggestions.get(i) {
                self.input = suggestion.prompt.clone();
                self.input_cursor = self.input.chars().count();
            }
        }
    }

    // -- Chat scrolling and animation -------------------------------------

    pub fn tick_animation(&mut self) {
        if self.busy {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn chat_scroll_down(&mut self, amount: u16) {
        let max = self.chat_total_lines().saturating_sub(self.chat_height);
        self.chat_scroll = self.chat_scroll.saturating_add(amount).min(max);
    }

    pub fn chat_scroll_up(&mut self, amount: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(amount);
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        let total = self.chat_total_lines();
        let visible = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.chat_scroll = total.saturating_sub(visible);
    }

    /// Estimated transcript height after wrapping, mirrored by the renderer.
    /// Counted in usize and clamped, so an enormous transcript saturates
    /// instead of overflowing the scroll range.
    pub fn chat_total_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };
        let mut total: usize = 0;
        for turn in &self.turns {
            total += 1; // Role line
            for line in turn.content.lines() {
                let chars = line.chars().count();
                if chars == 0 {
                    total += 1;
                } else {
                    total += (chars / wrap_width) + 1;
                }
            }
            if turn.image.is_some() {
                total += 1; // Attachment marker line
            }
            total += 1; // Blank line between turns
        }
        if self.busy {
            total += 2; // Role line + thinking indicator
        }
        total.min(usize::from(u16::MAX)) as u16
    }
}

fn image_mime(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "image/png",
    }
}

fn drag_instruction(report: &DragReport) -> String {
    format!(
        "The user dragged the element with CSS selector \"{}\". Please update the CSS to apply \
         the style \"transform: {};\". IMPORTANT: Only add or modify the 'transform' property \
         for this specific selector, preserving all other styles. If a transform property \
         already exists, update it.",
        report.selector, report.transform
    )
}

fn responsive_instruction(mode: ResponsiveMode) -> &'static str {
    match mode {
        ResponsiveMode::Mobile => {
            "Please make the current design fully responsive and optimized for a mobile viewport \
             (375px wide). Add CSS media queries where appropriate."
        }
        ResponsiveMode::Desktop => {
            "Please ensure the current design is optimized for a desktop viewport, while \
             preserving the existing mobile-responsive styles."
        }
    }
}
