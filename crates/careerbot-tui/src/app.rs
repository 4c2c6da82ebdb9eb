use std::path::PathBuf;
use std::sync::Arc;

use careerbot_core::api::ChatBackend;
use careerbot_core::capabilities::Cue;
use careerbot_core::config::ConfigRepository;
use careerbot_core::conversation::SubmitRejected;
use careerbot_core::{
    Attachment, AttachmentError, AuthError, Capabilities, CapabilityError, ClientConfig,
    ConversationEvent, ConversationNotice, ExportError, ExportFormat, Identity, SessionGate,
    SignInRequest, export_transcript, load_attachment,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chat::{ChatAction, ChatScreen};
use crate::logging::{StatusEntry, StatusLevel};
use crate::sign_in::{SignInAction, SignInForm};

/// Completions of app-level background work.
#[derive(Debug)]
pub enum AppEvent {
    SignInFailed(AuthError),
    AttachmentLoaded(Result<Attachment, AttachmentError>),
    Exported(Result<PathBuf, ExportError>),
    Dictated(Result<String, CapabilityError>),
    ConfigSaved(Result<(), String>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashLevel {
    Info,
    Success,
    Error,
}

pub enum Screen {
    SignIn(SignInForm),
    Chat(Box<ChatScreen>),
}

pub struct App {
    gate: Arc<SessionGate>,
    backend: Arc<dyn ChatBackend>,
    config: ClientConfig,
    /// Config as stored on disk, without CLI or environment overrides.
    stored_config: ClientConfig,
    repository: Arc<dyn ConfigRepository>,
    capabilities: Capabilities,
    export_format: ExportFormat,
    pub screen: Screen,
    events: UnboundedSender<AppEvent>,
    sign_in_task: Option<JoinHandle<()>>,
    pub flash_message: Option<(String, FlashLevel)>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        gate: Arc<SessionGate>,
        backend: Arc<dyn ChatBackend>,
        config: ClientConfig,
        stored_config: ClientConfig,
        repository: Arc<dyn ConfigRepository>,
        capabilities: Capabilities,
    ) -> (Self, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = unbounded_channel();
        let screen = Screen::SignIn(SignInForm::new(gate.requires_credentials()));
        let app = Self {
            gate,
            backend,
            config,
            stored_config,
            repository,
            capabilities,
            export_format: ExportFormat::default(),
            screen,
            events: tx,
            sign_in_task: None,
            flash_message: None,
            should_quit: false,
        };
        (app, rx)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn export_format(&self) -> ExportFormat {
        self.export_format
    }

    pub fn flash_success(&mut self, msg: impl Into<String>) {
        self.flash_message = Some((msg.into(), FlashLevel::Success));
    }

    pub fn flash_error(&mut self, msg: impl Into<String>) {
        self.flash_message = Some((msg.into(), FlashLevel::Error));
    }

    pub fn flash_info(&mut self, msg: impl Into<String>) {
        self.flash_message = Some((msg.into(), FlashLevel::Info));
    }

    /// Chat screen, when signed in.
    pub fn chat_mut(&mut self) -> Option<&mut ChatScreen> {
        match &mut self.screen {
            Screen::Chat(chat) => Some(chat.as_mut()),
            Screen::SignIn(_) => None,
        }
    }

    /// Wait for the next conversation event. Never resolves while signed out.
    pub async fn next_conversation_event(&mut self) -> Option<ConversationEvent> {
        match self.chat_mut() {
            Some(chat) => chat.next_event().await,
            None => std::future::pending().await,
        }
    }

    /// React to the session gate's auth-state notification.
    pub fn on_auth_changed(&mut self, identity: Option<Identity>) {
        self.sign_in_task = None;
        match identity {
            Some(identity) => {
                if matches!(self.screen, Screen::Chat(_)) {
                    return;
                }
                info!(uid = %identity.uid, "Opening chat");
                let chat = ChatScreen::new(
                    identity,
                    self.backend.clone(),
                    self.config.reveal.clone(),
                    self.config.language,
                );
                self.screen = Screen::Chat(Box::new(chat));
                self.flash_message = None;
            }
            None => {
                if matches!(self.screen, Screen::SignIn(_)) {
                    return;
                }
                self.screen = Screen::SignIn(SignInForm::new(self.gate.requires_credentials()));
                self.flash_info("Signed out");
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        // Any key acknowledges the last flash
        self.flash_message = None;

        match &mut self.screen {
            Screen::SignIn(form) => {
                let action = form.handle_key(key);
                self.handle_sign_in_action(action);
            }
            Screen::Chat(chat) => {
                let action = chat.handle_key(key);
                self.handle_chat_action(action);
            }
        }
    }

    fn handle_sign_in_action(&mut self, action: SignInAction) {
        match action {
            SignInAction::None => {}
            SignInAction::Quit => self.should_quit = true,
            SignInAction::Submit(request) => self.start_sign_in(request),
            SignInAction::Cancel => {
                if let Some(task) = self.sign_in_task.take() {
                    task.abort();
                }
                self.handle_app_event(AppEvent::SignInFailed(AuthError::Cancelled));
            }
        }
    }

    fn start_sign_in(&mut self, request: SignInRequest) {
        if let Screen::SignIn(form) = &mut self.screen {
            form.pending = true;
        }
        let gate = self.gate.clone();
        let events = self.events.clone();
        self.sign_in_task = Some(tokio::spawn(async move {
            // Success arrives through the gate's auth-state channel
            if let Err(err) = gate.sign_in(request).await {
                let _ = events.send(AppEvent::SignInFailed(err));
            }
        }));
    }

    fn handle_chat_action(&mut self, action: ChatAction) {
        match action {
            ChatAction::None => {}
            ChatAction::Quit => self.should_quit = true,
            ChatAction::SignOut => self.gate.sign_out(),
            ChatAction::Sent => self.play(Cue::MessageSent),
            ChatAction::Rejected(SubmitRejected::ReplyPending) => {
                self.flash_info("CareerBot is still answering your last question");
            }
            ChatAction::Rejected(SubmitRejected::Empty) => {}
            ChatAction::Cleared => self.flash_info("Conversation cleared"),
            ChatAction::Export => self.export(),
            ChatAction::Attach(path) => {
                let events = self.events.clone();
                let path = expand_home(&path);
                tokio::spawn(async move {
                    let result = load_attachment(&path).await;
                    let _ = events.send(AppEvent::AttachmentLoaded(result));
                });
            }
            ChatAction::Upload => self.upload(),
            ChatAction::Copy => self.copy(),
            ChatAction::Voice => self.dictate(),
            ChatAction::CycleLanguage => self.cycle_language(),
            ChatAction::CycleExportFormat => self.cycle_export_format(),
        }
    }

    fn export(&mut self) {
        let Some(chat) = self.chat_mut() else {
            return;
        };
        let messages = chat.messages().to_vec();
        let format = self.export_format;
        let dir = self.config.export_dir();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = export_transcript(&messages, format, &dir).await;
            let _ = events.send(AppEvent::Exported(result));
        });
    }

    /// Switch the format used by the next export.
    fn cycle_export_format(&mut self) {
        self.export_format = self.export_format.next();
        let name = self.export_format.file_name();
        self.flash_info(format!("Exports will be written as {name}"));
    }

    fn upload(&mut self) {
        let Some(chat) = self.chat_mut() else {
            return;
        };
        match &chat.attachment {
            Some(attachment) => {
                let upload = attachment.to_upload();
                let name = upload.file_name.clone();
                chat.controller().upload(upload);
                self.flash_info(format!("Uploading {name}..."));
            }
            None => self.flash_info("Attach a file first with Ctrl-O"),
        }
    }

    fn copy(&mut self) {
        let Some(chat) = self.chat_mut() else {
            return;
        };
        let Some((text, is_code)) = chat.copy_target() else {
            self.flash_info("Nothing to copy yet");
            return;
        };
        match self.capabilities.clipboard.set_text(&text) {
            Ok(()) if is_code => self.flash_success("Copied code block"),
            Ok(()) => self.flash_success("Copied reply"),
            Err(err) => {
                warn!(error = %err, "Copy failed");
                self.flash_error(err.to_string());
            }
        }
    }

    fn dictate(&mut self) {
        let Some(chat) = self.chat_mut() else {
            return;
        };
        let locale = chat.language.speech_locale();
        let speech = self.capabilities.speech.clone();
        if !speech.is_supported() {
            self.flash_info("Voice input is not available in this terminal");
            return;
        }
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = speech.listen(locale).await;
            let _ = events.send(AppEvent::Dictated(result));
        });
        self.flash_info("Listening...");
    }

    fn cycle_language(&mut self) {
        let Some(chat) = self.chat_mut() else {
            return;
        };
        chat.language = chat.language.next();
        let language = chat.language;
        self.config.language = language;
        self.stored_config.language = language;
        self.flash_info(format!("Language: {}", language.label()));

        let save = self.repository.save(self.stored_config.clone());
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = save.await.map_err(|err| err.to_string());
            let _ = events.send(AppEvent::ConfigSaved(result));
        });
    }

    fn play(&self, cue: Cue) {
        if let Err(err) = self.capabilities.sound.play(cue) {
            debug!(error = %err, "Sound cue unavailable");
        }
    }

    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SignInFailed(err) => {
                self.sign_in_task = None;
                if let Screen::SignIn(form) = &mut self.screen {
                    form.failed();
                }
                match err {
                    AuthError::Cancelled => self.flash_info("Sign-in cancelled"),
                    err => self.flash_error(format!("Sign-in failed: {err}")),
                }
            }
            AppEvent::AttachmentLoaded(Ok(attachment)) => {
                let name = attachment.file_name.clone();
                if let Some(chat) = self.chat_mut() {
                    chat.attachment = Some(attachment);
                }
                self.flash_success(format!("Attached {name} (Ctrl-U to upload)"));
            }
            AppEvent::AttachmentLoaded(Err(err)) => {
                warn!(error = %err, "Attachment rejected");
                self.flash_error(err.to_string());
            }
            AppEvent::Exported(Ok(path)) => {
                self.flash_success(format!("Saved {}", path.display()));
            }
            AppEvent::Exported(Err(err)) => {
                warn!(error = %err, "Export failed");
                self.flash_error(err.to_string());
            }
            AppEvent::Dictated(Ok(text)) => {
                let Some(chat) = self.chat_mut() else {
                    return;
                };
                let conversation = chat.controller_mut().conversation_mut();
                if conversation.is_input_enabled() {
                    conversation.input_mut().push_str(&text);
                } else {
                    debug!("Dropping dictation while a reply is pending");
                    self.flash_info("Dictation ignored while CareerBot is answering");
                }
            }
            AppEvent::Dictated(Err(err)) => self.flash_error(err.to_string()),
            AppEvent::ConfigSaved(Ok(())) => debug!("Config saved"),
            AppEvent::ConfigSaved(Err(err)) => warn!(error = %err, "Failed to save config"),
        }
    }

    pub fn handle_conversation_event(&mut self, event: ConversationEvent) {
        let Some(chat) = self.chat_mut() else {
            return;
        };
        let Some(notice) = chat.handle_event(event) else {
            return;
        };

        match notice {
            ConversationNotice::Answered => self.play(Cue::ReplyReceived),
            ConversationNotice::ReplyFailed => {
                self.play(Cue::Error);
                self.flash_error("Could not reach CareerBot");
            }
            ConversationNotice::HistoryLoaded { entries } if entries > 0 => {
                self.flash_info(format!("Loaded {entries} earlier messages"));
            }
            ConversationNotice::Uploaded { file_name, message } => {
                let detail = if message.is_empty() {
                    file_name
                } else {
                    format!("{file_name}: {message}")
                };
                self.flash_success(format!("Uploaded {detail}"));
                if let Some(chat) = self.chat_mut() {
                    chat.controller().list_files();
                }
            }
            ConversationNotice::UploadFailed { file_name, error } => {
                self.flash_error(format!("Upload of {file_name} failed: {error}"));
            }
            ConversationNotice::HistoryLoaded { .. }
            | ConversationNotice::RevealFinished
            | ConversationNotice::Files(_) => {}
        }
    }

    /// Show a WARN/ERROR log event unless something more specific is showing.
    pub fn show_status(&mut self, entry: StatusEntry) {
        if self.flash_message.is_some() {
            return;
        }
        let level = match entry.level {
            StatusLevel::Error => FlashLevel::Error,
            StatusLevel::Warning => FlashLevel::Info,
        };
        self.flash_message = Some((entry.text, level));
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careerbot_core::BoxFuture;
    use careerbot_core::api::{ApiResult, FileUpload};
    use careerbot_core::auth::{StaticToken, StaticTokenAuth};
    use careerbot_core::config::JsonConfigRepository;
    use careerbot_core::{AuthProvider, Message};

    struct QuietBackend;

    impl ChatBackend for QuietBackend {
        fn fetch_history(&self, _token: String) -> BoxFuture<'static, ApiResult<Vec<Message>>> {
            Box::pin(async { Ok(vec![Message::user("old"), Message::bot("answer")]) })
        }

        fn ask(&self, _token: String, _question: String) -> BoxFuture<'static, ApiResult<String>> {
            Box::pin(async { Ok("reply".to_string()) })
        }

        fn upload(&self, _token: String, _file: FileUpload) -> BoxFuture<'static, ApiResult<String>> {
            Box::pin(async { Ok("ok".to_string()) })
        }

        fn list_files(&self, _token: String) -> BoxFuture<'static, ApiResult<Vec<String>>> {
            Box::pin(async { Ok(vec!["cv.pdf".to_string()]) })
        }
    }

    struct NeverProvider;

    impl AuthProvider for NeverProvider {
        fn sign_in(&self, _request: SignInRequest) -> BoxFuture<'_, Result<Identity, AuthError>> {
            Box::pin(std::future::pending())
        }

        fn requires_credentials(&self) -> bool {
            true
        }
    }

    fn app_with(
        provider: Arc<dyn AuthProvider>,
        dir: &std::path::Path,
    ) -> (App, UnboundedReceiver<AppEvent>, Arc<SessionGate>) {
        let gate = Arc::new(SessionGate::new(provider));
        let config = ClientConfig {
            export_dir: Some(dir.to_path_buf()),
            ..ClientConfig::default()
        };
        let repository = Arc::new(JsonConfigRepository::with_path(dir.join("config.json")));
        let (app, rx) = App::new(
            gate.clone(),
            Arc::new(QuietBackend),
            config.clone(),
            config,
            repository,
            Capabilities::none(),
        );
        (app, rx, gate)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_auth_change_switches_screens() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(StaticTokenAuth::new("t", "Ada"));
        let (mut app, _rx, gate) = app_with(provider, dir.path());
        let mut auth = gate.subscribe();

        app.handle_key(key(KeyCode::Enter));
        auth.changed().await.unwrap();
        app.on_auth_changed(auth.borrow_and_update().clone());
        assert!(matches!(app.screen, Screen::Chat(_)));

        app.handle_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL));
        auth.changed().await.unwrap();
        app.on_auth_changed(auth.borrow_and_update().clone());
        assert!(matches!(app.screen, Screen::SignIn(_)));
        assert!(!gate.is_signed_in());
    }

    #[tokio::test]
    async fn test_cancelling_sign_in_stays_on_form() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx, gate) = app_with(Arc::new(NeverProvider), dir.path());

        if let Screen::SignIn(form) = &mut app.screen {
            form.email = "ada@example.com".into();
            form.password = "secret".into();
        }
        app.handle_key(key(KeyCode::Enter));
        assert!(matches!(&app.screen, Screen::SignIn(form) if form.pending));

        app.handle_key(key(KeyCode::Esc));

        assert!(!app.should_quit);
        assert!(matches!(&app.screen, Screen::SignIn(form) if !form.pending));
        assert_eq!(
            app.flash_message,
            Some(("Sign-in cancelled".to_string(), FlashLevel::Info))
        );
        assert!(!gate.is_signed_in());
    }

    #[tokio::test]
    async fn test_history_and_export_flow() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut rx, _gate) = app_with(Arc::new(NeverProvider), dir.path());
        let identity = Identity::new("u", "Ada", Arc::new(StaticToken::new("t")));
        app.on_auth_changed(Some(identity));

        let event = app.next_conversation_event().await.unwrap();
        app.handle_conversation_event(event);
        assert_eq!(
            app.flash_message,
            Some(("Loaded 2 earlier messages".to_string(), FlashLevel::Info))
        );

        app.handle_key(KeyEvent::new(KeyCode::Char('e'), KeyModifiers::CONTROL));
        let event = rx.recv().await.unwrap();
        app.handle_app_event(event);

        let exported = std::fs::read_to_string(dir.path().join("chat-history.txt")).unwrap();
        assert_eq!(exported, "USER: old\nBOT: answer");
    }

    #[tokio::test]
    async fn test_copy_without_clipboard_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx, _gate) = app_with(Arc::new(NeverProvider), dir.path());
        let identity = Identity::new("u", "Ada", Arc::new(StaticToken::new("t")));
        app.on_auth_changed(Some(identity));
        let event = app.next_conversation_event().await.unwrap();
        app.handle_conversation_event(event);

        app.handle_key(KeyEvent::new(KeyCode::Char('y'), KeyModifiers::CONTROL));

        assert!(matches!(
            &app.flash_message,
            Some((_, FlashLevel::Error))
        ));
    }

    #[tokio::test]
    async fn test_dictation_only_fills_an_enabled_input() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx, _gate) = app_with(Arc::new(NeverProvider), dir.path());
        let identity = Identity::new("u", "Ada", Arc::new(StaticToken::new("t")));
        app.on_auth_changed(Some(identity));

        app.handle_app_event(AppEvent::Dictated(Ok("hi".to_string())));
        let input = |app: &mut App| {
            app.chat_mut()
                .unwrap()
                .controller()
                .conversation()
                .input()
                .to_string()
        };
        assert_eq!(input(&mut app), "hi");

        app.handle_key(key(KeyCode::Enter));
        app.handle_app_event(AppEvent::Dictated(Ok("more".to_string())));

        assert_eq!(input(&mut app), "");
        assert_eq!(
            app.flash_message,
            Some((
                "Dictation ignored while CareerBot is answering".to_string(),
                FlashLevel::Info
            ))
        );
    }

    #[tokio::test]
    async fn test_language_cycle_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut rx, _gate) = app_with(Arc::new(NeverProvider), dir.path());
        let identity = Identity::new("u", "Ada", Arc::new(StaticToken::new("t")));
        app.on_auth_changed(Some(identity));

        app.handle_key(key(KeyCode::F(3)));
        assert_eq!(app.config().language, careerbot_core::Language::Hi);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::ConfigSaved(Ok(()))));
        let saved = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
        assert!(saved.contains("\"hi\""));
    }
}
