use std::sync::Arc;

use careerbot_core::api::ChatBackend;
use careerbot_core::config::RevealSettings;
use careerbot_core::conversation::SubmitRejected;
use careerbot_core::{
    Attachment, ConversationController, ConversationEvent, ConversationNotice, Identity, Language,
    Message,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use crate::markdown;

/// What the chat screen wants the app to do after a key press. Anything
/// that needs app-level collaborators (clipboard, exporter, auth) is
/// returned instead of handled here.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatAction {
    None,
    Sent,
    Rejected(SubmitRejected),
    Cleared,
    Export,
    Attach(String),
    Upload,
    Copy,
    Voice,
    CycleLanguage,
    CycleExportFormat,
    SignOut,
    Quit,
}

/// Path entry shown after Ctrl-O.
#[derive(Debug, Default)]
pub struct PathPrompt {
    pub input: String,
}

/// The signed-in chat surface for one identity.
///
/// Owns the conversation controller together with the receiving end of its
/// event channel, so dropping the screen on sign-out discards any replies
/// still in flight.
pub struct ChatScreen {
    controller: ConversationController,
    events: UnboundedReceiver<ConversationEvent>,
    pub attachment: Option<Attachment>,
    pub prompt: Option<PathPrompt>,
    pub language: Language,
    pub uploaded_files: Vec<String>,
    /// Lines scrolled up from the newest entry; 0 follows the transcript.
    pub scroll_back: u16,
}

impl ChatScreen {
    pub fn new(
        identity: Identity,
        backend: Arc<dyn ChatBackend>,
        reveal: RevealSettings,
        language: Language,
    ) -> Self {
        let (tx, rx) = unbounded_channel();
        let mut controller = ConversationController::new(identity, backend, reveal, tx);
        controller.load_history();
        Self {
            controller,
            events: rx,
            attachment: None,
            prompt: None,
            language,
            uploaded_files: Vec::new(),
            scroll_back: 0,
        }
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ConversationController {
        &mut self.controller
    }

    pub async fn next_event(&mut self) -> Option<ConversationEvent> {
        self.events.recv().await
    }

    pub fn handle_event(&mut self, event: ConversationEvent) -> Option<ConversationNotice> {
        let notice = self.controller.handle_event(event);
        if let Some(ConversationNotice::Files(files)) = &notice {
            self.uploaded_files = files.clone();
        }
        // Follow the newest entry on every change
        self.scroll_back = 0;
        notice
    }

    /// Latest bot reply's last code block, or the reply itself.
    pub fn copy_target(&self) -> Option<(String, bool)> {
        let reply = self
            .controller
            .conversation()
            .messages()
            .iter()
            .rev()
            .find(|m| !m.is_user())?;
        match markdown::code_blocks(&reply.text).pop() {
            Some(code) => Some((code, true)),
            None => Some((reply.text.clone(), false)),
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.controller.conversation().messages()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ChatAction {
        if let Some(prompt) = self.prompt.as_mut() {
            return match key.code {
                KeyCode::Esc => {
                    self.prompt = None;
                    ChatAction::None
                }
                KeyCode::Enter => {
                    let path = prompt.input.trim().to_string();
                    self.prompt = None;
                    if path.is_empty() {
                        ChatAction::None
                    } else {
                        ChatAction::Attach(path)
                    }
                }
                KeyCode::Backspace => {
                    prompt.input.pop();
                    ChatAction::None
                }
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    prompt.input.push(c);
                    ChatAction::None
                }
                _ => ChatAction::None,
            };
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => ChatAction::Quit,
                KeyCode::Char('d') => ChatAction::SignOut,
                KeyCode::Char('l') => {
                    self.controller.clear();
                    self.scroll_back = 0;
                    ChatAction::Cleared
                }
                KeyCode::Char('e') => ChatAction::Export,
                KeyCode::Char('o') => {
                    self.prompt = Some(PathPrompt::default());
                    ChatAction::None
                }
                KeyCode::Char('u') => ChatAction::Upload,
                KeyCode::Char('y') => ChatAction::Copy,
                _ => ChatAction::None,
            };
        }

        let input_enabled = self.controller.conversation().is_input_enabled();
        match key.code {
            KeyCode::Esc => ChatAction::Quit,
            KeyCode::F(2) => ChatAction::Voice,
            KeyCode::F(3) => ChatAction::CycleLanguage,
            KeyCode::F(4) => ChatAction::CycleExportFormat,
            KeyCode::Tab => {
                self.controller.skip_reveal();
                ChatAction::None
            }
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(5);
                ChatAction::None
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(5);
                ChatAction::None
            }
            KeyCode::Enter => match self.controller.submit() {
                Ok(_) => {
                    self.scroll_back = 0;
                    ChatAction::Sent
                }
                Err(SubmitRejected::Empty) => ChatAction::None,
                Err(rejected) => ChatAction::Rejected(rejected),
            },
            KeyCode::Backspace if input_enabled => {
                self.controller.conversation_mut().input_mut().pop();
                ChatAction::None
            }
            KeyCode::Char(c) if input_enabled => {
                self.controller.conversation_mut().input_mut().push(c);
                ChatAction::None
            }
            _ => ChatAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careerbot_core::BoxFuture;
    use careerbot_core::api::{ApiResult, FileUpload};
    use careerbot_core::auth::StaticToken;
    use careerbot_core::conversation::ExchangeState;

    struct EchoBackend;

    impl ChatBackend for EchoBackend {
        fn fetch_history(&self, _token: String) -> BoxFuture<'static, ApiResult<Vec<Message>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn ask(&self, _token: String, question: String) -> BoxFuture<'static, ApiResult<String>> {
            Box::pin(async move { Ok(format!("Here is some code:\n\n```\n{question}\n```")) })
        }

        fn upload(&self, _token: String, _file: FileUpload) -> BoxFuture<'static, ApiResult<String>> {
            Box::pin(async { Ok(String::new()) })
        }

        fn list_files(&self, _token: String) -> BoxFuture<'static, ApiResult<Vec<String>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    fn screen() -> ChatScreen {
        let identity = Identity::new("u", "Ada", Arc::new(StaticToken::new("t")));
        let reveal = RevealSettings {
            enabled: false,
            ..RevealSettings::default()
        };
        ChatScreen::new(identity, Arc::new(EchoBackend), reveal, Language::En)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(screen: &mut ChatScreen, text: &str) {
        for c in text.chars() {
            screen.handle_key(key(KeyCode::Char(c)));
        }
    }

    async fn pump_until_idle(screen: &mut ChatScreen) {
        while screen.controller().conversation().state() != ExchangeState::Idle {
            let event = screen.next_event().await.unwrap();
            screen.handle_event(event);
        }
    }

    #[tokio::test]
    async fn test_typing_and_enter_sends() {
        let mut screen = screen();
        type_text(&mut screen, "hi");

        assert_eq!(screen.handle_key(key(KeyCode::Enter)), ChatAction::Sent);
        assert_eq!(screen.messages(), &[Message::user("hi")]);

        // Input is disabled while the reply is pending
        type_text(&mut screen, "x");
        assert_eq!(screen.controller().conversation().input(), "");
        assert_eq!(
            screen.handle_key(key(KeyCode::Enter)),
            ChatAction::Rejected(SubmitRejected::ReplyPending)
        );

        pump_until_idle(&mut screen).await;
        assert_eq!(screen.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_copy_prefers_latest_code_block() {
        let mut screen = screen();
        assert!(screen.copy_target().is_none());

        type_text(&mut screen, "cargo run");
        screen.handle_key(key(KeyCode::Enter));
        pump_until_idle(&mut screen).await;

        assert_eq!(screen.copy_target(), Some(("cargo run".to_string(), true)));
    }

    #[tokio::test]
    async fn test_attach_prompt_collects_path() {
        let mut screen = screen();
        screen.handle_key(ctrl('o'));
        assert!(screen.prompt.is_some());

        type_text(&mut screen, "/tmp/cv.pdf");
        assert_eq!(
            screen.handle_key(key(KeyCode::Enter)),
            ChatAction::Attach("/tmp/cv.pdf".to_string())
        );
        assert!(screen.prompt.is_none());
        assert_eq!(screen.controller().conversation().input(), "");
    }

    #[tokio::test]
    async fn test_control_keys_map_to_actions() {
        let mut screen = screen();
        assert_eq!(screen.handle_key(ctrl('e')), ChatAction::Export);
        assert_eq!(screen.handle_key(ctrl('y')), ChatAction::Copy);
        assert_eq!(screen.handle_key(ctrl('d')), ChatAction::SignOut);
        assert_eq!(screen.handle_key(key(KeyCode::F(3))), ChatAction::CycleLanguage);
        assert_eq!(screen.handle_key(key(KeyCode::Esc)), ChatAction::Quit);
    }

    #[tokio::test]
    async fn test_clear_empties_transcript() {
        let mut screen = screen();
        type_text(&mut screen, "hello");
        screen.handle_key(key(KeyCode::Enter));
        pump_until_idle(&mut screen).await;

        assert_eq!(screen.handle_key(ctrl('l')), ChatAction::Cleared);
        assert!(screen.messages().is_empty());
        assert_eq!(screen.controller().conversation().questions_asked(), 0);
    }
}
