use careerbot_core::SignInRequest;
use crossterm::event::{KeyCode, KeyEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
}

/// What the sign-in screen wants the app to do after a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum SignInAction {
    None,
    Submit(SignInRequest),
    Cancel,
    Quit,
}

/// State of the sign-in screen.
#[derive(Debug)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    pub focus: Field,
    pub needs_credentials: bool,
    pub pending: bool,
}

impl SignInForm {
    pub fn new(needs_credentials: bool) -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            focus: Field::Email,
            needs_credentials,
            pending: false,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> SignInAction {
        if key.code == KeyCode::Esc {
            return if self.pending {
                SignInAction::Cancel
            } else {
                SignInAction::Quit
            };
        }
        if self.pending {
            return SignInAction::None;
        }

        match key.code {
            KeyCode::Enter => {
                if self.needs_credentials
                    && (self.email.trim().is_empty() || self.password.is_empty())
                {
                    if self.focus == Field::Email && !self.email.trim().is_empty() {
                        self.focus = Field::Password;
                    }
                    return SignInAction::None;
                }
                SignInAction::Submit(SignInRequest::password(
                    self.email.trim(),
                    self.password.clone(),
                ))
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down
                if self.needs_credentials =>
            {
                self.focus = match self.focus {
                    Field::Email => Field::Password,
                    Field::Password => Field::Email,
                };
                SignInAction::None
            }
            KeyCode::Backspace if self.needs_credentials => {
                self.focused_mut().pop();
                SignInAction::None
            }
            KeyCode::Char(c) if self.needs_credentials => {
                self.focused_mut().push(c);
                SignInAction::None
            }
            _ => SignInAction::None,
        }
    }

    /// The attempt ended without signing in; keep the email, drop the password.
    pub fn failed(&mut self) {
        self.pending = false;
        self.password.clear();
        self.focus = if self.email.is_empty() {
            Field::Email
        } else {
            Field::Password
        };
    }
}
