//! Application state and command dispatch for the notekeep shell.
//!
//! The shell mirrors the service's three surfaces: a sign-in surface, the
//! notes list, and a single open note. Each user action is one command,
//! one network round-trip, and one printed result; there is no background
//! work and nothing is cached beyond the last listed notes (kept only so
//! `open 2` can refer to them by position).

use std::io::{self, BufRead, Write};

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info, warn};

use notekeep_core::api::{ApiClient, ApiError};
use notekeep_core::auth::{CredentialStore, Session};
use notekeep_core::config::Config;
use notekeep_core::models::{
    LoginCredentials, Note, NoteDraft, PasswordChange, ProfileUpdate, RegisterCredentials, User,
};
use notekeep_core::validation::{self, ValidationErrors};

// ============================================================================
// Commands
// ============================================================================

/// A parsed shell command. Whether a command applies depends on the
/// current view; dispatch rejects the ones that don't.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Login { email: Option<String> },
    Register,
    Logout,
    Forget,
    Profile,
    EditProfile,
    Passwd,
    List,
    Open { target: String },
    Add,
    Edit,
    Delete,
    Back,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Command::Empty;
        };

        match word {
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "login" => Command::Login {
                email: words.next().map(str::to_string),
            },
            "register" => Command::Register,
            "logout" => Command::Logout,
            "forget" => Command::Forget,
            "profile" | "whoami" => Command::Profile,
            "edit-profile" => Command::EditProfile,
            "passwd" => Command::Passwd,
            "list" | "ls" => Command::List,
            "open" | "show" => match words.next() {
                Some(target) => Command::Open {
                    target: target.to_string(),
                },
                None => Command::Unknown("open needs a note number or id".to_string()),
            },
            "add" | "new" => Command::Add,
            "edit" => Command::Edit,
            "delete" | "rm" => Command::Delete,
            "back" | "b" => Command::Back,
            other => Command::Unknown(format!("Unknown command: {}", other)),
        }
    }
}

/// Outcome of dispatching one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

// ============================================================================
// Views
// ============================================================================

/// The shell's navigation state.
#[derive(Debug, Clone)]
pub enum View {
    /// Signed out; only login/register are available
    Login,
    /// The notes list
    Notes,
    /// A single open note
    Note(Note),
}

// ============================================================================
// Confirmation
// ============================================================================

/// Explicit confirmation step for destructive actions. The flow only sees
/// a boolean; how the question is asked is up to the implementation.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Stdin-backed confirmation prompt.
pub struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        print!("{} [y/N] ", prompt);
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        let answer = answer.trim().to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

// ============================================================================
// Forced logout
// ============================================================================

/// React to an authorization failure: drop the client's token and clear
/// the session. Returns `true` when this call performed the clear, so a
/// single failure clears the session exactly once no matter how the
/// surrounding flow unwinds.
pub fn handle_unauthorized(session: &mut Session, client: &mut ApiClient) -> bool {
    client.clear_token();
    if session.current().is_none() {
        return false;
    }
    if let Err(e) = session.logout() {
        warn!(error = %e, "Failed to clear session after authorization failure");
    }
    info!("Session cleared after authorization failure");
    true
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    config: Config,
    session: Session,
    client: ApiClient,
    confirm: Box<dyn Confirm>,
    view: View,
    /// Last listed notes, kept so commands can address them by position
    notes: Vec<Note>,
}

impl App {
    pub fn new(config: Config, session: Session, client: ApiClient, confirm: Box<dyn Confirm>) -> Self {
        Self {
            config,
            session,
            client,
            confirm,
            view: View::Login,
            notes: Vec::new(),
        }
    }

    /// Restore a persisted session, falling back to one silent re-login
    /// with remembered keychain credentials when the restored session has
    /// expired or is missing.
    pub async fn bootstrap(&mut self) {
        if self.session.restore() {
            if let Some(token) = self.session.token() {
                self.client.set_token(token.to_string());
            }
            if let Some(data) = self.session.current() {
                println!(
                    "Signed in as {} (session expires in {}m)",
                    data.user.display_name(),
                    data.minutes_until_expiry()
                );
            }
            self.view = View::Notes;
            self.refresh_notes().await;
            return;
        }

        let Some(email) = self.config.last_email.clone() else {
            return;
        };
        let Ok(password) = CredentialStore::get_password(&email) else {
            return;
        };

        debug!("Attempting silent re-login with remembered credentials");
        let credentials = LoginCredentials { email, password };
        match self.client.login(&credentials).await {
            Ok(auth) => {
                if self.establish_session(auth.user.clone(), auth.token).is_ok() {
                    println!("Signed in as {}", auth.user.display_name());
                    self.view = View::Notes;
                    self.refresh_notes().await;
                }
            }
            Err(e) => {
                debug!(error = %e, "Silent re-login failed");
            }
        }
    }

    /// Run the interactive shell until quit or EOF.
    pub async fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new()?;
        self.print_help();

        loop {
            let prompt = self.prompt();
            match editor.readline(&prompt) {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if self.dispatch(Command::parse(&line), &mut editor).await? == Flow::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Execute a single command line non-interactively.
    pub async fn run_once(&mut self, line: &str) -> Result<()> {
        let mut editor = DefaultEditor::new()?;
        self.dispatch(Command::parse(line), &mut editor).await?;
        Ok(())
    }

    fn prompt(&self) -> String {
        match (&self.view, self.session.current()) {
            (View::Note(note), Some(data)) => {
                format!("{}:{}> ", data.user.display_name(), note.summary())
            }
            (_, Some(data)) => format!("{}> ", data.user.display_name()),
            _ => "notekeep> ".to_string(),
        }
    }

    // ===== Dispatch =====

    async fn dispatch(&mut self, command: Command, editor: &mut DefaultEditor) -> Result<Flow> {
        match command {
            Command::Empty => {}
            Command::Help => self.print_help(),
            Command::Quit => return Ok(Flow::Quit),
            Command::Unknown(message) => println!("{} (try 'help')", message),

            Command::Login { email } => self.login(email, editor).await?,
            Command::Register => self.register(editor).await?,
            Command::Forget => self.forget(),

            Command::Logout => {
                if self.require_auth() {
                    self.logout();
                }
            }
            Command::Profile => {
                if self.require_auth() {
                    self.show_profile().await;
                }
            }
            Command::EditProfile => {
                if self.require_auth() {
                    self.edit_profile(editor).await?;
                }
            }
            Command::Passwd => {
                if self.require_auth() {
                    self.change_password().await?;
                }
            }
            Command::List => {
                if self.require_auth() {
                    self.view = View::Notes;
                    self.refresh_notes().await;
                }
            }
            Command::Open { target } => {
                if self.require_auth() {
                    self.open_note(&target).await;
                }
            }
            Command::Add => {
                if self.require_auth() {
                    self.add_note(editor).await?;
                }
            }
            Command::Edit => {
                if self.require_auth() {
                    self.edit_note(editor).await?;
                }
            }
            Command::Delete => {
                if self.require_auth() {
                    self.delete_note().await?;
                }
            }
            Command::Back => {
                if matches!(self.view, View::Note(_)) {
                    self.view = View::Notes;
                    self.print_notes();
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Gate for commands that need a live session. An expired or missing
    /// session sends the user back to the sign-in surface.
    fn require_auth(&mut self) -> bool {
        if self.session.is_authenticated() {
            return true;
        }
        let was_signed_in = handle_unauthorized(&mut self.session, &mut self.client);
        self.view = View::Login;
        if was_signed_in {
            println!("Your session has expired. Please sign in again.");
        } else {
            println!("Please sign in first ('login' or 'register').");
        }
        false
    }

    /// Print an API failure. An authorization failure additionally clears
    /// the session (exactly once) and returns to the sign-in surface.
    fn report_error(&mut self, error: ApiError) {
        match error {
            ApiError::Unauthorized => {
                handle_unauthorized(&mut self.session, &mut self.client);
                self.view = View::Login;
                println!("Your session has expired. Please sign in again.");
            }
            ApiError::Rejected { message, fields } => {
                println!("{}", message);
                for (field, detail) in &fields {
                    println!("  {}: {}", field, detail);
                }
            }
            other => println!("Error: {}", other),
        }
    }

    fn print_validation_errors(errors: &ValidationErrors) {
        for (field, message) in errors.iter() {
            println!("  {}: {}", field, message);
        }
    }

    // ===== Auth flows =====

    async fn login(&mut self, email: Option<String>, editor: &mut DefaultEditor) -> Result<()> {
        let email = match email {
            Some(email) => email,
            None => {
                let initial = self.config.last_email.clone().unwrap_or_default();
                editor.readline_with_initial("Email: ", (&initial, ""))?.trim().to_string()
            }
        };
        let password = rpassword::prompt_password("Password: ")?;

        let credentials = LoginCredentials { email, password };
        if let Err(errors) = validation::validate_login(&credentials) {
            Self::print_validation_errors(&errors);
            return Ok(());
        }

        match self.client.login(&credentials).await {
            Ok(auth) => {
                if let Err(e) = self.establish_session(auth.user.clone(), auth.token) {
                    println!("Sign-in failed: {}", e);
                    return Ok(());
                }
                println!("{}", auth.message.unwrap_or_else(|| "Signed in".to_string()));

                self.config.last_email = Some(credentials.email.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.offer_to_remember(&credentials.email, &credentials.password);

                self.view = View::Notes;
                self.refresh_notes().await;
            }
            Err(e) => self.report_error(e),
        }
        Ok(())
    }

    async fn register(&mut self, editor: &mut DefaultEditor) -> Result<()> {
        let username = editor.readline("Username: ")?.trim().to_string();
        let email = editor.readline("Email: ")?.trim().to_string();
        let password = rpassword::prompt_password("Password: ")?;
        let confirm_password = rpassword::prompt_password("Confirm password: ")?;

        let credentials = RegisterCredentials {
            username,
            email,
            password,
            confirm_password,
        };
        if let Err(errors) = validation::validate_registration(&credentials) {
            Self::print_validation_errors(&errors);
            return Ok(());
        }

        match self.client.register(&credentials).await {
            Ok(auth) => {
                // Registration doubles as a login
                if let Err(e) = self.establish_session(auth.user.clone(), auth.token) {
                    println!("Sign-in failed: {}", e);
                    return Ok(());
                }
                println!("{}", auth.message.unwrap_or_else(|| "Welcome!".to_string()));

                self.config.last_email = Some(credentials.email.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.offer_to_remember(&credentials.email, &credentials.password);

                self.view = View::Notes;
                self.refresh_notes().await;
            }
            Err(e) => self.report_error(e),
        }
        Ok(())
    }

    /// Hand a `{user, token}` pair to the session store and mirror the
    /// token onto the client.
    fn establish_session(&mut self, user: User, token: String) -> Result<()> {
        self.session.login(user, token.clone())?;
        self.client.set_token(token);
        Ok(())
    }

    fn offer_to_remember(&mut self, email: &str, password: &str) {
        let wants_it = self
            .confirm
            .confirm("Remember this password in the system keychain?")
            .unwrap_or(false);
        if !wants_it {
            return;
        }
        match CredentialStore::store(email, password) {
            Ok(()) => println!("Password remembered."),
            Err(e) => warn!(error = %e, "Failed to store credentials"),
        }
    }

    fn logout(&mut self) {
        if let Err(e) = self.session.logout() {
            warn!(error = %e, "Failed to clear session");
        }
        self.client.clear_token();
        self.view = View::Login;
        self.notes.clear();
        println!("Signed out.");
    }

    fn forget(&mut self) {
        let Some(email) = self.config.last_email.clone() else {
            println!("No remembered account.");
            return;
        };
        match CredentialStore::delete(&email) {
            Ok(()) => println!("Removed remembered password for {}.", email),
            Err(_) => println!("No remembered password for {}.", email),
        }
    }

    // ===== Profile flows =====

    async fn show_profile(&mut self) {
        match self.client.profile().await {
            Ok(user) => {
                println!("Username: {}", user.username);
                println!("Email:    {}", user.email);
                if let Some(data) = self.session.current() {
                    println!("Session:  expires in {}m", data.minutes_until_expiry());
                }
                if let Err(e) = self.session.update_user(user) {
                    warn!(error = %e, "Failed to persist refreshed profile");
                }
            }
            Err(e) => self.report_error(e),
        }
    }

    async fn edit_profile(&mut self, editor: &mut DefaultEditor) -> Result<()> {
        let current = match self.session.current() {
            Some(data) => data.user.clone(),
            None => return Ok(()),
        };

        let username = editor
            .readline_with_initial("Username: ", (&current.username, ""))?
            .trim()
            .to_string();
        let email = editor
            .readline_with_initial("Email: ", (&current.email, ""))?
            .trim()
            .to_string();

        let update = ProfileUpdate {
            username: Some(username).filter(|v| !v.is_empty() && *v != current.username),
            email: Some(email).filter(|v| !v.is_empty() && *v != current.email),
        };
        if update.username.is_none() && update.email.is_none() {
            println!("Nothing to change.");
            return Ok(());
        }

        match self.client.update_profile(&update).await {
            Ok(user) => {
                println!("Profile updated.");
                if let Err(e) = self.session.update_user(user) {
                    warn!(error = %e, "Failed to persist updated profile");
                }
            }
            Err(e) => self.report_error(e),
        }
        Ok(())
    }

    async fn change_password(&mut self) -> Result<()> {
        let current_password = rpassword::prompt_password("Current password: ")?;
        let new_password = rpassword::prompt_password("New password: ")?;
        let confirm = rpassword::prompt_password("Confirm new password: ")?;

        if new_password != confirm {
            println!("  new_password: Passwords do not match");
            return Ok(());
        }
        let change = PasswordChange {
            current_password,
            new_password: new_password.clone(),
        };
        if let Err(errors) = validation::validate_password_change(&change) {
            Self::print_validation_errors(&errors);
            return Ok(());
        }

        match self.client.change_password(&change).await {
            Ok(message) => {
                println!("{}", message);
                // Keep any remembered password in step with the account
                if let Some(email) = self.config.last_email.clone() {
                    if CredentialStore::has_credentials(&email) {
                        if let Err(e) = CredentialStore::store(&email, &new_password) {
                            warn!(error = %e, "Failed to update remembered password");
                        }
                    }
                }
            }
            Err(e) => self.report_error(e),
        }
        Ok(())
    }

    // ===== Note flows =====

    async fn refresh_notes(&mut self) {
        match self.client.list_notes().await {
            Ok(notes) => {
                self.notes = notes;
                self.print_notes();
            }
            Err(e) => self.report_error(e),
        }
    }

    fn print_notes(&self) {
        if self.notes.is_empty() {
            println!("No notes to show.");
            return;
        }
        for (i, note) in self.notes.iter().enumerate() {
            println!("{:3}. {}  ({})", i + 1, note.summary(), note.id);
        }
    }

    /// Resolve `open` targets: a 1-based position into the last listing,
    /// or a raw note id.
    fn resolve_note_id(&self, target: &str) -> Option<String> {
        if let Ok(position) = target.parse::<usize>() {
            if position >= 1 && position <= self.notes.len() {
                return Some(self.notes[position - 1].id.clone());
            }
            println!("No note at position {}.", position);
            return None;
        }
        Some(target.to_string())
    }

    async fn open_note(&mut self, target: &str) {
        let Some(id) = self.resolve_note_id(target) else {
            return;
        };
        match self.client.note_details(&id).await {
            Ok(note) => {
                println!("{}", note.title);
                println!("{}", "-".repeat(note.title.len().max(4)));
                println!("{}", note.details);
                self.view = View::Note(note);
            }
            Err(e) => self.report_error(e),
        }
    }

    async fn add_note(&mut self, editor: &mut DefaultEditor) -> Result<()> {
        let title = editor.readline("Title: ")?.trim().to_string();
        let details = editor.readline("Details: ")?.trim().to_string();

        let draft = NoteDraft { title, details };
        if let Err(errors) = validation::validate_note(&draft) {
            // Invalid drafts never reach the network
            Self::print_validation_errors(&errors);
            return Ok(());
        }

        match self.client.create_note(&draft).await {
            Ok(message) => {
                println!("{}", message);
                self.view = View::Notes;
                self.refresh_notes().await;
            }
            Err(e) => self.report_error(e),
        }
        Ok(())
    }

    async fn edit_note(&mut self, editor: &mut DefaultEditor) -> Result<()> {
        let note = match &self.view {
            View::Note(note) => note.clone(),
            _ => {
                println!("Open a note first ('open <n>').");
                return Ok(());
            }
        };

        let title = editor
            .readline_with_initial("Title: ", (&note.title, ""))?
            .trim()
            .to_string();
        let details = editor
            .readline_with_initial("Details: ", (&note.details, ""))?
            .trim()
            .to_string();

        let draft = NoteDraft { title, details };
        if let Err(errors) = validation::validate_note(&draft) {
            Self::print_validation_errors(&errors);
            return Ok(());
        }

        match self.client.update_note(&note.id, &draft).await {
            Ok(message) => {
                println!("{}", message);
                // Re-fetch so the open view reflects what the backend stored
                match self.client.note_details(&note.id).await {
                    Ok(updated) => self.view = View::Note(updated),
                    Err(e) => self.report_error(e),
                }
            }
            Err(e) => self.report_error(e),
        }
        Ok(())
    }

    async fn delete_note(&mut self) -> Result<()> {
        let note = match &self.view {
            View::Note(note) => note.clone(),
            _ => {
                println!("Open a note first ('open <n>').");
                return Ok(());
            }
        };

        let confirmed = self
            .confirm
            .confirm("Delete this note permanently? This cannot be undone.")?;
        if !confirmed {
            return Ok(());
        }

        match self.client.delete_note(&note.id).await {
            Ok(message) => {
                println!("{}", message);
                // Navigate away from the deleted note
                self.view = View::Notes;
                self.refresh_notes().await;
            }
            Err(e) => self.report_error(e),
        }
        Ok(())
    }

    // ===== Help =====

    fn print_help(&self) {
        match self.view {
            View::Login => {
                println!("Commands: login [email], register, forget, help, quit");
            }
            View::Notes => {
                println!("Commands: list, open <n|id>, add, profile, edit-profile, passwd, logout, help, quit");
            }
            View::Note(_) => {
                println!("Commands: edit, delete, back, list, help, quit");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use tempfile::TempDir;

    fn token_expiring_in_secs(secs: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let exp = chrono_now_plus(secs);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp).as_bytes());
        format!("{}.{}.sig", header, payload)
    }

    fn chrono_now_plus(secs: i64) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Clock before epoch")
            .as_secs() as i64
            + secs
    }

    fn test_user() -> User {
        User {
            id: "665f00000000000000000001".to_string(),
            username: "ines".to_string(),
            email: "ines@example.com".to_string(),
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("  help "), Command::Help);
        assert_eq!(Command::parse("quit"), Command::Quit);
        assert_eq!(Command::parse("login"), Command::Login { email: None });
        assert_eq!(
            Command::parse("login ines@example.com"),
            Command::Login {
                email: Some("ines@example.com".to_string())
            }
        );
        assert_eq!(
            Command::parse("open abc123"),
            Command::Open {
                target: "abc123".to_string()
            }
        );
        assert!(matches!(Command::parse("open"), Command::Unknown(_)));
        assert_eq!(Command::parse("ls"), Command::List);
        assert_eq!(Command::parse("rm"), Command::Delete);
        assert!(matches!(Command::parse("frobnicate"), Command::Unknown(_)));
    }

    #[test]
    fn test_authorization_failure_clears_session_exactly_once() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut session = Session::new(dir.path().to_path_buf());
        session
            .login(test_user(), token_expiring_in_secs(3600))
            .expect("Failed to login");
        let mut client =
            ApiClient::new("http://localhost:5000/api/v1").expect("Failed to build client");
        client.set_token("abc.def.ghi".to_string());

        // First failure clears the session
        assert!(handle_unauthorized(&mut session, &mut client));
        assert!(session.current().is_none());
        assert!(!dir.path().join("session.json").exists());

        // A second reaction to the same failure is a no-op
        assert!(!handle_unauthorized(&mut session, &mut client));
    }

    #[test]
    fn test_resolve_note_id_by_position_and_raw_id() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let session = Session::new(dir.path().to_path_buf());
        let client =
            ApiClient::new("http://localhost:5000/api/v1").expect("Failed to build client");
        let mut app = App::new(Config::default(), session, client, Box::new(PromptConfirm));
        app.notes = vec![
            Note {
                id: "aaa".to_string(),
                title: "first".to_string(),
                details: "d".to_string(),
            },
            Note {
                id: "bbb".to_string(),
                title: "second".to_string(),
                details: "d".to_string(),
            },
        ];

        assert_eq!(app.resolve_note_id("1"), Some("aaa".to_string()));
        assert_eq!(app.resolve_note_id("2"), Some("bbb".to_string()));
        assert_eq!(app.resolve_note_id("3"), None);
        assert_eq!(app.resolve_note_id("abc123"), Some("abc123".to_string()));
    }
}
