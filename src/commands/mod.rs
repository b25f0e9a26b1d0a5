/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `auth`    - Signup and login, from flags or interactive prompts
- `chat`    - Interactive chat loop
- `revise`  - Topic list and per-topic detail
- `session` - Logout and whoami

Handlers drive an [`App`] and print what its views render; they never talk
to the backend directly.
*/

use std::sync::{Mutex, Once};

use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::app::App;
use crate::config::Config;
use crate::error::Result;
use crate::route::Route;
use crate::session::SessionStore;

/// Exit status for a process ended by Ctrl-C
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Build the app against the configured backend and session store
pub fn build_app(config: &Config) -> Result<App<ApiClient>> {
    tracing::debug!("Using session store: {}", config.session.location());
    let session = SessionStore::open(&config.session)?;
    let client = ApiClient::new(&config.api, session.clone())?;
    tracing::debug!(
        "Backend at {} (timeouts {:?}, chat {:?})",
        client.base_url(),
        client.request_timeout(),
        client.chat_timeout()
    );
    Ok(App::new(client, session))
}

/// Request Ctrl-C currently cancels, if any
static IN_FLIGHT: Mutex<Option<CancellationToken>> = Mutex::new(None);

static INTERRUPT_LISTENER: Once = Once::new();

/// Route a Ctrl-C to the pending request
///
/// Returns `false` when nothing is pending, in which case the interrupt
/// should end the process as it would without a handler installed.
fn interrupt_in_flight() -> bool {
    let pending = IN_FLIGHT.lock().ok().and_then(|slot| slot.clone());
    match pending {
        Some(token) => {
            tracing::debug!("Interrupt received, cancelling request");
            token.cancel();
            true
        }
        None => false,
    }
}

/// Install the process-wide Ctrl-C listener on first use
///
/// Once tokio owns SIGINT it never gives it back, so the listener keeps the
/// default behaviour outside requests by exiting with status 130.
fn install_interrupt_listener() {
    INTERRUPT_LISTENER.call_once(|| {
        tokio::spawn(async {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !interrupt_in_flight() {
                    eprintln!();
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        });
    });
}

/// Makes its token the one Ctrl-C cancels until dropped
///
/// Hold one for the duration of a single request so an interrupt aborts the
/// request instead of the process.
struct InterruptGuard {
    token: CancellationToken,
}

impl InterruptGuard {
    fn new() -> Self {
        install_interrupt_listener();
        let token = CancellationToken::new();
        if let Ok(mut slot) = IN_FLIGHT.lock() {
            *slot = Some(token.clone());
        }
        Self { token }
    }

    fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Ok(mut slot) = IN_FLIGHT.lock() {
            *slot = None;
        }
    }
}

/// Navigate to a protected view, running the interactive login first when
/// there is no session
///
/// Returns `false` when the user gave up on logging in.
async fn enter_protected(app: &mut App<ApiClient>, requested: Route) -> Result<bool> {
    let guard = InterruptGuard::new();
    if app.navigate(requested, guard.token()).await? == requested {
        return Ok(true);
    }
    drop(guard);

    println!("{}", "You need to log in first.".yellow());
    if !auth::interactive(app).await? {
        return Ok(false);
    }

    let guard = InterruptGuard::new();
    Ok(app.navigate(requested, guard.token()).await? == requested)
}

/// Auth command handlers
pub mod auth {
    use super::*;
    use crate::error::AssistantError;
    use crate::views::{AuthEvent, AuthMode};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Log in or sign up, then store the session
    ///
    /// With both `email` and `password` given the form is submitted once and
    /// a failure is returned as an error. Otherwise the user is prompted
    /// until they succeed or quit.
    pub async fn run(
        config: Config,
        mode: AuthMode,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<()> {
        let mut app = build_app(&config)?;
        app.auth.update(AuthEvent::SetMode(mode));

        let logged_in = match (email, password) {
            (Some(email), Some(password)) => {
                submit_once(&mut app, email, password).await?;
                true
            }
            (email, _) => {
                if let Some(email) = email {
                    app.auth.update(AuthEvent::EmailChanged(email));
                }
                interactive(&mut app).await?
            }
        };

        if logged_in {
            println!("Session saved to {}", config.session.location());
        }
        Ok(())
    }

    async fn submit_once(app: &mut App<ApiClient>, email: String, password: String) -> Result<()> {
        app.auth.update(AuthEvent::EmailChanged(email));
        app.auth.update(AuthEvent::ConfirmChanged(password.clone()));
        app.auth.update(AuthEvent::PasswordChanged(password));

        let guard = InterruptGuard::new();
        app.handle_auth(AuthEvent::Submit, guard.token()).await?;

        if let Some(failure) = app.take_auth_failure() {
            return Err(failure);
        }
        match app.auth.error.clone() {
            Some(error) => Err(AssistantError::Validation(error).into()),
            None => {
                print!("{}", app.auth.render());
                Ok(())
            }
        }
    }

    /// Prompt for credentials until a submit succeeds
    ///
    /// At the email prompt `/signup` and `/login` switch modes and `/demo`
    /// fills the demo credentials. Returns `false` if the user quit.
    pub async fn interactive(app: &mut App<ApiClient>) -> Result<bool> {
        let mut rl = DefaultEditor::new()?;
        print!("{}", app.auth.render());
        println!(
            "{}",
            "Type /signup or /login to switch, /demo for demo credentials.".dimmed()
        );

        loop {
            let email = match prompt(&mut rl, "email: ", &app.auth.email)? {
                Some(line) => line,
                None => return Ok(false),
            };

            match email.trim() {
                "/signup" => {
                    app.auth.update(AuthEvent::SetMode(AuthMode::Signup));
                    print!("{}", app.auth.render());
                    continue;
                }
                "/login" => {
                    app.auth.update(AuthEvent::SetMode(AuthMode::Login));
                    print!("{}", app.auth.render());
                    continue;
                }
                "/demo" => {
                    app.auth.update(AuthEvent::FillDemo);
                }
                other => {
                    app.auth.update(AuthEvent::EmailChanged(other.to_string()));
                    let Some(password) = prompt(&mut rl, "password: ", "")? else {
                        return Ok(false);
                    };
                    app.auth.update(AuthEvent::PasswordChanged(password));

                    if app.auth.mode == AuthMode::Signup {
                        let Some(confirm) = prompt(&mut rl, "confirm password: ", "")? else {
                            return Ok(false);
                        };
                        app.auth.update(AuthEvent::ConfirmChanged(confirm));
                    }
                }
            }

            let guard = InterruptGuard::new();
            app.handle_auth(AuthEvent::Submit, guard.token()).await?;
            drop(guard);

            print!("{}", app.auth.render());
            if app.route() != Route::Auth {
                return Ok(true);
            }
        }
    }

    /// Read one line; `None` when the user pressed Ctrl-C or Ctrl-D
    fn prompt(rl: &mut DefaultEditor, label: &str, initial: &str) -> Result<Option<String>> {
        match rl.readline_with_initial(label, (initial, "")) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Interactive chat
pub mod chat {
    use super::*;
    use crate::views::chat::THINKING;
    use crate::views::ChatEvent;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Slash commands understood by the chat prompt
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ChatCommand {
        Revise,
        Logout,
        Help,
        Exit,
    }

    /// Recognize a slash command; anything else is a message
    pub fn parse_command(line: &str) -> Option<ChatCommand> {
        match line.trim().to_lowercase().as_str() {
            "/revise" => Some(ChatCommand::Revise),
            "/logout" => Some(ChatCommand::Logout),
            "/help" | "/?" => Some(ChatCommand::Help),
            "/exit" | "/quit" => Some(ChatCommand::Exit),
            _ => None,
        }
    }

    /// Split off a trailing `\`, which continues the message on the next line
    pub fn split_continuation(line: &str) -> (&str, bool) {
        match line.strip_suffix('\\') {
            Some(head) => (head, true),
            None => (line, false),
        }
    }

    /// Start the interactive chat
    pub async fn run_chat(config: Config) -> Result<()> {
        let mut app = build_app(&config)?;
        if !enter_protected(&mut app, Route::Chat).await? {
            return Ok(());
        }
        chat_loop(&mut app).await
    }

    /// Run the chat prompt on an app already showing the chat view
    pub async fn chat_loop(app: &mut App<ApiClient>) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        print_banner();
        print!("{}", app.chat.render());

        loop {
            let label = if app.chat.input.is_empty() {
                "you> "
            } else {
                "...> "
            };
            let line = match rl.readline(label) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    if app.chat.input.is_empty() {
                        break;
                    }
                    app.chat.update(ChatEvent::InputChanged(String::new()));
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            };

            if app.chat.input.is_empty() {
                if let Some(command) = parse_command(&line) {
                    match command {
                        ChatCommand::Help => {
                            print_help();
                            continue;
                        }
                        ChatCommand::Exit => break,
                        ChatCommand::Logout => {
                            let cancel = CancellationToken::new();
                            app.handle_chat(ChatEvent::Logout, &cancel).await?;
                            println!("Logged out.");
                            return Ok(());
                        }
                        ChatCommand::Revise => {
                            let guard = InterruptGuard::new();
                            app.handle_chat(ChatEvent::OpenRevise, guard.token())
                                .await?;
                            drop(guard);
                            match revise::revise_loop(app, &mut rl).await? {
                                revise::Exit::BackToChat => {
                                    print!("{}", app.chat.render());
                                    continue;
                                }
                                revise::Exit::Quit => break,
                            }
                        }
                    }
                }
            }

            let (text, continues) = split_continuation(&line);
            let input = format!("{}{}", app.chat.input, text);
            let cancel = CancellationToken::new();
            app.handle_chat(ChatEvent::InputChanged(input), &cancel)
                .await?;

            if continues {
                app.handle_chat(ChatEvent::KeyEnter { modified: true }, &cancel)
                    .await?;
                continue;
            }

            if !app.chat.can_send() {
                app.chat.update(ChatEvent::InputChanged(String::new()));
                continue;
            }

            rl.add_history_entry(app.chat.input.trim())?;
            println!("{}", THINKING.dimmed());

            // Skip the echoed question; the terminal already shows it.
            let first_reply = app.chat.messages().len() + 1;
            let guard = InterruptGuard::new();
            app.handle_chat(ChatEvent::KeyEnter { modified: false }, guard.token())
                .await?;
            drop(guard);

            println!("{}", app.chat.render_since(first_reply));
        }

        if app.chat.has_history() {
            println!(
                "{}",
                "Run `dsa-assistant revise` to review what you asked.".dimmed()
            );
        }
        println!("Goodbye!");
        Ok(())
    }

    fn print_banner() {
        println!("{}  {}", "DSA Assistant".bold(), "beta".green());
        println!(
            "{}",
            "End a line with \\ to continue on the next line. Type /help for commands.".dimmed()
        );
        println!();
    }

    /// Print the chat help text
    pub fn print_help() {
        println!("{}", "Commands".bold());
        println!("  /revise   Review your topics and recurring mistakes");
        println!("  /logout   Log out and clear the stored session");
        println!("  /help     Show this help");
        println!("  /exit     Leave the chat");
        println!();
        println!("End a line with \\ to add a new line to your message.");
        println!("Ctrl-C while waiting for a reply cancels the request.");
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_command() {
            assert_eq!(parse_command("/revise"), Some(ChatCommand::Revise));
            assert_eq!(parse_command("  /LOGOUT "), Some(ChatCommand::Logout));
            assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
            assert_eq!(parse_command("/quit"), Some(ChatCommand::Exit));
            assert_eq!(parse_command("what is /revise?"), None);
            assert_eq!(parse_command("/unknown"), None);
        }

        #[test]
        fn test_split_continuation() {
            assert_eq!(split_continuation("first line\\"), ("first line", true));
            assert_eq!(split_continuation("last line"), ("last line", false));
            assert_eq!(split_continuation(""), ("", false));
        }
    }
}

/// Revision topics
pub mod revise {
    use super::*;
    use crate::views::{ReviseEvent, ReviseView};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// How the revise prompt was left
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Exit {
        BackToChat,
        Quit,
    }

    /// What a line typed at the revise prompt asks for
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Selection {
        Topic(String),
        Back,
        Quit,
        Unknown,
    }

    /// Interpret input as a list position, a topic name or a command
    pub fn parse_selection(view: &ReviseView, line: &str) -> Selection {
        let line = line.trim();
        match line {
            "/back" | "/chat" | "b" => return Selection::Back,
            "/exit" | "/quit" | "q" => return Selection::Quit,
            _ => {}
        }
        if let Ok(position) = line.parse::<usize>() {
            return match view.topic_at(position) {
                Some(topic) => Selection::Topic(topic.to_string()),
                None => Selection::Unknown,
            };
        }
        view.topics
            .iter()
            .find(|card| card.topic.eq_ignore_ascii_case(line))
            .map(|card| Selection::Topic(card.topic.clone()))
            .unwrap_or(Selection::Unknown)
    }

    /// Show the topic list, then either one topic's detail or the
    /// interactive picker
    pub async fn run_revise(config: Config, topic: Option<String>) -> Result<()> {
        let mut app = build_app(&config)?;
        if !enter_protected(&mut app, Route::Revise).await? {
            return Ok(());
        }

        if let Some(topic) = topic {
            print!("{}", app.revise.render_topics());
            let guard = InterruptGuard::new();
            app.handle_revise(ReviseEvent::Select(topic), guard.token())
                .await?;
            print!("{}", app.revise.render_detail());
            return Ok(());
        }

        let mut rl = DefaultEditor::new()?;
        match revise_loop(&mut app, &mut rl).await? {
            Exit::BackToChat => chat::chat_loop(&mut app).await,
            Exit::Quit => Ok(()),
        }
    }

    /// Picker loop on an app already showing the revise view
    pub async fn revise_loop(app: &mut App<ApiClient>, rl: &mut DefaultEditor) -> Result<Exit> {
        print!("{}", app.revise.render());
        println!(
            "{}",
            "Enter a topic number or name, /back for chat, /exit to quit.".dimmed()
        );

        loop {
            let line = match rl.readline("topic> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(Exit::Quit),
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    return Ok(Exit::Quit);
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match parse_selection(&app.revise, &line) {
                Selection::Topic(topic) => {
                    let guard = InterruptGuard::new();
                    app.handle_revise(ReviseEvent::Select(topic), guard.token())
                        .await?;
                    drop(guard);
                    println!();
                    print!("{}", app.revise.render_detail());
                }
                Selection::Back => {
                    let cancel = CancellationToken::new();
                    app.handle_revise(ReviseEvent::BackToChat, &cancel).await?;
                    if app.route() == Route::Chat {
                        return Ok(Exit::BackToChat);
                    }
                    return Ok(Exit::Quit);
                }
                Selection::Quit => return Ok(Exit::Quit),
                Selection::Unknown => {
                    println!("{}", format!("No topic matches '{}'", line.trim()).yellow());
                }
            }
        }
    }

}

/// Session inspection and logout
pub mod session {
    use super::*;

    /// Remove the stored session
    pub fn logout(config: &Config) -> Result<()> {
        let session = SessionStore::open(&config.session)?;
        let was_logged_in = session.is_authenticated()?;
        session.clear()?;
        if was_logged_in {
            println!("Logged out.");
        } else {
            println!("No active session.");
        }
        Ok(())
    }

    /// Print the identity requests are sent under
    pub fn whoami(config: &Config) -> Result<()> {
        let session = SessionStore::open(&config.session)?;
        match session.current()? {
            Some(current) => println!("Logged in as {}", current.user_id.bold()),
            None => println!(
                "Not logged in (requests use {})",
                session.current_user_id()?
            ),
        }
        println!("Session store: {}", config.session.location());
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::config::SessionConfig;
        use tempfile::TempDir;

        fn config_in(dir: &TempDir) -> Config {
            Config {
                session: SessionConfig {
                    path: Some(dir.path().join("session.json")),
                },
                ..Config::default()
            }
        }

        #[test]
        fn test_logout_clears_stored_session() {
            let dir = TempDir::new().unwrap();
            let config = config_in(&dir);
            let store = SessionStore::open_file(dir.path().join("session.json")).unwrap();
            store.save("t1", "u1").unwrap();

            logout(&config).unwrap();

            let store = SessionStore::open_file(dir.path().join("session.json")).unwrap();
            assert!(!store.is_authenticated().unwrap());
        }

        #[test]
        fn test_logout_recovers_from_corrupt_session_file() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("session.json");
            std::fs::write(&path, r#"{"auth_token": "t1", "user_"#).unwrap();

            logout(&config_in(&dir)).unwrap();

            let store = SessionStore::open_file(&path).unwrap();
            assert!(!store.is_authenticated().unwrap());
            assert_eq!(store.current_user_id().unwrap(), "demo_user");
            let contents = std::fs::read_to_string(&path).unwrap();
            assert!(serde_json::from_str::<serde_json::Value>(&contents).is_ok());
        }

        #[test]
        fn test_whoami_without_session_succeeds() {
            let dir = TempDir::new().unwrap();
            assert!(whoami(&config_in(&dir)).is_ok());
        }
    }
}
