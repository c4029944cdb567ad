//! Line-oriented front-end over the identity gate and the task store.
//!
//! Each input line is parsed as one command. Arguments follow shell quoting rules, so
//! `login bob@x.com "correct horse"` passes the password with its space. The text of
//! `add` is taken verbatim from the rest of the line. Task commands are only served
//! while the session view reports a signed-in user.

use crate::config::Config;
use crate::connectors::supabase::{AuthConnector, TaskTable};
use crate::identity::session::{SessionStore, SessionView};
use crate::identity::{self, IdentityGate, LoginForm, RegistrationForm, Route};
use crate::tasks::display::render_board;
use crate::tasks::{self, Added, TaskBoard, TaskStore};
use clap::{Parser, Subcommand};

pub const NOT_LOGGED_IN: &str = "Not logged in";
pub const UNBALANCED_QUOTES: &str = "Unbalanced quotes, close every \" and ' you open";

const ADD_COMMAND: &str = "add";

#[derive(Parser, Debug)]
#[command(name = "todo", no_binary_name = true, disable_version_flag = true)]
struct Input {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Create an account. A verification email is sent to the address
    Register {
        #[arg(allow_hyphen_values = true)]
        display_name: Option<String>,
        #[arg(allow_hyphen_values = true)]
        email: Option<String>,
        #[arg(allow_hyphen_values = true)]
        password: Option<String>,
        #[arg(allow_hyphen_values = true)]
        confirm_password: Option<String>,
    },
    /// Sign in with email and password
    Login {
        #[arg(allow_hyphen_values = true)]
        email: Option<String>,
        #[arg(allow_hyphen_values = true)]
        password: Option<String>,
    },
    /// Show your tasks, newest first
    List,
    /// Add a task. Everything after the command word is stored as typed
    Add {
        #[arg(allow_hyphen_values = true)]
        text: Option<String>,
    },
    /// Mark the task at a list position as done or not done
    Toggle { position: usize },
    /// Delete the task at a list position
    Delete { position: usize },
    /// Show who is signed in
    Whoami,
    /// Sign out
    Logout,
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// What the caller should do with a handled line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Quit,
}

pub struct Shell<'a, AUTH: AuthConnector, TABLE: TaskTable> {
    auth: &'a AUTH,
    table: &'a TABLE,
    sessions: &'a SessionStore,
    config: &'a Config,
    board: TaskBoard,
    view: SessionView,
}

impl<'a, AUTH: AuthConnector, TABLE: TaskTable> Shell<'a, AUTH, TABLE> {
    pub fn new(
        auth: &'a AUTH,
        table: &'a TABLE,
        sessions: &'a SessionStore,
        config: &'a Config,
    ) -> Self {
        Self {
            auth,
            table,
            sessions,
            config,
            board: TaskBoard::new(),
            view: SessionView::attach(sessions),
        }
    }

    /// The navigation banner.
    pub fn banner(&self) -> String {
        match self.view.user() {
            Some(user) => format!("Welcome, {}", user.display_name()),
            None => NOT_LOGGED_IN.to_string(),
        }
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    pub async fn handle(&mut self, line: &str) -> Reply {
        if line.trim().is_empty() {
            return Reply::Output(String::new());
        }
        let Some(args) = split_arguments(line) else {
            return Reply::Output(UNBALANCED_QUOTES.to_string());
        };
        let input = match Input::try_parse_from(args) {
            Ok(input) => input,
            Err(error) => {
                return Reply::Output(error.render().to_string().trim_end().to_string());
            }
        };

        let output = match input.command {
            Command::Quit => return Reply::Quit,
            Command::Register {
                display_name,
                email,
                password,
                confirm_password,
            } => {
                let mut form = RegistrationForm::new(
                    display_name.unwrap_or_default(),
                    email.unwrap_or_default(),
                    password.unwrap_or_default(),
                    confirm_password.unwrap_or_default(),
                );
                self.register(&mut form).await
            }
            Command::Login { email, password } => {
                let form = LoginForm::new(email.unwrap_or_default(), password.unwrap_or_default());
                self.login(&form).await
            }
            Command::Whoami => self.banner(),
            Command::Logout => self.logout().await,
            task_command => {
                if identity::gate(&self.view) != Route::Tasks {
                    return Reply::Output(tasks::Error::NotSignedIn.to_string());
                }
                self.run_task_command(task_command).await
            }
        };
        Reply::Output(output)
    }

    fn gate(&self) -> IdentityGate<'a, AUTH> {
        let config: &'a Config = self.config;
        IdentityGate::new(self.auth, self.sessions, &config.auth)
    }

    async fn register(&self, form: &mut RegistrationForm) -> String {
        match self.gate().register(form).await {
            Ok(notice) => notice.to_string(),
            Err(error) => error.to_string(),
        }
    }

    async fn login(&mut self, form: &LoginForm) -> String {
        let result = self.gate().login(form).await;
        match result {
            Ok(_) => {
                let board = self.list().await;
                format!("{}\n{}", self.banner(), board)
            }
            Err(error) => error.to_string(),
        }
    }

    async fn logout(&mut self) -> String {
        self.gate().sign_out().await;
        self.board.clear();
        self.banner()
    }

    async fn run_task_command(&mut self, command: Command) -> String {
        match command {
            Command::List => self.list().await,
            Command::Add { text } => self.add(&text.unwrap_or_default()).await,
            Command::Toggle { position } => self.toggle(position).await,
            Command::Delete { position } => self.delete(position).await,
            _ => String::new(),
        }
    }

    async fn list(&mut self) -> String {
        let session = self.sessions.get_session();
        let mut store = TaskStore::new(self.table, &mut self.board, self.config.tasks);
        let result = store.list(session.as_ref()).await;
        match result {
            Ok(()) => render_board(self.board.tasks()),
            Err(error) => error.to_string(),
        }
    }

    async fn add(&mut self, text: &str) -> String {
        let session = self.sessions.get_session();
        let mut store = TaskStore::new(self.table, &mut self.board, self.config.tasks);
        let result = store.add(session.as_ref(), text).await;
        match result {
            Ok(Added::Task(_)) => render_board(self.board.tasks()),
            Ok(Added::Nothing) => "Nothing to add".to_string(),
            Err(error) => error.to_string(),
        }
    }

    async fn toggle(&mut self, position: usize) -> String {
        let Some(id) = self.board.at_position(position).map(|task| task.id.clone()) else {
            return no_such_position(position);
        };
        let session = self.sessions.get_session();
        let mut store = TaskStore::new(self.table, &mut self.board, self.config.tasks);
        let result = store.toggle_status(session.as_ref(), &id).await;
        match result {
            Ok(_) => render_board(self.board.tasks()),
            Err(error) => error.to_string(),
        }
    }

    async fn delete(&mut self, position: usize) -> String {
        let Some(id) = self.board.at_position(position).map(|task| task.id.clone()) else {
            return no_such_position(position);
        };
        let session = self.sessions.get_session();
        let mut store = TaskStore::new(self.table, &mut self.board, self.config.tasks);
        let result = store.delete(session.as_ref(), &id).await;
        match result {
            Ok(()) => render_board(self.board.tasks()),
            Err(error) => error.to_string(),
        }
    }
}

/// Splits a line into command arguments. `None` means the quoting is unbalanced.
///
/// The text of `add` is not tokenized: it becomes a single argument holding the rest
/// of the line after the separating whitespace.
fn split_arguments(line: &str) -> Option<Vec<String>> {
    let line = line.trim_start();
    let (word, rest) = line
        .split_once(|c: char| c.is_whitespace())
        .unwrap_or((line, ""));
    if word == ADD_COMMAND {
        let text = rest.trim_start_matches(|c: char| c.is_whitespace());
        let mut args = vec![ADD_COMMAND.to_string()];
        if !text.is_empty() {
            args.push(text.to_string());
        }
        return Some(args);
    }
    shlex::split(line)
}

fn no_such_position(position: usize) -> String {
    format!("There is no task number {}. Run `list` to see your tasks", position)
}
