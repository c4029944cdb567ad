//! The personal task list and its synchronization with the remote `tasks` table.
//!
//! [`TaskBoard`] is the local collection the shell renders. It is a disposable cache:
//! the remote table is the source of truth, and [`TaskStore`] rebuilds the board from
//! a full list query after mutations. Status toggles are the exception, they are
//! applied to the board before the remote call completes.

pub mod display;

use crate::config::{SyncMode, TasksConfig, ToggleFailurePolicy};
use crate::connectors::supabase::{self, NewTaskRow, Session, TaskId, TaskRow, TaskTable};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    /// Every task operation needs a signed-in user
    #[error("Please log in to manage your tasks")]
    NotSignedIn,
    #[error("There is no task with id {0}")]
    UnknownTask(TaskId),
    #[error("Something went wrong with your tasks: {0}")]
    Backend(#[from] supabase::Error),
}

/// Outcome of [`TaskStore::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Added {
    /// The text was blank and nothing was sent.
    Nothing,
    /// A row was stored. The id is absent when the table returned no representation.
    Task(Option<TaskId>),
}

impl Added {
    pub fn into_id(self) -> Option<TaskId> {
        match self {
            Added::Task(id) => id,
            Added::Nothing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            text: row.task,
            completed: row.status,
            owner: row.user_id,
            created_at: row.created_at,
        }
    }
}

/// Local, ordered copy of the signed-in user's tasks, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBoard {
    tasks: Vec<Task>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    /// Looks a task up by its 1-based position in the rendered list.
    pub fn at_position(&self, position: usize) -> Option<&Task> {
        position.checked_sub(1).and_then(|index| self.tasks.get(index))
    }

    /// Throws the current contents away in favor of `tasks`.
    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Flips the completion flag of `id`, returning the new value.
    pub fn flip(&mut self, id: &TaskId) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|task| &task.id == id)?;
        task.completed = !task.completed;
        Some(task.completed)
    }

    pub fn set_completed(&mut self, id: &TaskId, completed: bool) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|task| &task.id == id)?;
        let previous = task.completed;
        task.completed = completed;
        Some(previous)
    }

    pub fn prepend(&mut self, task: Task) {
        self.tasks.insert(0, task);
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| &task.id == id)?;
        Some(self.tasks.remove(index))
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

/// Runs task operations for one signed-in user against a [`TaskTable`].
///
/// The session is handed in on every call rather than read from shared state, and
/// each operation rejects with [`Error::NotSignedIn`] before touching the network
/// when there is none.
pub struct TaskStore<'a, TABLE: TaskTable> {
    table: &'a TABLE,
    board: &'a mut TaskBoard,
    options: TasksConfig,
}

impl<'a, TABLE: TaskTable> TaskStore<'a, TABLE> {
    pub fn new(table: &'a TABLE, board: &'a mut TaskBoard, options: TasksConfig) -> Self {
        Self {
            table,
            board,
            options,
        }
    }

    pub fn board(&self) -> &TaskBoard {
        &*self.board
    }

    /// Replaces the board with every task the user owns, newest first.
    ///
    /// A failed fetch is logged and leaves the board as it was.
    #[tracing::instrument(skip_all)]
    pub async fn list(&mut self, session: Option<&Session>) -> Result<(), Error> {
        let session = session.ok_or(Error::NotSignedIn)?;
        self.refresh(session).await;
        Ok(())
    }

    async fn refresh(&mut self, session: &Session) {
        match self.table.select_by_owner(session).await {
            Ok(rows) => self.board.replace(rows.into_iter().map(Task::from).collect()),
            Err(error) => error!(%error, "Error fetching tasks"),
        }
    }

    /// Creates a task with `text`, then resynchronizes the board.
    ///
    /// Blank text is ignored and [`Added::Nothing`] is returned without any remote call.
    #[tracing::instrument(skip_all)]
    pub async fn add(&mut self, session: Option<&Session>, text: &str) -> Result<Added, Error> {
        let session = session.ok_or(Error::NotSignedIn)?;
        if text.trim().is_empty() {
            return Ok(Added::Nothing);
        }

        let row = NewTaskRow {
            task: text.to_string(),
            status: false,
            user_id: session.user.id,
        };
        let inserted = self.table.insert(session, &row).await.map_err(|error| {
            error!(%error, "Error adding task");
            error
        })?;
        let id = inserted.first().map(|row| row.id.clone());
        info!(id = ?id, "Task added");

        // Without the stored representation there is nothing to merge.
        match self.options.sync {
            SyncMode::Merge if !inserted.is_empty() => {
                for row in inserted.into_iter().rev() {
                    self.board.prepend(Task::from(row));
                }
            }
            SyncMode::Merge => {
                warn!("Insert returned no row, refreshing instead of merging");
                self.refresh(session).await;
            }
            SyncMode::Refetch => self.refresh(session).await,
        }
        Ok(Added::Task(id))
    }

    /// Flips the completion flag of `id` locally, then writes it to the table.
    ///
    /// Returns the flag as the board now shows it. What happens on a failed write
    /// depends on [`ToggleFailurePolicy`].
    #[tracing::instrument(skip(self, session))]
    pub async fn toggle_status(
        &mut self,
        session: Option<&Session>,
        id: &TaskId,
    ) -> Result<bool, Error> {
        let session = session.ok_or(Error::NotSignedIn)?;
        let status = self
            .board
            .flip(id)
            .ok_or_else(|| Error::UnknownTask(id.clone()))?;

        match self.table.update_status(session, id, status).await {
            Ok(()) => {
                if self.options.sync == SyncMode::Refetch {
                    self.refresh(session).await;
                }
                Ok(status)
            }
            Err(error) => match self.options.toggle_failure {
                ToggleFailurePolicy::Keep => {
                    error!(%error, "Error updating task status");
                    Ok(status)
                }
                ToggleFailurePolicy::Rollback => {
                    warn!(%error, "Error updating task status, reverting");
                    self.board.set_completed(id, !status);
                    Err(error.into())
                }
            },
        }
    }

    /// Deletes `id` from the table and, once confirmed, refreshes the board.
    #[tracing::instrument(skip(self, session))]
    pub async fn delete(&mut self, session: Option<&Session>, id: &TaskId) -> Result<(), Error> {
        let session = session.ok_or(Error::NotSignedIn)?;
        if let Err(error) = self.table.delete(session, id).await {
            error!(%error, "Error deleting task");
            return Err(error.into());
        }

        match self.options.sync {
            SyncMode::Refetch => self.refresh(session).await,
            SyncMode::Merge => {
                self.board.remove(id);
            }
        }
        Ok(())
    }
}
