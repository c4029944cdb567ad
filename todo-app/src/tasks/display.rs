use crate::tasks::Task;
use std::borrow::Cow;

/// How many characters of a task are shown before it is cut off.
pub const DISPLAY_WIDTH: usize = 35;
pub const EMPTY_BOARD_MESSAGE: &str = "No todos yet. Add one above!";

/// Shortens `text` to `max_len` characters followed by `...`. The stored text is never touched.
pub fn truncate(text: &str, max_len: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_len) {
        None => Cow::Borrowed(text),
        Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
    }
}

/// One line of the rendered list, e.g. `[x] 2. buy milk`.
pub fn render_row(position: usize, task: &Task) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    format!(
        "[{}] {}. {}",
        mark,
        position,
        truncate(&task.text, DISPLAY_WIDTH)
    )
}

pub fn render_board(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return EMPTY_BOARD_MESSAGE.to_string();
    }
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| render_row(index + 1, task))
        .collect::<Vec<_>>()
        .join("\n")
}
