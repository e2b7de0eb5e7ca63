//! Daily summary composition.
//!
//! Pure text building: given a user, their todo snapshot, and the summary
//! date, produce the email subject and body. The date is injected so the
//! output is fully determined by its inputs.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::db::{Todo, User};

/// Build the subject and plain-text body for one user's daily summary.
pub fn compose(user: &User, todos: &[Todo], as_of: DateTime<Tz>, app_name: &str) -> (String, String) {
    let subject = format!("Your Todo Summary · {}", as_of.format("%b %d, %Y"));

    let total = todos.len();
    let completed = todos.iter().filter(|t| t.is_complete()).count();
    let pending = total - completed;

    let mut lines = vec![
        format!("Hey {},", user.greeting_name()),
        String::new(),
        format!(
            "Here is your todo snapshot for {}:",
            as_of.format("%A, %d %B %Y")
        ),
        format!("• Total tasks: {}", total),
        format!("• Completed: {}", completed),
        format!("• Pending: {}", pending),
        String::new(),
    ];

    if todos.is_empty() {
        lines.push("Looks like you had a clean slate today. Great job!".to_string());
    } else {
        lines.push("Tasks:".to_string());
        for (idx, todo) in todos.iter().enumerate() {
            let status = if todo.is_complete() { "Done" } else { "Pending" };
            lines.push(format!(
                "{}. {} [{}] (Priority {})\n   {}",
                idx + 1,
                todo.title,
                status,
                todo.priority,
                todo.description
            ));
        }
    }

    lines.extend([
        String::new(),
        "Tomorrow is a fresh start — all tasks have been cleared.".to_string(),
        "Keep up the great work!".to_string(),
        String::new(),
        format!("{} Bot", app_name),
    ]);

    (subject, lines.join("\n"))
}
