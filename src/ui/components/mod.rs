mod command_input;
mod filter_bar;
mod input;
mod prompt;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use filter_bar::{FilterBar, FilterBarEvent};
pub use input::{InputResult, TextInput};
pub use prompt::{Prompt, PromptEvent};
pub use search_input::{SearchEvent, SearchInput};

/// Result of a component handling a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, no event for parent to handle
  Handled,
  /// Key was consumed, here's an event for parent to process
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
