//! Independent subscribers to the engine's event stream.

pub mod achievements;
pub mod analogue;

pub use achievements::{Achievement, AchievementNotifier};
pub use analogue::AnalogueRenderer;
