pub mod desk;
pub mod handlers;

pub use desk::{Desk, DeskError, Submission};
pub use handlers::{AppState, router};
