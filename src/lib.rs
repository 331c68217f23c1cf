pub mod app;
pub mod color;
pub mod data;
pub mod session;
pub mod state;
pub mod ui;

pub use app::SigmarkApp;
pub use session::{Session, SessionError};
