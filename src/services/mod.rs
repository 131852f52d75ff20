pub mod health;
pub mod history;
pub mod inference;
pub mod orchestrator;
pub mod session_manager;
