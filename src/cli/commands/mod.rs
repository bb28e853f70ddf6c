pub mod add;
pub mod edit;
pub mod list;
pub mod remove;
pub mod setup;
pub mod show;
pub mod status;
pub mod watch;
