pub mod setup;
pub mod top;
pub mod ui;
