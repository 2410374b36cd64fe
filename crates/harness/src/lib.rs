pub mod board;
pub mod flaky;

pub use board::{task_doc, task_draft, TestBoard, UNTITLED};
pub use flaky::FlakyStore;
