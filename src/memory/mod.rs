//! 记忆层：流水线 transcript 与运行轨迹持久化

pub mod conversation;
pub mod persistence;

pub use conversation::{render_transcript, Message, Role};
pub use persistence::{RunTrace, TracePersistence};
