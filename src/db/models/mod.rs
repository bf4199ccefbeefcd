pub mod emotion_log;
pub mod message;
pub mod notification;
pub mod session;
pub mod user;

pub use emotion_log::EmotionLogEntry;
pub use message::{ChatMessage, ChatRole};
pub use notification::NotificationRecord;
pub use session::{Session, SessionStatus};
pub use user::User;
