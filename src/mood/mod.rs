pub mod config;
pub mod emotion;
pub mod history;
pub mod notification;
pub mod smoother;
pub mod stats;

pub use config::{DurationMode, NotificationConfig, SmootherConfig};
pub use emotion::{EmotionKind, EmotionSample, MoodState};
pub use history::{MoodHistoryEntry, MoodHistoryLog};
pub use notification::{Notification, NotificationMessages, NotificationPolicy};
pub use smoother::MoodSmoother;
pub use stats::MoodStatistics;
