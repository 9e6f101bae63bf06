//! Records stored in the realtime database.

pub mod chat;
pub mod notification;
pub mod order;
pub mod profile;
pub mod site;

pub use chat::{
    ADMIN_DISPLAY_NAME, ChatMessage, ChatSession, DecodedSessions, MessageText, NewChatSession,
    decode_sessions, is_terminal,
};
pub use notification::{NewNotification, Notification};
pub use order::{ANONYMOUS_USER, Order, OrderRecord, decode_orders};
pub use profile::{BanRecord, UserEntry, UserProfile, decode_users, default_username};
pub use site::{Announcement, SiteStatus, banner_text};
