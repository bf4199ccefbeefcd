mod emotions;
mod messages;
mod notifications;
mod sessions;
mod users;
