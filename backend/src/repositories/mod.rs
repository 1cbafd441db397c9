//! Persistence functions, one module per table.

pub mod chat;
pub mod comment;
pub mod like;
pub mod subscription;
pub mod user;
pub mod video;
pub mod watch_history;

/// Column list for queries that embed the owner's public profile next to `v.*`.
pub(crate) const VIDEO_CARD_COLUMNS: &str = "v.id, v.owner_id, v.title, v.description, \
     v.video_url, v.video_public_id, v.thumbnail_url, v.thumbnail_public_id, v.duration, \
     v.views, v.is_published, v.created_at, v.updated_at, \
     u.user_name AS owner_user_name, u.full_name AS owner_full_name, u.avatar_url AS owner_avatar";
