//! Services - behavior that spans more than one repository call.

mod feed;
mod likes;

#[cfg(test)]
mod testing;

pub use feed::{ANONYMOUS_AUTHOR, FeedReader, group_comments};
pub use likes::{LikeCounter, LikeOutcome};
