//! Domain records - what the document store holds, in typed form.

mod comment;
mod page;
mod post;
mod user;

pub use comment::{Comment, NewComment, UNKNOWN_USERNAME};
pub use page::{Page, PageRequest};
pub use post::{NewPost, Post, PostView};
pub use user::User;
