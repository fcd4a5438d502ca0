mod user_repository;
mod post_repository;
mod comment_repository;
mod follow_repository;

pub use user_repository::{CreatedUser, NewUser, ProfileImage, UserRepository};
pub use post_repository::PostRepository;
pub use comment_repository::CommentRepository;
pub use follow_repository::FollowRepository;
