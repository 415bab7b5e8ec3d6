//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They
//! validate input, compose post queries and translate storage failures into
//! typed errors.

pub mod category;
pub mod comment;
pub mod location;
pub mod password;
pub mod post;
pub mod upload;
pub mod user;

pub use category::{CategoryService, CategoryServiceError, CreateCategoryInput};
pub use comment::{CommentService, CommentServiceError};
pub use location::{LocationService, LocationServiceError};
pub use password::{hash_password, validate_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use upload::{ImageStore, UploadError};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
