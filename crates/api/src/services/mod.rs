pub mod user;

pub use user::{LoginOutcome, SignUpProfile, UserService, UserServiceSettings};
