pub mod arguments;
pub mod error;
pub mod publisher;
pub mod resolver;
pub mod vcs;
pub mod version;
pub mod versioning;
pub mod workdir;
