pub mod directory;
pub mod item;
pub mod message;
pub mod user;

pub use directory::{Directory, DirectoryEntry, Preview};
pub use item::{ItemRecord, ItemRef};
pub use message::Message;
pub use user::UserRef;
