pub mod completion;
pub mod firebase_db;
pub mod google_auth;
pub mod identity;
pub mod memory;
pub mod store;
