//! twimbol-store - File-backed session persistence.

mod file;

pub use file::FileTokenStore;
