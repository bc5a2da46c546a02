mod files;
mod headers;

// Export utility functions
pub use self::files::prepare_save_dir;
pub use self::headers::parse_headers;
