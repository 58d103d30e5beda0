// Utility functions
pub mod error;
pub mod gravatar;
pub mod response;
