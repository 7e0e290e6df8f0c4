pub mod traits;

// Vision model backends
pub mod gemini;
