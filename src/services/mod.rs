pub mod cleanup;
pub mod credentials;
pub mod dispatch;
pub mod encryption;
pub mod fallback;
pub mod gemini;
pub mod keep_alive;
pub mod media;
pub mod pipeline;
pub mod queue;
pub mod segments;
pub mod session;
pub mod storage;
pub mod transcript;
pub mod uploader;
pub mod youtube;
