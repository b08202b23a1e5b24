//! Shared state handed to every route handler.

use std::sync::Arc;

use rb_av::ToolRegistry;
use rb_engine::RingBuffer;

/// Application context, cloned into each request via Axum state.
///
/// Configuration is reached through [`RingBuffer::config`].
#[derive(Clone)]
pub struct AppContext {
    pub buffer: Arc<RingBuffer>,
    pub tools: Arc<ToolRegistry>,
}

impl AppContext {
    pub fn new(buffer: Arc<RingBuffer>, tools: Arc<ToolRegistry>) -> Self {
        Self { buffer, tools }
    }
}
