//! Configuration consumed by the protocol core.
//!
//! The transport/application layer supplies a [`StompConfig`] when wiring a
//! [`StompApp`](crate::engine::StompApp); the defaults match the reference
//! deployment (1 KiB reassembly buffer, verbose ERROR bodies).

/// Tunables for a STOMP server instance.
#[derive(Clone, Debug)]
pub struct StompConfig {
    buffer_size_limit: usize,
    verbose_errors: bool,
}

impl StompConfig {
    /// Default cap on undecoded bytes buffered per connection.
    pub const DEFAULT_BUFFER_SIZE_LIMIT: usize = 1024;

    /// Creates a configuration with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cap on undecoded bytes buffered per connection.
    ///
    /// A declared `content-length` or an accumulation of chunks over this
    /// limit is fatal to the connection.
    #[must_use]
    pub fn with_buffer_size_limit(mut self, limit: usize) -> Self {
        self.buffer_size_limit = limit;
        self
    }

    /// Chooses between full diagnostic ERROR bodies and short descriptions.
    #[must_use]
    pub fn with_verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }

    /// Cap on undecoded bytes buffered per connection.
    #[must_use]
    pub fn buffer_size_limit(&self) -> usize {
        self.buffer_size_limit
    }

    /// True when ERROR frame bodies carry the full diagnostic rather than
    /// the short description.
    #[must_use]
    pub fn verbose_errors(&self) -> bool {
        self.verbose_errors
    }
}

impl Default for StompConfig {
    fn default() -> Self {
        Self {
            buffer_size_limit: Self::DEFAULT_BUFFER_SIZE_LIMIT,
            verbose_errors: true,
        }
    }
}
