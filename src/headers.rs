//! Ordered STOMP header collections.
//!
//! Headers are ordered name/value string pairs. Duplicate names are
//! permitted and preserved; insertion order is significant for encoding.
//! Lookups for well-known headers are ASCII case-insensitive and return the
//! first match, per STOMP 1.1 ("only the first occurrence is used").
//!
//! [`Headers`] is the frozen form carried on a message. [`MutableHeaders`]
//! is the builder used while decoding and when decorating deliveries, and
//! converts into the frozen form with [`MutableHeaders::freeze`].

/// Name of the payload length header.
pub const CONTENT_LENGTH: &str = "content-length";
/// Name of the routing key header on SEND/SUBSCRIBE/MESSAGE frames.
pub const DESTINATION: &str = "destination";
/// Name of the client-chosen subscription id header.
pub const ID: &str = "id";
/// Name of the client receipt-request header.
pub const RECEIPT: &str = "receipt";
/// Name of the server receipt-acknowledgement header.
pub const RECEIPT_ID: &str = "receipt-id";
/// Name of the short error description header on ERROR frames.
pub const MESSAGE: &str = "message";
/// Name of the per-connection message id header on MESSAGE frames.
pub const MESSAGE_ID: &str = "message-id";
/// Name of the subscription id header on MESSAGE frames.
pub const SUBSCRIPTION: &str = "subscription";

fn first_value<'a>(entries: &'a [(String, String)], name: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn parse_content_length(entries: &[(String, String)]) -> Option<usize> {
    // Unparsable and negative values behave as if the header were absent.
    first_value(entries, CONTENT_LENGTH).and_then(|value| value.parse().ok())
}

/// Frozen, ordered header list carried on a [`StompMessage`].
///
/// [`StompMessage`]: crate::message::StompMessage
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a header list from name/value pairs, preserving order and
    /// duplicates.
    #[must_use]
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    /// Returns the value of the first header matching `name`
    /// (ASCII case-insensitive).
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        first_value(&self.entries, name)
    }

    /// Parsed `content-length` header, if present and non-negative.
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        parse_content_length(&self.entries)
    }

    /// Value of the `destination` header.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.first(DESTINATION)
    }

    /// Value of the `id` header.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.first(ID)
    }

    /// Value of the `receipt` header requested by the client.
    #[must_use]
    pub fn receipt(&self) -> Option<&str> {
        self.first(RECEIPT)
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the entries into a new builder, e.g. for delivery decoration.
    #[must_use]
    pub fn to_mutable(&self) -> MutableHeaders {
        MutableHeaders {
            entries: self.entries.clone(),
        }
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(pairs: I) -> Self {
        Self::from_pairs(pairs)
    }
}

/// Growable header builder used during decoding and message composition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutableHeaders {
    entries: Vec<(String, String)>,
}

impl MutableHeaders {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, keeping any existing entries with the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces all entries named exactly `name` (case-sensitive) with a
    /// single entry appended at the end.
    pub fn put(&mut self, name: &str, value: impl Into<String>) {
        self.entries.retain(|(entry, _)| entry != name);
        self.entries.push((name.to_owned(), value.into()));
    }

    /// Appends every entry of `other`.
    pub fn extend_from(&mut self, other: &MutableHeaders) {
        self.entries.extend_from_slice(&other.entries);
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the value of the first header matching `name`
    /// (ASCII case-insensitive).
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        first_value(&self.entries, name)
    }

    /// Parsed `content-length` header, if present and non-negative.
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        parse_content_length(&self.entries)
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts the builder into the frozen form.
    #[must_use]
    pub fn freeze(self) -> Headers {
        Headers {
            entries: self.entries,
        }
    }
}
