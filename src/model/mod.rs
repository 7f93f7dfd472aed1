//! Typed document model for catalog wire documents
//!
//! A document is one of three shapes: a product tree (`products:1.0` or
//! `index:*`), an item-group stream (`stream:1.0`), or a stream collection
//! (`stream-collection:1.0`) fanning out to regional sub-documents. All
//! entities are immutable once loaded; a reload produces a new instance.

mod collection;
mod format;
mod index;
mod stream;

pub use collection::{MirrorEntry, StreamCollection};
pub use format::FormatTag;
pub use index::{ChecksumKind, ContentIndex, Item, Product, Version};
pub use stream::{ItemGroup, StreamDocument, StreamItem};

/// A parsed catalog document of any recognized format family.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Index(ContentIndex),
    Stream(StreamDocument),
    Collection(StreamCollection),
}

impl Document {
    /// The format tag the document was declared with.
    pub fn format(&self) -> &FormatTag {
        match self {
            Document::Index(d) => &d.format,
            Document::Stream(d) => &d.format,
            Document::Collection(d) => &d.format,
        }
    }

    /// The content identifier, when the shape carries one. Stream
    /// documents use their `iqn` as the content identifier.
    pub fn content_id(&self) -> Option<&str> {
        match self {
            Document::Index(d) => Some(&d.content_id),
            Document::Stream(d) => Some(&d.iqn),
            Document::Collection(_) => None,
        }
    }
}
