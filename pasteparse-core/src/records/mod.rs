//! Record-level stages: cutting the region of interest into raw records and
//! pulling a key/value pair out of each one.
//!
//! ```text
//! region text
//!     ↓
//! [RecordSplitter]     ignore pattern stripped, split on newlines or end pattern
//!     ↓
//! Vec<RawRecord>
//!     ↓
//! [KeyValueExtractor]  key <delimiter> value, misses dropped
//!     ↓
//! KeyValueMap
//! ```

pub mod extractor;
pub mod splitter;

pub use extractor::KeyValueExtractor;
pub use splitter::RecordSplitter;
