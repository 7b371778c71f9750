//! # Linear Symbology Encoders
//!
//! One routine per symbology family, all sharing the same contract:
//! validate length and alphabet, compute check digits, emit a width
//! string (start + per-character patterns + stop), expand it into the
//! bitmap, set the human-readable text and the row height.

pub mod channel;
pub mod code11;
pub mod code128;
pub mod code39;
pub mod plessey;
pub mod two_of_five;
