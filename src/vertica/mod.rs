//! Vertica Frontend and Backend Protocol
//!
//! Vertica speaks a dialect of the PostgreSQL v3 frontend/backend protocol.
//!
//! ## Messaging Overview
//!
//! All communication is through a stream of messages. The first byte of a
//! message identifies the message type, and the next four bytes specify the
//! length of the rest of the message (this length count includes itself,
//! but not the message-type byte). The remaining contents of the message are
//! determined by the message type.
//!
//! ```text
//! ┏━━━━┳━━━━━━━━━━━━━━━━━━━┳━━━━━━┓
//! ┃ Ty ┃       Length      ┃ Body ┃
//! ┣━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━┫
//! ┃ u8 ┃        u32        ┃ [u8] ┃
//! ┗━━━━┻━━━━━━━━━━━━━━━━━━━┻━━━━━━┛
//! ```
//!
//! For historical reasons, the very first message sent by the client (the
//! startup message) has no initial message-type byte.
//!
//! This client only issues the simple query flow, in which all result values
//! are transmitted in text format.

pub mod frontend;
pub mod backend;

mod error;

/// Object id of a data type.
///
/// Note that Vertica assigns its own type oids, they do not match the
/// Postgres ones. The oid is carried as column metadata only.
pub type Oid = u32;

pub use frontend::FrontendProtocol;
pub use backend::{BackendMessage, BackendProtocol, ErrorResponse, NoticeResponse};
pub use error::ProtocolError;
