/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Error types shared by the whole codec.

Every fallible operation in this crate returns [`Result`]. The variants map
one-to-one to the failure classes of the codec: frame-level corruption,
missing schema or type knowledge (both recoverable after a metadata
refresh), configuration mistakes caught at registration time, metadata merge
conflicts, user-hook failures, and values the wire format cannot express.

*/

pub type Result<T> = core::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
/// Errors that can happen while encoding, decoding, or registering types.
pub enum Error {
    /// The byte stream is not a well-formed frame: bad header tag, truncated
    /// buffer, or a length field overrunning the buffer. Fatal to the current
    /// decode only.
    #[error("corrupt frame: {0}")]
    CorruptFrame(String),

    /// A compact footer referenced a schema that is not in the registry.
    /// The caller may retry after a metadata sync.
    #[error("unknown schema 0x{schema_id:08x} for type 0x{type_id:08x}")]
    UnknownSchema { type_id: i32, schema_id: i32 },

    /// No descriptor is known for a type that needs one to be decoded.
    /// The caller may retry after a metadata sync.
    #[error("unknown type 0x{type_id:08x}")]
    UnknownType { type_id: i32 },

    /// Invalid type registration: duplicate field names or ids, colliding
    /// type ids, or a serializer misusing the writer protocol. Unrecoverable.
    #[error("type configuration error: {0}")]
    TypeConfig(String),

    /// Two metadata updates for the same type disagree on a field's type,
    /// or two unequal schemas collided on one schema id. Unrecoverable.
    #[error("metadata conflict: {0}")]
    MetadataConflict(String),

    /// A `write_replace`/`read_resolve` hook returned an error.
    #[error("user hook failed")]
    UserHook(#[source] anyhow::Error),

    /// The value cannot be represented in the wire format (e.g. a char
    /// outside the basic multilingual plane, or a negative decimal scale).
    #[error("unsupported value: {0}")]
    Unsupported(String),

    /// The caller's cancellation token was triggered at a metadata-update
    /// boundary. The bytes written so far are complete and valid.
    #[error("cancelled at metadata-update boundary")]
    Cancelled,
}

impl Error {
    /// Shorthand for a [`Error::CorruptFrame`] with a formatted reason.
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Error::CorruptFrame(reason.into())
    }
}
