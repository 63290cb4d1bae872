//! # Engine driver
//!
//! Client side adapters between a relational database client API and an embedded SQL engine.
//! The engine itself is not part of this crate. It is accessed through the collaborator traits in
//! [`handles`], most notably [`handles::LobSession`].
//!
//! Two adapters carry the weight:
//!
//! * [`ClobClient`] and the streams in [`lob`] give blocking, buffered access to character large
//!   objects, transcoding between UTF-16 and single byte charsets on the fly. Modifications are
//!   isolated from other readers by duplicating the object on the first write.
//! * [`CallableStatement`] addresses the parameters of a procedure call by ordinal or by name and
//!   converts values between SQL types.

mod callable;
mod error;
mod row;
mod value;

pub mod capabilities;
pub mod charset;
pub mod conversion;
pub mod handles;
pub mod lob;
pub mod parameter;

pub use self::{
    callable::CallableStatement,
    capabilities::{Capability, DriverCapabilities},
    conversion::convert,
    error::{Error, codes},
    lob::{ClobClient, LobStreamOptions},
    parameter::{ParameterMetadata, ParameterMode, ParameterRef},
    row::UpdatableRow,
    value::{Date, Time, Timestamp, Value},
};
// Reexports
pub use widestring::{U16Str, U16String};
