//! Fetch adapter implementations.
//!
//! Available sources:
//! - `RemoteOk` - the public RemoteOK JSON feed
//! - `StaticSource` - a fixed list of records (fixtures, replays)

pub mod remoteok;
pub mod static_source;

pub use remoteok::RemoteOk;
pub use static_source::StaticSource;
