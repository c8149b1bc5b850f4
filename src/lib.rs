//! Modbus base library: frame codecs, PDU types, server dispatcher, client
//! operations and the transport abstraction they all sit on.

#[macro_use]
extern crate log;

mod address_map;
mod client;
mod codec;
mod error;
mod frame;
mod io;
mod server;
mod transport;
mod wire_format;

pub use address_map::*;
pub use client::*;
pub use codec::*;
pub use error::*;
pub use frame::*;
pub use io::*;
pub use server::*;
pub use transport::*;
pub use wire_format::*;
