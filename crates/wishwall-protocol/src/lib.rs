//! Wire format shared by the gateway and every wish wall display.
//!
//! Three frame kinds travel over `/ws`: client requests (`req`), server
//! responses (`res`) and unsolicited server pushes (`event`).

pub mod frames;
pub mod handshake;
pub mod methods;
