//! Per-user rooms: the addressing layer for directed relay.
//!
//! A room is keyed by user id and holds every connection that announced that
//! id. Relaying "to user N" means delivering to every member of room N.

pub mod room;
pub mod table;

pub use room::Room;
pub use table::{Membership, RoomTable};
