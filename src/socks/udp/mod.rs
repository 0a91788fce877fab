//! UDP ASSOCIATE support
//!
//! Datagram encapsulation codec and the per-session relay.

mod packet;
mod relay;

pub use packet::{encode_reply_packet, parse_packet, UdpPacket};
pub use relay::handle_udp_associate;
