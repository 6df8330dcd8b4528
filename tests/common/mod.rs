#![allow(dead_code)]

use std::net::Ipv4Addr;

use diffserv_shaper::Packet;
use diffserv_shaper::headers::{PROTO_TCP, PROTO_UDP, build_ipv4};

pub const CLIENT: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
pub const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

pub fn udp_to(dst_port: u16, len: usize) -> Packet<Vec<u8>> {
    Packet::new(build_ipv4(CLIENT, SERVER, PROTO_UDP, 0, 40000, dst_port, len))
}

pub fn tcp_to(dst_port: u16, len: usize) -> Packet<Vec<u8>> {
    Packet::new(build_ipv4(CLIENT, SERVER, PROTO_TCP, 0, 40000, dst_port, len))
}
