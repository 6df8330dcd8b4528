use std::net::Ipv4Addr;

pub const PROTO_ICMP: u8 = 1;
pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Fields {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: u8,
    pub tos: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ports {
    pub src: u16,
    pub dst: u16,
}

/// Borrowed, read-only view of the network and transport headers of a raw
/// IPv4 datagram. Layers that are absent or truncated are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderView {
    pub ipv4: Option<Ipv4Fields>,
    pub ports: Option<Ports>,
}

impl HeaderView {
    pub fn src_addr(&self) -> Option<Ipv4Addr> {
        self.ipv4.map(|ip| ip.src)
    }

    pub fn dst_addr(&self) -> Option<Ipv4Addr> {
        self.ipv4.map(|ip| ip.dst)
    }

    pub fn protocol(&self) -> Option<u8> {
        self.ipv4.map(|ip| ip.protocol)
    }

    pub fn tos(&self) -> Option<u8> {
        self.ipv4.map(|ip| ip.tos)
    }

    pub fn src_port(&self) -> Option<u16> {
        self.ports.map(|p| p.src)
    }

    pub fn dst_port(&self) -> Option<u16> {
        self.ports.map(|p| p.dst)
    }
}

impl From<&[u8]> for HeaderView {
    fn from(payload: &[u8]) -> Self {
        let mut view = HeaderView::default();

        // IPv4 header is at least 20 bytes
        if payload.len() < 20 {
            return view;
        }

        if (payload[0] >> 4) != 4 {
            return view;
        }

        // IHL counts 32-bit words
        let ihl = (payload[0] & 0x0F) as usize * 4;
        if ihl < 20 || payload.len() < ihl {
            return view;
        }

        let ip = Ipv4Fields {
            src: Ipv4Addr::from_bits(u32::from_be_bytes([
                payload[12],
                payload[13],
                payload[14],
                payload[15],
            ])),
            dst: Ipv4Addr::from_bits(u32::from_be_bytes([
                payload[16],
                payload[17],
                payload[18],
                payload[19],
            ])),
            protocol: payload[9],
            tos: payload[1],
        };
        view.ipv4 = Some(ip);

        // Ports only for TCP and UDP, and only if both fit
        if (ip.protocol == PROTO_TCP || ip.protocol == PROTO_UDP) && payload.len() >= ihl + 4 {
            view.ports = Some(Ports {
                src: u16::from_be_bytes([payload[ihl], payload[ihl + 1]]),
                dst: u16::from_be_bytes([payload[ihl + 2], payload[ihl + 3]]),
            });
        }

        view
    }
}

/// Builds a minimal IPv4 datagram (no options) followed by an 8-byte
/// transport stub carrying the ports, padded to `total_len`. Test support.
#[doc(hidden)]
pub fn build_ipv4(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    protocol: u8,
    tos: u8,
    src_port: u16,
    dst_port: u16,
    total_len: usize,
) -> Vec<u8> {
    let total_len = total_len.max(28);
    let mut buf = vec![0u8; total_len];
    buf[0] = 0x45;
    buf[1] = tos;
    buf[2..4].copy_from_slice(&(total_len as u16).to_be_bytes());
    buf[8] = 64;
    buf[9] = protocol;
    buf[12..16].copy_from_slice(&src.octets());
    buf[16..20].copy_from_slice(&dst.octets());
    buf[20..22].copy_from_slice(&src_port.to_be_bytes());
    buf[22..24].copy_from_slice(&dst_port.to_be_bytes());
    buf
}
