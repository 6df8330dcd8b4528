use crate::headers::HeaderView;

#[derive(Debug, Clone)]
pub struct Packet<T> {
    // Payload, starting at the IPv4 header
    pub msg: T,
    // Wire length, used as the DRR cost
    pub pkt_len: usize,
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub fn new(msg: T) -> Self {
        let pkt_len = msg.as_ref().len();
        Self { msg, pkt_len }
    }

    pub fn len(&self) -> usize {
        self.pkt_len
    }

    pub fn is_empty(&self) -> bool {
        self.pkt_len == 0
    }

    /// Peeks at the headers without touching the payload.
    pub fn headers(&self) -> HeaderView {
        HeaderView::from(self.msg.as_ref())
    }

    pub fn into_inner(self) -> T {
        self.msg
    }
}
