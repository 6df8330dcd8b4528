use nfq::{Message, Verdict};

/// A packet held back from the kernel, plus the NFQUEUE it must be released
/// on.
pub struct NfqMessage {
    msg: Message,
    queue_idx: usize,
}

impl NfqMessage {
    pub fn new(msg: Message, queue_idx: usize) -> Self {
        Self { msg, queue_idx }
    }

    pub fn queue_idx(&self) -> usize {
        self.queue_idx
    }

    pub fn with_verdict(self, verdict: Verdict) -> Message {
        let mut msg = self.msg;
        msg.set_verdict(verdict);
        msg
    }
}

impl AsRef<[u8]> for NfqMessage {
    fn as_ref(&self) -> &[u8] {
        self.msg.get_payload()
    }
}
