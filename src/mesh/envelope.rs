//! Addressed, TTL-bounded relay message.
//!
//! ```text
//! <target IPv4>:<command>:<ttl>
//! ```
//!
//! Exactly two delimiters. Text that does not fit this shape is not an
//! envelope and is handed to the command tokenizer as a bare command.

use core::fmt;
use core::net::Ipv4Addr;

use crate::app::commands::DELIMITER;

/// A parsed envelope borrowing its command text from the datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshEnvelope<'a> {
    pub target: Ipv4Addr,
    pub command: &'a str,
    pub ttl: u32,
}

impl<'a> MeshEnvelope<'a> {
    pub fn new(target: Ipv4Addr, command: &'a str, ttl: u32) -> Self {
        Self {
            target,
            command,
            ttl,
        }
    }

    /// Parse `text` as an envelope.
    ///
    /// Returns `None` unless the text has exactly two delimiters, the first
    /// field is a dotted IPv4 address, the middle field is non-empty and the
    /// last field is a non-negative integer.
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.trim();
        if text.matches(DELIMITER).count() != 2 {
            return None;
        }

        let mut fields = text.splitn(3, DELIMITER);
        let target = fields.next()?.parse::<Ipv4Addr>().ok()?;
        let command = fields.next().filter(|c| !c.is_empty())?;
        let ttl = fields.next()?.parse::<u32>().ok()?;

        Some(Self {
            target,
            command,
            ttl,
        })
    }

    /// The envelope as the next hop should see it, or `None` when the hop
    /// budget is already spent.
    pub fn decremented(&self) -> Option<Self> {
        let ttl = self.ttl.checked_sub(1)?;
        Some(Self { ttl, ..*self })
    }

    pub fn is_for(&self, addr: Ipv4Addr) -> bool {
        self.target == addr
    }
}

impl fmt::Display for MeshEnvelope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}",
            self.target, self.command, self.ttl
        )
    }
}
