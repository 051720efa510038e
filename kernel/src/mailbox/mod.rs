//! VideoCore mailbox
//!
//! Single-producer/single-consumer exchange with the VideoCore over a pair
//! of FIFO registers. A message word carries a 4-bit channel tag in its low
//! bits and a 16-byte aligned bus address in the rest.
//!
//! ## Protocol
//!
//! - `send`: wait while STATUS.FULL, then write `address | channel`.
//!   It does not wait for the reply.
//! - `receive`: wait while STATUS.EMPTY, read one word. A word tagged for a
//!   different channel is dropped, not buffered; the hardware offers no
//!   way to push it back. Retry until a matching word arrives.
//!
//! Both are bounded by a poll-iteration limit, so neither a silent
//! VideoCore nor a FIFO that only ever yields foreign words can hang the
//! boot path.
//!
//! ## Concurrency
//!
//! There is no locking. The mailbox and the system timer touch disjoint
//! registers, so a timer IRQ taken during a poll is harmless, but two
//! foreground users of the same mailbox would race.

pub mod address;
pub mod framebuffer;

use bitflags::bitflags;
use thiserror::Error;

use crate::board;
use crate::mmio::Mmio;

pub use address::{BusWindow, IdentityMapped, PhysicalMemory};
pub use framebuffer::{FramebufferError, FramebufferFailure, FramebufferNegotiator, FramebufferRequest};

/// Offsets of the mailbox registers from the block base
const MAILBOX_READ: usize = board::MAILBOX_READ - board::MAILBOX_BASE;
const MAILBOX_STATUS: usize = board::MAILBOX_STATUS - board::MAILBOX_BASE;
const MAILBOX_WRITE: usize = board::MAILBOX_WRITE - board::MAILBOX_BASE;

/// Low bits of a mailbox word holding the channel tag
const CHANNEL_MASK: u32 = 0xF;

bitflags! {
    /// Mailbox status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MailboxStatus: u32 {
        /// Write FIFO cannot take another word
        const FULL = 1 << 31;
        /// Read FIFO holds no word
        const EMPTY = 1 << 30;
    }
}

/// Mailbox errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    #[error("no reply within the poll limit")]
    Timeout,

    #[error("mailbox stayed full for the whole poll limit")]
    WriteTimeout,

    #[error("payload {0:#010x} is not 16-byte aligned")]
    UnalignedPayload(u32),
}

/// 4-bit mailbox channel tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel(u8);

impl Channel {
    pub const POWER: Channel = Channel(0);
    /// Legacy framebuffer interface
    pub const FRAMEBUFFER: Channel = Channel(1);
    pub const VIRTUAL_UART: Channel = Channel(2);
    pub const VCHIQ: Channel = Channel(3);
    pub const LEDS: Channel = Channel(4);
    pub const BUTTONS: Channel = Channel(5);
    pub const TOUCHSCREEN: Channel = Channel(6);
    /// Property tags, ARM to VideoCore
    pub const PROPERTY: Channel = Channel(8);

    /// Channel for a raw tag; `None` if it does not fit in 4 bits
    pub const fn new(tag: u8) -> Option<Channel> {
        if tag as u32 <= CHANNEL_MASK {
            Some(Channel(tag))
        } else {
            None
        }
    }

    pub const fn tag(self) -> u8 {
        self.0
    }
}

/// One mailbox word, decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxMessage {
    pub channel: Channel,
    /// 16-byte aligned bus address (low 4 bits always zero)
    pub payload: u32,
}

impl MailboxMessage {
    /// Build a message; the payload must leave the tag bits clear
    pub fn new(channel: Channel, payload: u32) -> Result<Self, MailboxError> {
        if payload & CHANNEL_MASK != 0 {
            return Err(MailboxError::UnalignedPayload(payload));
        }
        Ok(Self { channel, payload })
    }

    /// Split a raw word into tag and payload
    pub const fn decode(word: u32) -> Self {
        Self {
            channel: Channel((word & CHANNEL_MASK) as u8),
            payload: word & !CHANNEL_MASK,
        }
    }

    pub const fn encode(self) -> u32 {
        self.payload | self.channel.0 as u32
    }
}

/// Mailbox driver
pub struct Mailbox<B: Mmio> {
    bus: B,
    base: usize,
    poll_limit: u32,
}

impl<B: Mmio> Mailbox<B> {
    /// Create a mailbox driver
    ///
    /// # Arguments
    /// * `bus` - Register access
    /// * `base` - Physical base of the mailbox block
    /// * `poll_limit` - Status polls allowed per send/receive
    pub const fn new(bus: B, base: usize, poll_limit: u32) -> Self {
        Self { bus, base, poll_limit }
    }

    fn status(&self) -> MailboxStatus {
        MailboxStatus::from_bits_retain(self.bus.read32(self.base + MAILBOX_STATUS))
    }

    /// Post `payload` on `channel`
    ///
    /// Returns as soon as the word is written.
    pub fn send(&self, channel: Channel, payload: u32) -> Result<(), MailboxError> {
        let message = MailboxMessage::new(channel, payload)?;

        let mut polls = 0;
        while self.status().contains(MailboxStatus::FULL) {
            if polls >= self.poll_limit {
                return Err(MailboxError::WriteTimeout);
            }
            polls += 1;
            core::hint::spin_loop();
        }

        // The payload points into memory the VideoCore is about to read
        self.bus.barrier();
        self.bus.write32(self.base + MAILBOX_WRITE, message.encode());
        log::trace!(target: "mailbox", "sent {:#010x}", message.encode());
        Ok(())
    }

    /// Wait for a word on `channel` and return its payload
    ///
    /// Words for other channels are consumed and dropped. The poll limit
    /// counts every loop iteration: each status read that found the FIFO
    /// empty and each word dropped for a mismatched channel.
    pub fn receive(&self, channel: Channel) -> Result<u32, MailboxError> {
        let mut polls = 0;
        loop {
            if self.status().contains(MailboxStatus::EMPTY) {
                if polls >= self.poll_limit {
                    return Err(MailboxError::Timeout);
                }
                polls += 1;
                core::hint::spin_loop();
                continue;
            }

            let word = self.bus.read32(self.base + MAILBOX_READ);
            self.bus.barrier();

            let message = MailboxMessage::decode(word);
            if message.channel == channel {
                return Ok(message.payload);
            }
            log::debug!(
                target: "mailbox",
                "dropped {:#010x} for channel {} while waiting on {}",
                word,
                message.channel.tag(),
                channel.tag()
            );

            if polls >= self.poll_limit {
                return Err(MailboxError::Timeout);
            }
            polls += 1;
        }
    }
}
