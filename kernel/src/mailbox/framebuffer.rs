//! Framebuffer negotiation over the legacy mailbox channel 1
//!
//! The request is a caller-owned, 16-byte aligned record whose first ten
//! words follow the VideoCore's framebuffer layout. Its bus address goes
//! out over the mailbox; the VideoCore fills in `pitch`, `frame_ptr` and
//! `buffer_size` in place and then posts a reply on the same channel.
//!
//! ## Negotiation
//!
//! 1. Reset the request: physical and virtual size = requested, depth 24,
//!    everything else zero, not valid
//! 2. Send the request's bus address on channel 1
//! 3. Wait for a channel 1 reply, up to a retry budget of bounded receives
//! 4. Validate, in order: a reply arrived, `frame_ptr != 0`, `pitch != 0`
//! 5. Translate `frame_ptr` back to physical space and mark the request valid
//!
//! The reply fields are written by another bus master, so they are read
//! with volatile loads and only after the reply has been seen.

use core::mem::{align_of, offset_of};
use core::ptr::{self, addr_of, addr_of_mut};

use static_assertions::const_assert_eq;
use thiserror::Error;

use super::address::{BusWindow, PhysicalMemory};
use super::{Channel, Mailbox, MailboxError};
use crate::mmio::Mmio;

/// Colour depth requested from the VideoCore
pub const FRAMEBUFFER_DEPTH: u32 = 24;

/// Framebuffer negotiation errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferError {
    #[error("the VideoCore did not answer the framebuffer request")]
    MailboxTimeout,

    #[error("the VideoCore returned a null frame buffer pointer")]
    InvalidFramePointer,

    #[error("the VideoCore returned a zero pitch")]
    InvalidPitch,

    #[error("request at {0:#x} cannot be handed to the VideoCore")]
    Unaddressable(usize),
}

/// A failed negotiation, with the record as the VideoCore left it
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{error}")]
pub struct FramebufferFailure {
    pub error: FramebufferError,
    /// `valid` is false; reply fields kept for diagnosis
    pub request: FramebufferRequest,
}

/// Framebuffer request/response record shared with the VideoCore
///
/// Words 0-9 are read and written by the VideoCore. `valid` is kernel-side
/// only and is set once the response has been validated.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FramebufferRequest {
    pub screen_width: u32,
    pub screen_height: u32,
    pub virtual_width: u32,
    pub virtual_height: u32,
    pub pitch: u32,
    pub depth: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub frame_ptr: u32,
    pub buffer_size: u32,
    pub valid: bool,
}

const_assert_eq!(align_of::<FramebufferRequest>(), 16);
const_assert_eq!(offset_of!(FramebufferRequest, pitch), 16);
const_assert_eq!(offset_of!(FramebufferRequest, frame_ptr), 32);
const_assert_eq!(offset_of!(FramebufferRequest, buffer_size), 36);

impl FramebufferRequest {
    /// Fresh request for a `width` x `height` display
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            screen_width: width,
            screen_height: height,
            virtual_width: width,
            virtual_height: height,
            pitch: 0,
            depth: FRAMEBUFFER_DEPTH,
            x_offset: 0,
            y_offset: 0,
            frame_ptr: 0,
            buffer_size: 0,
            valid: false,
        }
    }
}

/// Drives one framebuffer exchange
pub struct FramebufferNegotiator<'a, B: Mmio, P: PhysicalMemory> {
    mailbox: &'a Mailbox<B>,
    window: BusWindow,
    memory: P,
    retry_limit: u32,
}

impl<'a, B: Mmio, P: PhysicalMemory> FramebufferNegotiator<'a, B, P> {
    /// # Arguments
    /// * `mailbox` - Mailbox driver to exchange over
    /// * `window` - Physical/bus translation
    /// * `memory` - Resolves the request's address
    /// * `retry_limit` - Bounded receives to attempt before timing out
    pub const fn new(mailbox: &'a Mailbox<B>, window: BusWindow, memory: P, retry_limit: u32) -> Self {
        Self {
            mailbox,
            window,
            memory,
            retry_limit,
        }
    }

    /// Negotiate a `width` x `height` framebuffer into `request`
    ///
    /// On error `request.valid` stays false and the record holds whatever
    /// the VideoCore left in it, for diagnosis. Every error is also logged.
    pub fn acquire(
        &self,
        request: &mut FramebufferRequest,
        width: u32,
        height: u32,
    ) -> Result<(), FramebufferError> {
        *request = FramebufferRequest::new(width, height);

        let result = self.negotiate(request);
        match result {
            Ok(()) => log::info!(
                target: "framebuffer",
                "acquired {}x{}x{} at {:#x}, pitch {}, {} bytes",
                request.screen_width,
                request.screen_height,
                request.depth,
                request.frame_ptr,
                request.pitch,
                request.buffer_size
            ),
            Err(err) => log::error!(target: "framebuffer", "{}", err),
        }
        result
    }

    fn negotiate(&self, request: &mut FramebufferRequest) -> Result<(), FramebufferError> {
        // From here on the record is shared with the VideoCore; every
        // access goes through `slot`.
        let slot: *mut FramebufferRequest = request;

        let physical = self
            .memory
            .physical_address(slot as *const u8)
            .ok_or(FramebufferError::Unaddressable(slot as usize))?;
        let bus = self.window.to_bus(physical);

        self.mailbox
            .send(Channel::FRAMEBUFFER, bus)
            .map_err(|err| match err {
                MailboxError::UnalignedPayload(_) => FramebufferError::Unaddressable(slot as usize),
                MailboxError::Timeout | MailboxError::WriteTimeout => FramebufferError::MailboxTimeout,
            })?;

        let reply = (0..self.retry_limit)
            .find_map(|_| self.mailbox.receive(Channel::FRAMEBUFFER).ok())
            .ok_or(FramebufferError::MailboxTimeout)?;
        if reply != 0 {
            log::warn!(target: "framebuffer", "VideoCore reply status {:#x}", reply);
        }

        // SAFETY: `slot` comes from `request`, which is borrowed for the
        // whole call; the VideoCore has finished writing once it replied.
        let (frame_ptr, pitch) = unsafe {
            (
                ptr::read_volatile(addr_of!((*slot).frame_ptr)),
                ptr::read_volatile(addr_of!((*slot).pitch)),
            )
        };

        if frame_ptr == 0 {
            return Err(FramebufferError::InvalidFramePointer);
        }
        if pitch == 0 {
            return Err(FramebufferError::InvalidPitch);
        }

        // SAFETY: as above
        unsafe {
            ptr::write_volatile(addr_of_mut!((*slot).frame_ptr), self.window.to_physical(frame_ptr));
            ptr::write_volatile(addr_of_mut!((*slot).valid), true);
        }
        Ok(())
    }
}
