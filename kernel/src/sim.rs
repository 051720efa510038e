//! Simulated BCM283x board for unit tests
//!
//! Implements [`Mmio`] over a register map and models the pieces of
//! hardware the bring-up path talks to:
//!
//! - mailbox status/read/write, with a scripted VideoCore that writes its
//!   answer into the request record and posts replies (optionally preceded
//!   by words for other channels)
//! - the system timer counter and its write-1-to-clear status register
//! - the interrupt controller's enable/disable pair
//!
//! Every register write is recorded in order. The board is also a
//! [`PhysicalMemory`]: it hands out fake 32-bit physical addresses for
//! host pointers and remembers the mapping so the VideoCore can find the
//! request again.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::board;
use crate::config::BUS_ADDRESS_OFFSET;
use crate::mailbox::{BusWindow, MailboxStatus, PhysicalMemory};
use crate::mmio::Mmio;

/// Words of the request record the VideoCore reads
const REQUEST_WORDS: usize = 10;
const PITCH_WORD: usize = 4;
const FRAME_PTR_WORD: usize = 8;
const BUFFER_SIZE_WORD: usize = 9;

/// First fake physical address handed out
const FIRST_PHYSICAL: u32 = 0x0000_2000;

/// What the VideoCore writes back for a channel 1 request
#[derive(Debug, Clone)]
pub(crate) struct FramebufferReply {
    pub frame_ptr: u32,
    pub pitch: u32,
    pub buffer_size: u32,
    /// Reply payload (0 = success on the real firmware)
    pub status: u32,
    /// Raw words posted before the reply
    pub noise: Vec<u32>,
}

/// Scripted VideoCore behaviour
#[derive(Debug, Clone)]
pub(crate) enum Coprocessor {
    /// Never touches the request, never replies
    Silent,
    /// Fills in the request, then replies on channel 1
    Reply(FramebufferReply),
    /// Fills in the request but never replies
    WriteWithoutReply(FramebufferReply),
}

struct State {
    registers: HashMap<usize, u32>,
    writes: Vec<(usize, u32)>,
    counter: u64,
    inbox: VecDeque<u32>,
    full_polls: u32,
    status_reads: usize,
    mailbox_writes: Vec<u32>,
    coprocessor: Coprocessor,
    regions: Vec<(u32, usize)>,
    next_physical: u32,
    last_request: Option<[u32; REQUEST_WORDS]>,
}

pub(crate) struct SimBoard {
    state: Mutex<State>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                registers: HashMap::new(),
                writes: Vec::new(),
                counter: 0,
                inbox: VecDeque::new(),
                full_polls: 0,
                status_reads: 0,
                mailbox_writes: Vec::new(),
                coprocessor: Coprocessor::Silent,
                regions: Vec::new(),
                next_physical: FIRST_PHYSICAL,
                last_request: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Preset a register without recording a write
    pub fn set_register(&self, addr: usize, value: u32) {
        self.state().registers.insert(addr, value);
    }

    pub fn register(&self, addr: usize) -> u32 {
        self.state().registers.get(&addr).copied().unwrap_or(0)
    }

    /// All register writes so far, in order
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.state().writes.clone()
    }

    pub fn set_counter(&self, ticks: u64) {
        self.state().counter = ticks;
    }

    /// Report FULL for the next `polls` status reads
    pub fn hold_mailbox_full(&self, polls: u32) {
        self.state().full_polls = polls;
    }

    /// Queue a raw word in the VideoCore -> ARM FIFO
    pub fn push_mailbox_word(&self, word: u32) {
        self.state().inbox.push_back(word);
    }

    pub fn pending_mailbox_words(&self) -> usize {
        self.state().inbox.len()
    }

    pub fn mailbox_status_reads(&self) -> usize {
        self.state().status_reads
    }

    /// Words written to the ARM -> VideoCore register
    pub fn mailbox_writes(&self) -> Vec<u32> {
        self.state().mailbox_writes.clone()
    }

    pub fn set_coprocessor(&self, coprocessor: Coprocessor) {
        self.state().coprocessor = coprocessor;
    }

    /// Fake physical address previously handed out for `ptr`
    pub fn physical_of(&self, ptr: *const u8) -> Option<u32> {
        let host = ptr as usize;
        self.state()
            .regions
            .iter()
            .find(|(_, h)| *h == host)
            .map(|(p, _)| *p)
    }

    /// Request words as the VideoCore saw them on the last channel 1 write
    pub fn last_request(&self) -> Option<[u32; REQUEST_WORDS]> {
        self.state().last_request
    }
}

impl State {
    fn status(&mut self) -> u32 {
        self.status_reads += 1;
        let mut status = MailboxStatus::empty();
        if self.full_polls > 0 {
            self.full_polls -= 1;
            status |= MailboxStatus::FULL;
        }
        if self.inbox.is_empty() {
            status |= MailboxStatus::EMPTY;
        }
        status.bits()
    }

    fn videocore_receive(&mut self, word: u32) {
        self.mailbox_writes.push(word);
        if word & 0xF != 1 {
            return;
        }

        let physical = BusWindow::new(BUS_ADDRESS_OFFSET).to_physical(word & !0xF);
        let Some(&(_, host)) = self.regions.iter().find(|(p, _)| *p == physical) else {
            return;
        };
        let words = host as *mut u32;

        // SAFETY: `host` was registered through `physical_address` by a
        // negotiation that is still running and keeps the record alive;
        // the record is 16-byte aligned and at least REQUEST_WORDS long.
        let mut seen = [0u32; REQUEST_WORDS];
        for (i, slot) in seen.iter_mut().enumerate() {
            *slot = unsafe { words.add(i).read_volatile() };
        }
        self.last_request = Some(seen);

        let (reply, post) = match &self.coprocessor {
            Coprocessor::Silent => return,
            Coprocessor::Reply(reply) => (reply.clone(), true),
            Coprocessor::WriteWithoutReply(reply) => (reply.clone(), false),
        };

        // SAFETY: as above
        unsafe {
            words.add(PITCH_WORD).write_volatile(reply.pitch);
            words.add(FRAME_PTR_WORD).write_volatile(reply.frame_ptr);
            words.add(BUFFER_SIZE_WORD).write_volatile(reply.buffer_size);
        }

        if post {
            self.inbox.extend(reply.noise.iter().copied());
            self.inbox.push_back((reply.status & !0xF) | 1);
        }
    }
}

impl Mmio for SimBoard {
    fn read32(&self, addr: usize) -> u32 {
        let mut state = self.state();
        match addr {
            board::MAILBOX_STATUS => state.status(),
            board::MAILBOX_READ => state.inbox.pop_front().unwrap_or(0),
            board::TIMER_CLO => state.counter as u32,
            board::TIMER_CHI => (state.counter >> 32) as u32,
            _ => state.registers.get(&addr).copied().unwrap_or(0),
        }
    }

    fn write32(&self, addr: usize, value: u32) {
        let mut state = self.state();
        state.writes.push((addr, value));
        match addr {
            board::MAILBOX_WRITE => state.videocore_receive(value),
            board::TIMER_CS => {
                // Write 1 to clear; the matching IRQ pending bits follow
                let cs = state.registers.entry(addr).or_insert(0);
                *cs &= !value;
                let pending = state.registers.entry(board::IRQ_PENDING_1).or_insert(0);
                *pending &= !(value & 0xF);
            }
            board::DISABLE_IRQS_1 => {
                let enabled = state.registers.entry(board::ENABLE_IRQS_1).or_insert(0);
                *enabled &= !value;
            }
            _ => {
                state.registers.insert(addr, value);
            }
        }
    }

    fn read8(&self, addr: usize) -> u8 {
        self.read32(addr) as u8
    }

    fn write8(&self, addr: usize, value: u8) {
        self.write32(addr, value as u32)
    }
}

impl PhysicalMemory for SimBoard {
    fn physical_address(&self, ptr: *const u8) -> Option<u32> {
        let host = ptr as usize;
        let mut state = self.state();
        if let Some(&(physical, _)) = state.regions.iter().find(|(_, h)| *h == host) {
            return Some(physical);
        }

        // Keep the host pointer's misalignment visible
        let physical = state.next_physical | (host & 0xF) as u32;
        state.next_physical += 0x1000;
        state.regions.push((physical, host));
        Some(physical)
    }
}
