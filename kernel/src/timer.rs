//! Periodic system timer interrupt
//!
//! Uses compare channel 1 of the BCM283x system timer, a free-running
//! 1 MHz counter. Channels 0 and 2 belong to the VideoCore.
//!
//! ## Programming
//!
//! 1. `init`: deadline = counter + interval, program C1
//! 2. On each match: deadline += interval, program C1, then clear M1 in CS
//!
//! The deadline advances by exactly one interval per fire, measured from
//! the previous deadline and not from when the handler ran, so handler
//! latency does not accumulate. A handler that runs later than a whole
//! interval leaves a deadline in the past; the counter then has to wrap
//! before the next match. There is no catch-up.
//!
//! The match flag is cleared after C1 is reprogrammed: clearing first
//! would let the still-equal compare raise the line again.

use spin::Mutex;

use crate::board::{self, TIMER_CS_M1};
use crate::interrupts::IrqHandler;
use crate::mmio::Mmio;

/// Offsets from the system timer base
const TIMER_CS: usize = board::TIMER_CS - board::SYSTEM_TIMER_BASE;
const TIMER_CLO: usize = board::TIMER_CLO - board::SYSTEM_TIMER_BASE;
const TIMER_CHI: usize = board::TIMER_CHI - board::SYSTEM_TIMER_BASE;
const TIMER_C1: usize = board::TIMER_C1 - board::SYSTEM_TIMER_BASE;

struct TimerState {
    next_deadline: u64,
    fired: u64,
}

/// Compare channel 1 driver
///
/// `on_fire` runs in IRQ context and takes the state lock. Foreground code
/// calling the accessors once the line is enabled must do so with IRQs
/// masked.
pub struct SystemTimer<B: Mmio> {
    bus: B,
    base: usize,
    interval_ticks: u32,
    state: Mutex<TimerState>,
}

impl<B: Mmio> SystemTimer<B> {
    /// # Arguments
    /// * `bus` - Register access
    /// * `base` - Physical base of the system timer block
    /// * `interval_ticks` - Period in counter ticks
    pub const fn new(bus: B, base: usize, interval_ticks: u32) -> Self {
        Self {
            bus,
            base,
            interval_ticks,
            state: Mutex::new(TimerState {
                next_deadline: 0,
                fired: 0,
            }),
        }
    }

    /// Current 64-bit counter value
    ///
    /// CHI is read on both sides of CLO; if it moved, CLO wrapped in between
    /// and the pair is read again.
    pub fn read_counter(&self) -> u64 {
        loop {
            let hi = self.bus.read32(self.base + TIMER_CHI);
            let lo = self.bus.read32(self.base + TIMER_CLO);
            if self.bus.read32(self.base + TIMER_CHI) == hi {
                return ((hi as u64) << 32) | lo as u64;
            }
        }
    }

    /// Arm the first match one interval from now
    pub fn init(&self) {
        let now = self.read_counter();
        let mut state = self.state.lock();
        state.next_deadline = now + self.interval_ticks as u64;
        state.fired = 0;
        self.program(state.next_deadline);

        log::info!(
            target: "timer",
            "armed: interval {} ticks, first deadline {:#x}",
            self.interval_ticks,
            state.next_deadline
        );
    }

    /// Match handler: re-arm one interval after the previous deadline and
    /// acknowledge
    pub fn on_fire(&self) {
        let mut state = self.state.lock();
        state.next_deadline += self.interval_ticks as u64;
        state.fired += 1;
        self.program(state.next_deadline);
        self.bus.write32(self.base + TIMER_CS, TIMER_CS_M1);

        log::trace!(target: "timer", "fire {} next {:#x}", state.fired, state.next_deadline);
    }

    /// Absolute counter value of the next match
    pub fn next_deadline(&self) -> u64 {
        self.state.lock().next_deadline
    }

    /// Matches handled since `init`
    pub fn fire_count(&self) -> u64 {
        self.state.lock().fired
    }

    pub fn interval_ticks(&self) -> u32 {
        self.interval_ticks
    }

    fn program(&self, deadline: u64) {
        // The compare register matches the low 32 bits of the counter
        self.bus.write32(self.base + TIMER_C1, deadline as u32);
    }
}

impl<B: Mmio + Sync> IrqHandler for SystemTimer<B> {
    fn handle_irq(&self) {
        self.on_fire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{
        INTERRUPT_CONTROLLER_BASE, IRQ_PENDING_1, SYSTEM_TIMER_BASE, TIMER_C1 as C1, TIMER_CS as CS,
    };
    use crate::interrupts::{
        ExceptionDispatcher, ExceptionOutcome, ExceptionVector, InterruptController, IrqLines,
        IrqOutcome, IrqRoute, IrqRouter, Syndrome,
    };
    use crate::sim::SimBoard;

    const INTERVAL: u32 = 200_000;

    fn timer(board: &SimBoard) -> SystemTimer<&SimBoard> {
        SystemTimer::new(board, SYSTEM_TIMER_BASE, INTERVAL)
    }

    #[test]
    fn test_init_arms_one_interval_ahead() {
        let board = SimBoard::new();
        board.set_counter(1_000);
        let timer = timer(&board);

        timer.init();

        assert_eq!(timer.next_deadline(), 201_000);
        assert_eq!(board.writes(), [(C1, 201_000)]);
        assert_eq!(timer.fire_count(), 0);
    }

    #[test]
    fn test_deadline_does_not_drift() {
        let board = SimBoard::new();
        board.set_counter(12_345);
        let timer = timer(&board);
        timer.init();
        let initial = timer.next_deadline();

        for n in 1..=50u64 {
            // Handler latency varies; the deadline must not follow it
            board.set_counter(initial + n * 7_919);
            timer.on_fire();
            assert_eq!(timer.next_deadline(), initial + n * INTERVAL as u64);
        }
        assert_eq!(timer.fire_count(), 50);
    }

    #[test]
    fn test_acknowledge_after_reprogramming() {
        let board = SimBoard::new();
        let timer = timer(&board);
        timer.init();

        timer.on_fire();

        let writes = board.writes();
        assert_eq!(
            &writes[1..],
            [(C1, 2 * INTERVAL), (CS, TIMER_CS_M1)]
        );
    }

    #[test]
    fn test_compare_takes_low_word() {
        let board = SimBoard::new();
        board.set_counter(0x0000_0001_FFFF_0000);
        let timer = timer(&board);

        timer.init();

        assert_eq!(timer.next_deadline(), 0x0000_0001_FFFF_0000 + INTERVAL as u64);
        assert_eq!(board.writes(), [(C1, (0xFFFF_0000u64 + INTERVAL as u64) as u32)]);
    }

    #[test]
    fn test_read_counter_combines_halves() {
        let board = SimBoard::new();
        board.set_counter(0x0000_0002_8000_0001);

        assert_eq!(timer(&board).read_counter(), 0x0000_0002_8000_0001);
    }

    #[test]
    fn test_irq_path_rearms_and_clears_pending() {
        let board = SimBoard::new();
        let timer = timer(&board);
        timer.init();
        let dispatcher = ExceptionDispatcher::new(
            InterruptController::new(&board, INTERRUPT_CONTROLLER_BASE),
            IrqRouter::new([IrqRoute::new(IrqLines::SYSTEM_TIMER_MATCH_1, &timer)]),
        );

        board.set_register(IRQ_PENDING_1, 1 << 1);
        let outcome = dispatcher.dispatch(ExceptionVector::IrqEl1h, Syndrome::default());

        assert_eq!(
            outcome,
            ExceptionOutcome::Resumed(IrqOutcome::Handled(IrqLines::SYSTEM_TIMER_MATCH_1))
        );
        assert_eq!(timer.fire_count(), 1);
        assert_eq!(timer.next_deadline(), 2 * INTERVAL as u64);
        assert_eq!(board.register(IRQ_PENDING_1), 0);
    }
}
