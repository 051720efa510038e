//! BCM283x ARM-side interrupt controller
//!
//! Only the first bank of GPU interrupt lines is used. Enabling is a
//! read-modify-write of ENABLE_IRQS_1 so lines enabled earlier stay on;
//! disabling goes through the separate write-1-to-clear register.

use bitflags::bitflags;

use crate::board;
use crate::mmio::Mmio;

/// Offsets from the interrupt controller base
const IRQ_PENDING_1: usize = board::IRQ_PENDING_1 - board::INTERRUPT_CONTROLLER_BASE;
const ENABLE_IRQS_1: usize = board::ENABLE_IRQS_1 - board::INTERRUPT_CONTROLLER_BASE;
const DISABLE_IRQS_1: usize = board::DISABLE_IRQS_1 - board::INTERRUPT_CONTROLLER_BASE;

bitflags! {
    /// Lines of the first GPU interrupt bank (IRQ_PENDING_1 layout)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqLines: u32 {
        /// System timer compare channel 1
        const SYSTEM_TIMER_MATCH_1 = 1 << 1;
        /// System timer compare channel 3
        const SYSTEM_TIMER_MATCH_3 = 1 << 3;
        /// AUX block (mini UART, SPI1/2)
        const AUX = 1 << 29;
    }
}

/// Interrupt controller gate
pub struct InterruptController<B: Mmio> {
    bus: B,
    base: usize,
}

impl<B: Mmio> InterruptController<B> {
    pub const fn new(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    /// Unmask `lines`, keeping every line that is already enabled
    pub fn enable(&self, lines: IrqLines) {
        let enabled = self.bus.read32(self.base + ENABLE_IRQS_1);
        self.bus.write32(self.base + ENABLE_IRQS_1, enabled | lines.bits());
        log::debug!(target: "irq", "enabled {:?}", lines);
    }

    /// Mask `lines`
    pub fn disable(&self, lines: IrqLines) {
        self.bus.write32(self.base + DISABLE_IRQS_1, lines.bits());
    }

    /// Raw IRQ_PENDING_1 value
    ///
    /// Returned as read so bits outside [`IrqLines`] are not lost.
    pub fn pending(&self) -> u32 {
        self.bus.read32(self.base + IRQ_PENDING_1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{DISABLE_IRQS_1 as DISABLE, ENABLE_IRQS_1 as ENABLE, INTERRUPT_CONTROLLER_BASE};
    use crate::sim::SimBoard;

    #[test]
    fn test_enable_preserves_earlier_lines() {
        let board = SimBoard::new();
        let controller = InterruptController::new(&board, INTERRUPT_CONTROLLER_BASE);

        controller.enable(IrqLines::AUX);
        controller.enable(IrqLines::SYSTEM_TIMER_MATCH_1);

        assert_eq!(board.register(ENABLE), (IrqLines::AUX | IrqLines::SYSTEM_TIMER_MATCH_1).bits());
        assert_eq!(
            board.writes(),
            [(ENABLE, 1 << 29), (ENABLE, (1 << 29) | (1 << 1))]
        );
    }

    #[test]
    fn test_enable_keeps_lines_set_by_firmware() {
        let board = SimBoard::new();
        board.set_register(ENABLE, 1 << 9);
        let controller = InterruptController::new(&board, INTERRUPT_CONTROLLER_BASE);

        controller.enable(IrqLines::SYSTEM_TIMER_MATCH_1);

        assert_eq!(board.register(ENABLE), (1 << 9) | (1 << 1));
    }

    #[test]
    fn test_disable_writes_clear_register() {
        let board = SimBoard::new();
        let controller = InterruptController::new(&board, INTERRUPT_CONTROLLER_BASE);
        controller.enable(IrqLines::all());

        controller.disable(IrqLines::SYSTEM_TIMER_MATCH_3);

        assert_eq!(board.writes().last(), Some(&(DISABLE, 1 << 3)));
        assert_eq!(board.register(ENABLE), (IrqLines::AUX | IrqLines::SYSTEM_TIMER_MATCH_1).bits());
    }

    #[test]
    fn test_pending_is_raw() {
        let board = SimBoard::new();
        board.set_register(crate::board::IRQ_PENDING_1, (1 << 1) | (1 << 7));
        let controller = InterruptController::new(&board, INTERRUPT_CONTROLLER_BASE);

        assert_eq!(controller.pending(), (1 << 1) | (1 << 7));
    }
}
