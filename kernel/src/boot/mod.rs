//! Boot sequence and early initialization
//!
//! `_start` (see `arch::aarch64::start`) hands core 0 to [`kernel_main`]
//! at EL1h with IRQs masked, a stack and a zeroed `.bss`. From there:
//!
//! 1. Console and logger
//! 2. Exception vectors, with the IRQ dispatcher published first
//! 3. System timer armed, its line enabled at the interrupt controller
//! 4. IRQs unmasked at the CPU
//! 5. Framebuffer negotiated with the VideoCore
//! 6. Echo console input forever
//!
//! A framebuffer failure is logged and boot carries on; a fatal trap halts.
//!
//! The kernel-wide singletons live here. The dispatcher is published
//! through [`spin::Once`] before vectors are installed, so the IRQ entry
//! never sees a half-built route table.

use spin::{Mutex, Once};

use crate::board;
use crate::components::console::Console;
use crate::config;
use crate::interrupts::{
    ExceptionDispatcher, ExceptionOutcome, ExceptionVector, InterruptController, IrqLines, IrqRoute,
    IrqRouter, Syndrome,
};
use crate::kprintln;
use crate::mailbox::{
    BusWindow, FramebufferFailure, FramebufferNegotiator, FramebufferRequest, IdentityMapped, Mailbox,
    PhysicalMemory,
};
use crate::mmio::{Mmio, PhysicalMmio};
use crate::timer::SystemTimer;

type Dispatcher = ExceptionDispatcher<'static, PhysicalMmio, 1>;

static MAILBOX: Mailbox<PhysicalMmio> =
    Mailbox::new(PhysicalMmio, board::MAILBOX_BASE, config::MAILBOX_POLL_LIMIT);

/// Request record shared with the VideoCore; 16-byte aligned by its type
static FRAMEBUFFER: Mutex<FramebufferRequest> = Mutex::new(FramebufferRequest::new(0, 0));

static TIMER: SystemTimer<PhysicalMmio> =
    SystemTimer::new(PhysicalMmio, board::SYSTEM_TIMER_BASE, config::TIMER_INTERVAL_TICKS);

static DISPATCHER: Once<Dispatcher> = Once::new();

/// Kernel entry point (called from `_start`)
#[no_mangle]
pub extern "C" fn kernel_main() -> ! {
    config::init_console();
    crate::debug::init_logger();

    kprintln!();
    kprintln!("{} {} on {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), board::BOARD_NAME);
    kprintln!("  Exception level: EL{}", exception_level());
    kprintln!("  Console: {}", config::CONSOLE_NAME);
    kprintln!();

    init_exception_vectors();
    init_timer();
    enable_interrupt_controller();
    enable_interrupts_globally();

    match acquire_framebuffer(config::FRAMEBUFFER_WIDTH, config::FRAMEBUFFER_HEIGHT) {
        Ok(framebuffer) => kprintln!(
            "Framebuffer: {}x{} at {:#x}",
            framebuffer.screen_width,
            framebuffer.screen_height,
            framebuffer.frame_ptr
        ),
        Err(failure) => kprintln!(
            "Framebuffer unavailable ({}): pitch {}, frame_ptr {:#x}",
            failure.error,
            failure.request.pitch,
            failure.request.frame_ptr
        ),
    }

    kprintln!("Boot complete, echoing console input");
    let console = config::console();
    loop {
        let c = console.getc();
        console.putc(c);
    }
}

/// Negotiate a `width` x `height` framebuffer with the VideoCore
///
/// Uses the kernel's single request slot and returns a copy of it either
/// way: validated on success (`frame_ptr` in ARM physical space), as the
/// VideoCore left it on failure.
pub fn acquire_framebuffer(width: u32, height: u32) -> Result<FramebufferRequest, FramebufferFailure> {
    let negotiator = FramebufferNegotiator::new(
        &MAILBOX,
        BusWindow::new(config::BUS_ADDRESS_OFFSET),
        IdentityMapped,
        config::FRAMEBUFFER_RETRY_LIMIT,
    );
    acquire_into(&negotiator, &FRAMEBUFFER, width, height)
}

fn acquire_into<B: Mmio, P: PhysicalMemory>(
    negotiator: &FramebufferNegotiator<'_, B, P>,
    slot: &Mutex<FramebufferRequest>,
    width: u32,
    height: u32,
) -> Result<FramebufferRequest, FramebufferFailure> {
    let mut request = slot.lock();
    match negotiator.acquire(&mut request, width, height) {
        Ok(()) => Ok(*request),
        Err(error) => Err(FramebufferFailure {
            error,
            request: *request,
        }),
    }
}

/// Publish the IRQ dispatcher and install the vector table
pub fn init_exception_vectors() {
    dispatcher();

    #[cfg(all(target_arch = "aarch64", target_os = "none"))]
    crate::arch::aarch64::exception::init();
}

/// Arm the periodic system timer
pub fn init_timer() {
    TIMER.init();
}

/// Enable every routed line at the interrupt controller
pub fn enable_interrupt_controller() {
    let dispatcher = dispatcher();
    dispatcher.controller().enable(dispatcher.router().lines());
}

/// Unmask IRQs at the CPU
pub fn enable_interrupts_globally() {
    // SAFETY: `kernel_main` only gets here after `init_exception_vectors`
    unsafe { crate::arch::aarch64::enable_irq() };
    log::info!(target: "boot", "interrupts enabled");
}

/// Called by the vector table for every exception taken
pub fn dispatch_exception(vector: ExceptionVector, syndrome: Syndrome) -> ExceptionOutcome {
    match DISPATCHER.get() {
        Some(dispatcher) => dispatcher.dispatch(vector, syndrome),
        None => ExceptionOutcome::unhandled(vector, syndrome),
    }
}

fn dispatcher() -> &'static Dispatcher {
    DISPATCHER.call_once(|| {
        ExceptionDispatcher::new(
            InterruptController::new(PhysicalMmio, board::INTERRUPT_CONTROLLER_BASE),
            IrqRouter::new([IrqRoute::new(IrqLines::SYSTEM_TIMER_MATCH_1, &TIMER)]),
        )
    })
}

fn exception_level() -> u8 {
    #[cfg(all(target_arch = "aarch64", target_os = "none"))]
    return crate::arch::aarch64::registers::current_el();

    #[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
    return 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::MAILBOX_BASE;
    use crate::mailbox::FramebufferError;
    use crate::sim::{Coprocessor, FramebufferReply, SimBoard};

    fn acquire(board: &SimBoard, slot: &Mutex<FramebufferRequest>) -> Result<FramebufferRequest, FramebufferFailure> {
        let mailbox = Mailbox::new(board, MAILBOX_BASE, 32);
        let negotiator =
            FramebufferNegotiator::new(&mailbox, BusWindow::new(config::BUS_ADDRESS_OFFSET), board, 8);
        acquire_into(&negotiator, slot, 800, 480)
    }

    fn reply(frame_ptr: u32, pitch: u32) -> Coprocessor {
        Coprocessor::Reply(FramebufferReply {
            frame_ptr,
            pitch,
            buffer_size: pitch * 480,
            status: 0,
            noise: vec![],
        })
    }

    #[test]
    fn test_success_returns_validated_copy() {
        let board = SimBoard::new();
        board.set_coprocessor(reply(0x7E10_0000, 3200));
        let slot = Mutex::new(FramebufferRequest::new(0, 0));

        let framebuffer = acquire(&board, &slot).unwrap();

        assert!(framebuffer.valid);
        assert_eq!(framebuffer.frame_ptr, 0x3E10_0000);
        assert_eq!(*slot.lock(), framebuffer);
    }

    #[test]
    fn test_failure_hands_back_the_record() {
        let board = SimBoard::new();
        board.set_coprocessor(reply(0, 3200));
        let slot = Mutex::new(FramebufferRequest::new(0, 0));

        let failure = acquire(&board, &slot).unwrap_err();

        assert_eq!(failure.error, FramebufferError::InvalidFramePointer);
        assert!(!failure.request.valid);
        assert_eq!(failure.request.pitch, 3200);
        assert_eq!(failure.request.screen_width, 800);
        assert_eq!(*slot.lock(), failure.request);
    }

    #[test]
    fn test_dispatch_without_dispatcher_is_fatal() {
        // The boot dispatcher is never published in host tests
        assert!(matches!(
            dispatch_exception(ExceptionVector::IrqEl1h, Syndrome::default()),
            ExceptionOutcome::Fatal(_)
        ));
    }
}
