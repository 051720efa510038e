//! Pending-value to handler lookup
//!
//! The route table is built once at init. A pending value is matched
//! against each route's pattern exactly: two lines pending together do not
//! match a route for either one alone.

use super::controller::IrqLines;

/// Something that services an interrupt line
///
/// Called in IRQ context with interrupts masked; must not block.
pub trait IrqHandler: Sync {
    fn handle_irq(&self);
}

/// One entry of the route table
#[derive(Clone, Copy)]
pub struct IrqRoute<'a> {
    pub pattern: IrqLines,
    pub handler: &'a dyn IrqHandler,
}

impl<'a> IrqRoute<'a> {
    pub const fn new(pattern: IrqLines, handler: &'a dyn IrqHandler) -> Self {
        Self { pattern, handler }
    }
}

/// Result of routing one pending value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqOutcome {
    /// The route with this pattern ran
    Handled(IrqLines),
    /// No route matched this pending value
    Unrecognized(u32),
}

/// Fixed route table
pub struct IrqRouter<'a, const N: usize> {
    routes: [IrqRoute<'a>; N],
}

impl<'a, const N: usize> IrqRouter<'a, N> {
    pub const fn new(routes: [IrqRoute<'a>; N]) -> Self {
        Self { routes }
    }

    /// Union of every routed pattern, i.e. the lines worth enabling
    pub fn lines(&self) -> IrqLines {
        self.routes
            .iter()
            .fold(IrqLines::empty(), |lines, route| lines | route.pattern)
    }

    /// Run the handler whose pattern equals `pending`
    pub fn route(&self, pending: u32) -> IrqOutcome {
        match self.routes.iter().find(|route| route.pattern.bits() == pending) {
            Some(route) => {
                route.handler.handle_irq();
                IrqOutcome::Handled(route.pattern)
            }
            None => IrqOutcome::Unrecognized(pending),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    /// Handler that counts its invocations
    #[derive(Default)]
    pub(crate) struct CountingHandler(AtomicUsize);

    impl CountingHandler {
        pub fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl IrqHandler for CountingHandler {
        fn handle_irq(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_exact_match_runs_one_handler() {
        let timer = CountingHandler::default();
        let uart = CountingHandler::default();
        let router = IrqRouter::new([
            IrqRoute::new(IrqLines::SYSTEM_TIMER_MATCH_1, &timer),
            IrqRoute::new(IrqLines::AUX, &uart),
        ]);

        assert_eq!(router.route(1 << 1), IrqOutcome::Handled(IrqLines::SYSTEM_TIMER_MATCH_1));
        assert_eq!(timer.count(), 1);
        assert_eq!(uart.count(), 0);
    }

    #[test]
    fn test_combined_value_is_unrecognized() {
        let timer = CountingHandler::default();
        let uart = CountingHandler::default();
        let router = IrqRouter::new([
            IrqRoute::new(IrqLines::SYSTEM_TIMER_MATCH_1, &timer),
            IrqRoute::new(IrqLines::AUX, &uart),
        ]);

        let pending = (1 << 1) | (1 << 29);
        assert_eq!(router.route(pending), IrqOutcome::Unrecognized(pending));
        assert_eq!(router.route(0), IrqOutcome::Unrecognized(0));
        assert_eq!(timer.count() + uart.count(), 0);
    }

    #[test]
    fn test_lines_covers_all_routes() {
        let timer = CountingHandler::default();
        let uart = CountingHandler::default();
        let router = IrqRouter::new([
            IrqRoute::new(IrqLines::SYSTEM_TIMER_MATCH_1, &timer),
            IrqRoute::new(IrqLines::AUX, &uart),
        ]);

        assert_eq!(router.lines(), IrqLines::SYSTEM_TIMER_MATCH_1 | IrqLines::AUX);
        assert_eq!(IrqRouter::<0>::new([]).lines(), IrqLines::empty());
    }
}
