//! The page's only piece of state.

/// Click counter owned by the page view.
///
/// Starts at zero and only ever moves up by one per [`increment`](Counter::increment).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    value: u32,
}

impl Counter {
    pub const fn new() -> Self {
        Counter { value: 0 }
    }

    /// Saturates at `u32::MAX`.
    pub fn increment(&mut self) {
        self.value = self.value.saturating_add(1);
    }

    pub const fn value(&self) -> u32 {
        self.value
    }
}
