use std::collections::VecDeque;

use crate::memory::Cell;

/// The values a running program exchanges with its caller: a queue of
/// pending input consumed front-to-back by `Input` instructions, and the
/// ordered log of everything `Output` instructions produced.
///
/// A channel belongs to exactly one program run; independent runs never
/// share one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    input: VecDeque<Cell>,
    output: Vec<Cell>,
}

impl Channel {
    /// Queues `value` behind any input already pending.
    pub fn push_input(&mut self, value: Cell) {
        self.input.push_back(value);
    }

    /// Takes the oldest pending input value, if any.
    pub fn pop_input(&mut self) -> Option<Cell> {
        self.input.pop_front()
    }

    pub fn has_input(&self) -> bool {
        !self.input.is_empty()
    }

    /// Appends `value` to the output log.
    pub fn push_output(&mut self, value: Cell) {
        self.output.push(value);
    }

    /// Everything output so far, oldest first.
    pub fn output(&self) -> &[Cell] {
        &self.output
    }

    /// Drains the output log.
    pub fn take_output(&mut self) -> Vec<Cell> {
        std::mem::take(&mut self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_is_consumed_in_order() {
        let mut channel = Channel::default();
        channel.push_input(1);
        channel.push_input(2);

        assert_eq!(channel.pop_input(), Some(1));
        assert_eq!(channel.pop_input(), Some(2));
        assert_eq!(channel.pop_input(), None);
        assert!(!channel.has_input());
    }

    #[test]
    fn test_take_output_drains() {
        let mut channel = Channel::default();
        channel.push_output(7);
        channel.push_output(8);

        assert_eq!(channel.output(), &[7, 8]);
        assert_eq!(channel.take_output(), vec![7, 8]);
        assert!(channel.output().is_empty());
    }
}
