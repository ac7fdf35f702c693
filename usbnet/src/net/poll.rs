/// Retry budget for the cooperative waits (transmit capacity, interface up).
///
/// A bounded budget counts retries up to its limit. An unbounded one never
/// runs out and keeps no count, so it can spin for as long as it takes.
#[derive(Debug, Clone, Copy)]
pub struct PollBudget {
    limit: Option<u32>,
    spent: u32,
}

impl PollBudget {
    pub const fn new(limit: Option<u32>) -> Self {
        Self { limit, spent: 0 }
    }

    /// Take one retry. Returns false once the limit is used up.
    pub fn spend(&mut self) -> bool {
        match self.limit {
            None => true,
            Some(limit) if self.spent >= limit => false,
            Some(_) => {
                // spent < limit <= u32::MAX
                self.spent += 1;
                true
            }
        }
    }

    /// Retries taken so far. Always 0 for an unbounded budget.
    pub fn spent(&self) -> u32 {
        self.spent
    }
}
