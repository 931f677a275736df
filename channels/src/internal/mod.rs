pub(crate) mod blocked_deque;
pub(crate) mod waiter;
