pub(crate) mod backoff;
pub(crate) mod waiter;
