// Execution primitives shared by the task states
//
// Retry bookkeeping, tick sources, cooperative preemption, the poll loop and the
// action invoker. None of these know about specific robot behaviours.

pub mod invoker;
pub mod poll;
pub mod preempt;
pub mod retry;
pub mod ticker;

pub use invoker::{ActionInvoker, Invocation};
pub use poll::{PollBudget, PollLoop, PollOutcome, PollSignal, PollTarget};
pub use preempt::PreemptSignal;
pub use retry::RetryPolicy;
pub use ticker::{Ticker, TokioTicker, VirtualTicker};
