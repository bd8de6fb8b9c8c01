pub mod lifecycle;
pub mod policy;
pub mod propagation;

pub use lifecycle::{RequestTracer, SpanHandle, SpanStart, StartedRequest};
pub use policy::{ConfigPolicy, TracePolicy};
pub use propagation::{HeaderNames, TraceContext};
