//! Logical operation ordering.
//!
//! Every DataFrame method is tagged with the clause it writes. A SELECT can
//! absorb clauses only in their logical evaluation order; an operation that
//! ranks below the last one applied (or a second projection on top of a
//! projection) forces the current plan into a CTE first.

use serde::{Deserialize, Serialize};

/// The clause an operation writes, in logical evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Freshly created plan; the first operation always materializes it
    Init,
    /// Does not advance the plan; inherits the previous operation
    NoOp,
    From,
    Where,
    GroupBy,
    Having,
    Select,
    OrderBy,
    Limit,
}

impl Operation {
    /// The operation recorded after applying `self` on top of `last`.
    pub fn effective(self, last: Operation) -> Operation {
        match self {
            Operation::NoOp => last,
            op => op,
        }
    }

    /// Whether applying `next` after `last` requires wrapping the current
    /// plan in a CTE first.
    pub fn needs_materialization(last: Operation, next: Operation) -> bool {
        let next = next.effective(last);
        last == Operation::Init
            || next < last
            || (last == Operation::Select && next == Operation::Select)
    }
}
