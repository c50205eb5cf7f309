// Bulk module - The batch mint record
// Fixed-width binary record carrying 5 to 10 (amount, account) pairs

mod codec;
mod record;

pub use codec::*;
pub use record::*;
