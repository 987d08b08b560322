// Accumulated-sats ledger. Balances move only through the
// `add_accumulated_sats` / `deduct_accumulated_sats` procedures.

pub mod accumulated;
pub mod handlers;
