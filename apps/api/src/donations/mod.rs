// Donations: Lightning invoices to the project wallet, paid either per
// session or out of the accumulated-sats balance.

pub mod handlers;
pub mod queries;
pub mod service;
