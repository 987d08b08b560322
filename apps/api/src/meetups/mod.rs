// Group meetups run by organizers: scheduling, joining, and QR check-in.

pub mod checkin;
pub mod handlers;
pub mod queries;
pub mod validation;
