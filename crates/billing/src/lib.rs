//! Billing subsystem: invoice numbering, invoice generation, and
//! recurring schedules.
//!
//! Invoices are generated from two sources: an order (the whole order,
//! line items 1:1 from order items) or episode delivery (delivered,
//! not-yet-invoiced spots). Numbers are unique per (prefix, year,
//! month) and strictly increasing within the bucket.

#![deny(unsafe_code)]

mod error;
mod generator;
mod numbering;
mod recurring;

pub use error::{BillingError, BillingResult};
pub use generator::{InvoiceGenerator, NET_TERMS_DAYS};
pub use numbering::InvoiceNumber;
pub use recurring::{RecurringBillingRunner, RecurringRunReport};
