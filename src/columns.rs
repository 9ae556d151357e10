//! Positional column layouts for the order sheet and the price sheet.
//!
//! The sheets carry no schema, so every reader goes through these tables
//! instead of hard-coding indices. A cell past the end of a row reads as an
//! empty string: the Sheets API trims trailing blanks, so a short row is a row
//! with missing fields rather than a malformed one.

use crate::errors::{WatchError, WatchResult};

/// Named fields of an order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderField {
    OrderId,
    ProductCode,
    Description,
    CustomerName,
    ContactLink,
    Slot,
    RegisteredOn,
    DurationDays,
    ExpiresOn,
    SalePrice,
    DaysRemaining,
}

impl OrderField {
    /// Every field, in column order.
    pub const ALL: [OrderField; 11] = [
        OrderField::OrderId,
        OrderField::ProductCode,
        OrderField::Description,
        OrderField::CustomerName,
        OrderField::ContactLink,
        OrderField::Slot,
        OrderField::RegisteredOn,
        OrderField::DurationDays,
        OrderField::ExpiresOn,
        OrderField::SalePrice,
        OrderField::DaysRemaining,
    ];

    /// Zero-based column index of this field.
    pub const fn index(self) -> usize {
        match self {
            OrderField::OrderId => 0,
            OrderField::ProductCode => 1,
            OrderField::Description => 2,
            OrderField::CustomerName => 3,
            OrderField::ContactLink => 4,
            OrderField::Slot => 5,
            OrderField::RegisteredOn => 6,
            OrderField::DurationDays => 7,
            OrderField::ExpiresOn => 8,
            OrderField::SalePrice => 9,
            OrderField::DaysRemaining => 10,
        }
    }

    /// Number of columns the layout spans.
    pub fn width() -> usize {
        Self::ALL.iter().map(|f| f.index() + 1).max().unwrap_or(0)
    }
}

/// Named fields of a price-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    ProductCode,
    ResellerPrice,
    RetailPrice,
}

impl PriceField {
    pub const fn index(self) -> usize {
        match self {
            PriceField::ProductCode => 0,
            PriceField::ResellerPrice => 1,
            PriceField::RetailPrice => 2,
        }
    }
}

/// Read a cell, treating a missing column as empty.
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Read an order field, trimmed.
pub fn order_cell(row: &[String], field: OrderField) -> &str {
    cell(row, field.index()).trim()
}

/// Read a price-table field, trimmed.
pub fn price_cell(row: &[String], field: PriceField) -> &str {
    cell(row, field.index()).trim()
}

/// Check the order sheet's header row against the expected layout.
///
/// A header narrower than the layout means the sheet's columns have drifted
/// and every positional read after that would be wrong.
pub fn validate_order_header(header: &[String]) -> WatchResult<()> {
    let expected = OrderField::width();
    if header.len() < expected {
        return Err(WatchError::Layout(format!(
            "order sheet header has {} columns, layout expects at least {}",
            header.len(),
            expected
        )));
    }
    Ok(())
}
