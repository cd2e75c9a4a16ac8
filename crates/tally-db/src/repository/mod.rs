//! # Repository Module
//!
//! Database repository implementations for the Ledger Store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Writes What                                      │
//! │                                                                         │
//! │  ProductRepository     catalog CRUD, manual stock edits                │
//! │  CustomerRepository    profile CRUD, manual loyalty edits              │
//! │  OrderRepository       read-only order history (Order Query Service)   │
//! │                                                                         │
//! │  OrderCommitCoordinator (commit module)                                │
//! │  └── the ONLY writer of orders / order_items, and the only path that  │
//! │      moves stock and loyalty as a consequence of a sale               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and search
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer CRUD
//! - [`OrderRepository`](order::OrderRepository) - Order history and line items

pub mod customer;
pub mod order;
pub mod product;

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern and wraps the
/// term for substring matching.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("bean"), "%bean%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
