//! Transactions record money that was earned or spent.

mod api;
mod core;
mod transactions_page;

pub use api::{
    create_transaction_endpoint, delete_transaction_endpoint, list_transactions,
    update_transaction_endpoint,
};
pub use core::{
    Category, Transaction, TransactionBuilder, TransactionData, TransactionId, TransactionTotals,
    TransactionType, create_transaction, create_transaction_table, get_expenses_by_category,
    get_transaction_totals, get_transactions,
};
pub use transactions_page::{
    create_transaction_form_endpoint, delete_transaction_form_endpoint, get_transactions_page,
};
