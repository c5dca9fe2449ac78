//! Accounts hold the user's money: bank cards, deposits, cash and so on.

mod accounts_page;
mod api;
mod core;

pub use accounts_page::{
    create_account_form_endpoint, delete_account_form_endpoint, get_accounts_page,
};
pub use api::{
    create_account_endpoint, delete_account_endpoint, list_accounts, update_account_endpoint,
};
pub use core::{
    Account, AccountData, AccountId, AccountType, check_account_owner, create_account,
    create_account_table, delete_account, get_account, get_accounts, get_total_account_balance,
    map_account_row, update_account,
};
