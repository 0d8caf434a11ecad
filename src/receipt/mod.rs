//! Receipt uploads and reading bills with an AI model.

mod page;
mod scanner;
mod storage;

pub use page::{ReceiptState, get_expense_receipt, get_scan_bill_page, scan_bill_endpoint};
pub use scanner::{ScannedBill, ScannerConfig, parse_scan_response, scan_bill};
pub use storage::{
    ReceiptFileType, is_receipt_path_owned_by, new_receipt_path, read_receipt, remove_receipt,
    store_receipt,
};
