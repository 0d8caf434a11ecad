//! Getting data out: a full JSON backup and a CSV of expenses.

mod backup;
mod csv;
mod page;

pub use backup::{BACKUP_VERSION, Backup, build_backup};
pub use csv::{expenses_to_csv, export_expenses_csv};
pub use page::{ExportState, export_backup_endpoint, export_expenses_csv_endpoint, get_export_page};
