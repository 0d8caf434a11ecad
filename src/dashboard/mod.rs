//! The dashboard page with the current month's spending, budget and debts.

mod charts;
mod page;
mod summary;

pub use charts::{DashboardChart, category_chart, chart_container, charts_script};
pub use page::{DashboardState, get_dashboard_page};
pub use summary::{CategoryTotal, category_breakdown};
