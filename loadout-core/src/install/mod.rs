//! Page installers
//!
//! Run after every feature has been fetched. They read the exports in the
//! attribute store and hand widgets and dropdown options to the host.

mod dropdowns;
mod widgets;

pub use dropdowns::install_dropdowns;
pub use widgets::install_widgets;
