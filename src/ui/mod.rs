pub mod icons;
pub mod output;
pub mod table;

pub use icons::Icons;
pub use output::{error, header, info, is_quiet, paint, section, success, summary_row, warn, Tone};
pub use table::{product_table, stats_table, TableBuilder};
