pub mod config;
pub mod database;
pub mod dataframe;
pub mod deploy;
pub mod expr;
pub mod gateway;
pub mod group;
pub mod literal;
pub mod naming;
pub mod order;
pub mod row;
pub mod testutil;

pub use database::Database;
pub use dataframe::DataFrame;
pub use dataframe::fetch::FetchMode;
pub use dataframe::join::{JoinColumn, JoinSpec, JoinType};
pub use dataframe::selector::{RowSlice, Selection, Selector};
pub use expr::Expr;
pub use gateway::{Gateway, TextRow, with_transaction};
pub use literal::Literal;
pub use row::Row;
