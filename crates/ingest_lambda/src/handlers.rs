pub mod dispatch;
pub mod unit;
pub mod writer;
