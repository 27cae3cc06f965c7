pub mod evaluate;
pub mod replay;
