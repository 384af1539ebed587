pub mod object;
pub mod storage;
