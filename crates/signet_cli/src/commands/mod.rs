pub mod audit;
pub mod create;
pub mod download;
pub mod rebuild;
pub mod send;
pub mod sign;
pub mod status;
