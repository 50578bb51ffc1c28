pub mod admin;
pub mod fund;
pub mod payout;
pub mod show;
pub mod work;
