pub mod contest_detail;
pub mod open_contest;
