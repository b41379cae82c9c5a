pub mod dal;
