#![allow(dead_code)]

pub mod seller;
pub mod temp_db;
