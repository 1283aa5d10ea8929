#![allow(dead_code)]

pub mod sqlite_engine;
pub mod temp_db;
