#![allow(dead_code)]

pub mod bars;
