// src/models/mod.rs

pub mod history;
pub mod question;
pub mod quiz;
pub mod review;
pub mod taker;
pub mod user;
