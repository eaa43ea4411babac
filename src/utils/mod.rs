// src/utils/mod.rs

pub mod booking;
pub mod csv;
pub mod grace;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod template;
