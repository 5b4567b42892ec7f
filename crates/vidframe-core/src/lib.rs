pub mod capture;
pub mod compat;
pub mod extract;
pub mod options;
pub mod sheet;
pub mod video;
