pub mod converge;
pub mod show;
