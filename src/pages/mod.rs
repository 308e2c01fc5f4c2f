pub mod energy;
pub mod home;
pub mod not_found;
