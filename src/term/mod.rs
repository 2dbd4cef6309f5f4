pub mod caps;
pub mod cell;
