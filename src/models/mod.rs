pub mod change;
pub mod params;
pub mod search;
pub mod store;
pub mod table;
pub mod view_state;
pub mod views;
