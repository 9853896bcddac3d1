pub mod analysis;
pub mod dates;
pub mod health;
pub mod screening;
pub mod stocks;
pub mod system;
