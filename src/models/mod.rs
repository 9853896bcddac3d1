pub mod analysis;
pub mod capability;
pub mod chart;
pub mod screening;
pub mod stock;

use serde::Serialize;

/// `{"status": "success", "data": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn success(data: T) -> Self {
        Self { status: "success", data }
    }
}
