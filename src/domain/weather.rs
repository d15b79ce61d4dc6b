use serde::{Deserialize, Serialize};

pub const SETUP_REQUIRED: &str = "Setup Required";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub temp: f64,
    pub humidity: i64,
    pub description: String,
    pub icon: String,
    pub city: String,
    pub setup_required: bool,
}

impl WeatherData {
    /// Placeholder returned while the weather source has no usable credentials.
    ///
    /// This is a healthy payload, not an error: consumers check
    /// `setup_required` to show the setup hint.
    pub fn setup_required() -> Self {
        Self {
            description: SETUP_REQUIRED.to_string(),
            setup_required: true,
            ..Self::default()
        }
    }
}
