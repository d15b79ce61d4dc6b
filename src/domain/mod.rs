pub mod calendar;
pub mod feed;
pub mod result;
pub mod weather;

pub use calendar::{CalendarData, CalendarEvent};
pub use feed::{RssData, RssItem};
pub use result::{FetchResult, Payload, Status};
pub use weather::WeatherData;
