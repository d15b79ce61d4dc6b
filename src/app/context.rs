use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app::error::Result;
use crate::config::{CalendarKind, Config, SectionKind};
use crate::fetcher::manager::DEFAULT_BUFFER;
use crate::fetcher::{
    CalDavSource, CalendarAggregator, ICalSource, Manager, Registration, RssSource, Source,
    WeatherSource,
};
use crate::state::StateStore;

const SOURCE_INITIAL_BACKOFF: Duration = Duration::from_secs(5);
const CALENDAR_INITIAL_BACKOFF: Duration = Duration::from_secs(10);
const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Validated configuration plus the shared state it feeds.
pub struct AppContext {
    pub config: Config,
    pub state: StateStore,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: StateStore::new(),
        })
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::new(Config::load(path)?)
    }

    /// One registration per usable section, in config order.
    ///
    /// Sections missing their sub-configuration, sections of unknown type and
    /// calendar entries of unknown type are skipped.
    pub fn registrations(&self) -> Result<Vec<Registration>> {
        let mut registrations = Vec::new();

        for section in &self.config.sections {
            let interval = section.interval()?;

            let (source, initial_backoff): (Arc<dyn Source>, Duration) = match section.kind {
                SectionKind::Weather => {
                    let Some(weather) = &section.weather else {
                        tracing::warn!(section = %section.id, "weather section without [weather] settings, skipping");
                        continue;
                    };
                    let source = WeatherSource::new(
                        &section.id,
                        &weather.api_key,
                        &weather.city,
                        &weather.units,
                        weather.base_url.clone(),
                    )?;
                    (Arc::new(source), SOURCE_INITIAL_BACKOFF)
                }
                SectionKind::Rss => {
                    let Some(rss) = &section.rss else {
                        tracing::warn!(section = %section.id, "rss section without [rss] settings, skipping");
                        continue;
                    };
                    (Arc::new(RssSource::new(&section.id, &rss.url)?), SOURCE_INITIAL_BACKOFF)
                }
                SectionKind::Calendar => {
                    let mut children: Vec<Arc<dyn Source>> = Vec::new();
                    for calendar in &section.calendars {
                        match calendar.kind {
                            CalendarKind::Ical => {
                                children.push(Arc::new(ICalSource::new(&calendar.name, &calendar.url)?));
                            }
                            CalendarKind::Caldav => {
                                children.push(Arc::new(CalDavSource::new(
                                    &calendar.name,
                                    &calendar.url,
                                    &calendar.username,
                                    &calendar.password,
                                )?));
                            }
                            CalendarKind::Unknown => {
                                tracing::warn!(
                                    section = %section.id,
                                    calendar = %calendar.name,
                                    "unknown calendar type, skipping"
                                );
                            }
                        }
                    }
                    if children.is_empty() {
                        tracing::warn!(section = %section.id, "calendar section has no usable calendars, skipping");
                        continue;
                    }
                    (
                        Arc::new(CalendarAggregator::new(&section.id, children)),
                        CALENDAR_INITIAL_BACKOFF,
                    )
                }
                SectionKind::Unknown => {
                    tracing::warn!(section = %section.id, "unknown section type, skipping");
                    continue;
                }
            };

            registrations.push(Registration {
                source,
                interval,
                initial_backoff,
                max_backoff: MAX_BACKOFF,
            });
        }

        Ok(registrations)
    }

    /// A manager with every registration, its stream sized to hold one result
    /// per source at minimum.
    pub fn build_manager(&self) -> Result<Manager> {
        let registrations = self.registrations()?;
        let mut manager = Manager::with_buffer(DEFAULT_BUFFER.max(registrations.len()));
        for r in registrations {
            manager.register_with_backoff(r.source, r.interval, r.initial_backoff, r.max_backoff);
        }
        Ok(manager)
    }

    pub fn section_ids(&self) -> Vec<String> {
        self.config.sections.iter().map(|s| s.id.clone()).collect()
    }
}
