use super::ApiClient;
use crate::config::SeatingConfig;
use crate::error::ApiError;
use crate::models::{Event, Venue};
use crate::seating::Layout;

impl ApiClient {
    pub async fn list_events(&self) -> Result<Vec<Event>, ApiError> {
        let events: Vec<Event> = self.send(self.get("/events")).await?;
        Ok(events.into_iter().map(Event::normalized).collect())
    }

    pub async fn get_venue(&self, venue_id: i64) -> Result<Venue, ApiError> {
        self.send(self.get(&format!("/venues/{venue_id}"))).await
    }

    /// Схема мест площадки мероприятия.
    pub async fn layout_for(&self, event: &Event, seating: &SeatingConfig) -> Result<Layout, ApiError> {
        let venue = self.get_venue(event.venue_id).await?;
        Ok(Layout::for_venue(&venue, seating))
    }
}
