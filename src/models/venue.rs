use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub capacity: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// HTML-фрагмент встраиваемой карты.
    #[serde(default)]
    pub map_embed: Option<String>,
}

impl Venue {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

impl Venue {
    pub async fn find_by_id(id: i64, db: &crate::database::Database) -> Result<Option<Venue>, sqlx::Error> {
        sqlx::query_as::<_, Venue>(
            "SELECT id, name, address, capacity, description, latitude, longitude, map_embed FROM venues WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&db.pool)
        .await
    }
}
