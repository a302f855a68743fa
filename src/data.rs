use crate::{
    normalize::Address,
    record::{Keyed, Platform, Restaurant, Review},
    utils, CrawlerError,
};
use futures::TryStreamExt;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteQueryResult, SqliteRow},
    Row, Sqlite, SqlitePool, Transaction,
};
use std::time::Duration;

pub type Tx = Transaction<'static, Sqlite>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait::async_trait]
pub trait Table: Send + Sync {
    type Record: Keyed + Send + Sync;

    fn get_name(&self) -> &str;
    fn get_pool(&self) -> &SqlitePool;
    /// Column holding [`Keyed::unique_key`].
    fn key_column(&self) -> &str;

    async fn create(&self) -> Result<(), sqlx::Error>;
    async fn insert(&self, tx: &mut Tx, record: &Self::Record) -> Result<i64, sqlx::Error>;
    /// Inserts `record` unless it collides with a stored row on a UNIQUE
    /// column, in which case nothing is written.
    async fn insert_new(&self, tx: &mut Tx, record: &Self::Record)
        -> Result<Option<i64>, sqlx::Error>;
    /// Overwrites every column of row `id`.
    async fn update(&self, tx: &mut Tx, id: i64, record: &Self::Record)
        -> Result<(), sqlx::Error>;
    async fn get(&self, id: i64) -> Result<Option<Self::Record>, sqlx::Error>;

    async fn find_by_key(&self, tx: &mut Tx, key: &str) -> Result<Option<i64>, sqlx::Error> {
        let query = format!(
            "SELECT id FROM {} WHERE {} = ?",
            self.get_name(),
            self.key_column()
        );
        sqlx::query(&query)
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.try_get("id"))
            .transpose()
    }

    /// Stored row holding the identity of `record`.
    async fn find_existing(
        &self,
        tx: &mut Tx,
        record: &Self::Record,
    ) -> Result<Option<i64>, sqlx::Error> {
        self.find_by_key(tx, record.unique_key()).await
    }

    async fn count(&self) -> Result<u32, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {}", self.get_name());
        sqlx::query(&query)
            .fetch_one(self.get_pool())
            .await?
            .try_get(0)
    }
}

fn inserted_id(result: SqliteQueryResult) -> Option<i64> {
    (result.rows_affected() > 0).then(|| result.last_insert_rowid())
}

fn platform_from_row(row: &SqliteRow) -> Result<Platform, sqlx::Error> {
    row.try_get::<String, _>("source_platform")?
        .parse()
        .map_err(|e: String| sqlx::Error::Decode(e.into()))
}

#[derive(Debug, Clone)]
pub struct RestaurantTable {
    name: String,
    pool: SqlitePool,
}

impl RestaurantTable {
    async fn insert_with(
        &self,
        verb: &str,
        tx: &mut Tx,
        record: &Restaurant,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        let query = format!(
            r#"{} INTO {} (
                name,
                address,
                city,
                state,
                postal_code,
                phone,
                website,
                cuisine_type,
                price_range,
                average_rating,
                source_url,
                source_id,
                source_platform,
                last_updated) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            verb, self.name
        );
        sqlx::query(&query)
            .bind(&record.name)
            .bind(&record.address.street)
            .bind(&record.address.city)
            .bind(&record.address.state)
            .bind(&record.address.postal_code)
            .bind(&record.phone)
            .bind(&record.website)
            .bind(&record.cuisine_type)
            .bind(&record.price_range)
            .bind(record.average_rating)
            .bind(&record.source_url)
            .bind(&record.source_id)
            .bind(record.source_platform.as_str())
            .bind(record.last_updated)
            .execute(&mut *tx)
            .await
    }

    fn from_row(row: &SqliteRow) -> Result<Restaurant, sqlx::Error> {
        Ok(Restaurant {
            name: row.try_get("name")?,
            address: Address {
                street: row.try_get("address")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                postal_code: row.try_get("postal_code")?,
            },
            phone: row.try_get("phone")?,
            website: row.try_get("website")?,
            cuisine_type: row.try_get("cuisine_type")?,
            price_range: row.try_get("price_range")?,
            average_rating: row.try_get("average_rating")?,
            source_url: row.try_get("source_url")?,
            source_id: row.try_get("source_id")?,
            source_platform: platform_from_row(row)?,
            last_updated: row.try_get("last_updated")?,
        })
    }
}

#[async_trait::async_trait]
impl Table for RestaurantTable {
    type Record = Restaurant;

    fn get_name(&self) -> &str {
        self.name.as_str()
    }

    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn key_column(&self) -> &str {
        "source_url"
    }

    async fn create(&self) -> Result<(), sqlx::Error> {
        if !utils::is_table_exists(self.get_pool(), &self.name).await? {
            let query = format!(
                r#"
                    CREATE TABLE {} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        name TEXT NOT NULL,
                        address TEXT,
                        city TEXT,
                        state TEXT,
                        postal_code TEXT,
                        phone TEXT,
                        website TEXT,
                        cuisine_type TEXT,
                        price_range TEXT,
                        average_rating REAL,
                        source_url TEXT NOT NULL UNIQUE,
                        source_id TEXT NOT NULL,
                        source_platform TEXT NOT NULL,
                        last_updated DATETIME,
                        UNIQUE (source_platform, source_id)
                    )
                "#,
                &self.name
            );
            sqlx::query(query.as_str()).execute(self.get_pool()).await?;
        }
        Ok(())
    }

    async fn insert(&self, tx: &mut Tx, record: &Restaurant) -> Result<i64, sqlx::Error> {
        Ok(self.insert_with("INSERT", tx, record).await?.last_insert_rowid())
    }

    async fn insert_new(
        &self,
        tx: &mut Tx,
        record: &Restaurant,
    ) -> Result<Option<i64>, sqlx::Error> {
        Ok(inserted_id(
            self.insert_with("INSERT OR IGNORE", tx, record).await?,
        ))
    }

    /// Row with the same URL or, failing that, the same platform identity.
    async fn find_existing(
        &self,
        tx: &mut Tx,
        record: &Restaurant,
    ) -> Result<Option<i64>, sqlx::Error> {
        let query = format!(
            r#"SELECT id FROM {}
               WHERE source_url = ? OR (source_platform = ? AND source_id = ?)
               ORDER BY source_url = ? DESC
               LIMIT 1"#,
            self.name
        );
        sqlx::query(&query)
            .bind(&record.source_url)
            .bind(record.source_platform.as_str())
            .bind(&record.source_id)
            .bind(&record.source_url)
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.try_get("id"))
            .transpose()
    }

    async fn update(&self, tx: &mut Tx, id: i64, record: &Restaurant) -> Result<(), sqlx::Error> {
        let query = format!(
            r#"UPDATE {} SET
                name = ?,
                address = ?,
                city = ?,
                state = ?,
                postal_code = ?,
                phone = ?,
                website = ?,
                cuisine_type = ?,
                price_range = ?,
                average_rating = ?,
                source_url = ?,
                source_id = ?,
                source_platform = ?,
                last_updated = ?
               WHERE id = ?"#,
            self.name
        );
        sqlx::query(&query)
            .bind(&record.name)
            .bind(&record.address.street)
            .bind(&record.address.city)
            .bind(&record.address.state)
            .bind(&record.address.postal_code)
            .bind(&record.phone)
            .bind(&record.website)
            .bind(&record.cuisine_type)
            .bind(&record.price_range)
            .bind(record.average_rating)
            .bind(&record.source_url)
            .bind(&record.source_id)
            .bind(record.source_platform.as_str())
            .bind(record.last_updated)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<Restaurant>, sqlx::Error> {
        let query = format!("SELECT * FROM {} WHERE id = ?", self.name);
        sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?
            .map(|row| RestaurantTable::from_row(&row))
            .transpose()
    }
}

#[derive(Debug, Clone)]
pub struct ReviewTable {
    name: String,
    restaurants: String,
    pool: SqlitePool,
}

impl ReviewTable {
    async fn insert_with(
        &self,
        verb: &str,
        tx: &mut Tx,
        record: &Review,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        let query = format!(
            r#"{} INTO {} (
                restaurant_id,
                rating,
                review_text,
                review_date,
                reviewer_name,
                reviewer_id,
                helpful_count,
                source_url,
                source_id,
                source_platform,
                crawl_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            verb, self.name
        );
        sqlx::query(&query)
            .bind(record.restaurant_id)
            .bind(record.rating)
            .bind(&record.text)
            .bind(record.review_date)
            .bind(&record.reviewer_name)
            .bind(&record.reviewer_id)
            .bind(i64::from(record.helpful_count))
            .bind(&record.source_url)
            .bind(&record.source_id)
            .bind(record.source_platform.as_str())
            .bind(record.crawl_date)
            .execute(&mut *tx)
            .await
    }

    fn from_row(row: &SqliteRow) -> Result<Review, sqlx::Error> {
        Ok(Review {
            restaurant_id: row.try_get("restaurant_id")?,
            rating: row.try_get("rating")?,
            text: row.try_get("review_text")?,
            review_date: row.try_get("review_date")?,
            reviewer_name: row.try_get("reviewer_name")?,
            reviewer_id: row.try_get("reviewer_id")?,
            helpful_count: u32::try_from(row.try_get::<i64, _>("helpful_count")?)
                .unwrap_or_default(),
            source_url: row.try_get("source_url")?,
            source_id: row.try_get("source_id")?,
            source_platform: platform_from_row(row)?,
            crawl_date: row.try_get("crawl_date")?,
        })
    }

    /// Stored reviews of a restaurant in insertion order.
    pub async fn for_restaurant(&self, restaurant_id: i64) -> Result<Vec<Review>, sqlx::Error> {
        let query = format!(
            "SELECT * FROM {} WHERE restaurant_id = ? ORDER BY id",
            self.name
        );
        let mut rows = sqlx::query(&query).bind(restaurant_id).fetch(self.get_pool());

        let mut reviews = vec![];
        while let Some(row) = rows.try_next().await? {
            reviews.push(ReviewTable::from_row(&row)?);
        }
        Ok(reviews)
    }
}

#[async_trait::async_trait]
impl Table for ReviewTable {
    type Record = Review;

    fn get_name(&self) -> &str {
        self.name.as_str()
    }

    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn key_column(&self) -> &str {
        "source_id"
    }

    async fn create(&self) -> Result<(), sqlx::Error> {
        if !utils::is_table_exists(self.get_pool(), &self.name).await? {
            let query = format!(
                r#"
                    CREATE TABLE {} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        restaurant_id INTEGER NOT NULL REFERENCES {}(id),
                        rating REAL NOT NULL,
                        review_text TEXT,
                        review_date DATETIME,
                        reviewer_name TEXT,
                        reviewer_id TEXT,
                        helpful_count INTEGER NOT NULL DEFAULT 0,
                        source_url TEXT,
                        source_id TEXT NOT NULL UNIQUE,
                        source_platform TEXT NOT NULL,
                        crawl_date DATETIME
                    )
                "#,
                &self.name, &self.restaurants
            );
            sqlx::query(query.as_str()).execute(self.get_pool()).await?;
        }
        Ok(())
    }

    async fn insert(&self, tx: &mut Tx, record: &Review) -> Result<i64, sqlx::Error> {
        Ok(self.insert_with("INSERT", tx, record).await?.last_insert_rowid())
    }

    async fn insert_new(&self, tx: &mut Tx, record: &Review) -> Result<Option<i64>, sqlx::Error> {
        Ok(inserted_id(
            self.insert_with("INSERT OR IGNORE", tx, record).await?,
        ))
    }

    async fn update(&self, tx: &mut Tx, id: i64, record: &Review) -> Result<(), sqlx::Error> {
        let query = format!(
            r#"UPDATE {} SET
                restaurant_id = ?,
                rating = ?,
                review_text = ?,
                review_date = ?,
                reviewer_name = ?,
                reviewer_id = ?,
                helpful_count = ?,
                source_url = ?,
                source_id = ?,
                source_platform = ?,
                crawl_date = ?
               WHERE id = ?"#,
            self.name
        );
        sqlx::query(&query)
            .bind(record.restaurant_id)
            .bind(record.rating)
            .bind(&record.text)
            .bind(record.review_date)
            .bind(&record.reviewer_name)
            .bind(&record.reviewer_id)
            .bind(i64::from(record.helpful_count))
            .bind(&record.source_url)
            .bind(&record.source_id)
            .bind(record.source_platform.as_str())
            .bind(record.crawl_date)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<Review>, sqlx::Error> {
        let query = format!("SELECT * FROM {} WHERE id = ?", self.name);
        sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?
            .map(|row| ReviewTable::from_row(&row))
            .transpose()
    }
}

#[derive(Debug, Clone)]
pub struct Database {
    pub restaurants: RestaurantTable,
    pub reviews: ReviewTable,
    pool: SqlitePool,
}

impl Database {
    /// Opens `<name>.db`, creating the file and the tables when missing.
    pub async fn new(name: &str) -> Result<Database, CrawlerError> {
        let opt = SqliteConnectOptions::new()
            .filename(format!("{}.db", name))
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePool::connect_with(opt).await?;
        let db = Database {
            restaurants: RestaurantTable {
                name: "restaurants".to_string(),
                pool: pool.clone(),
            },
            reviews: ReviewTable {
                name: "reviews".to_string(),
                restaurants: "restaurants".to_string(),
                pool: pool.clone(),
            },
            pool,
        };

        if !utils::is_table_exists(&db.pool, &db.restaurants.name).await? {
            tracing::debug!("Create table {}", db.restaurants.name);
            db.restaurants.create().await?;
        } else {
            tracing::debug!("Use table {}", db.restaurants.name);
        }
        if !utils::is_table_exists(&db.pool, &db.reviews.name).await? {
            tracing::debug!("Create table {}", db.reviews.name);
            db.reviews.create().await?;
        } else {
            tracing::debug!("Use table {}", db.reviews.name);
        }

        Ok(db)
    }

    pub async fn begin(&self) -> Result<Tx, sqlx::Error> {
        self.pool.begin().await
    }
}
