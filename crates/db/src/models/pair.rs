use sqlx::SqlitePool;
use tracing::debug;
use utils::text::dedupe_trimmed;

/// Served when no database is configured.
pub const DEFAULT_PAIRS: [&str; 5] = ["EURUSD", "GBPUSD", "USDJPY", "XAUUSD", "NAS100"];

pub struct Pair;

impl Pair {
    pub fn defaults() -> Vec<String> {
        DEFAULT_PAIRS.iter().map(|s| s.to_string()).collect()
    }

    /// All stored symbols in insertion order.
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT symbol FROM pairs ORDER BY rowid ASC")
            .fetch_all(pool)
            .await
    }

    /// Replace the stored set with `symbols`. Blank entries and repeats are skipped.
    ///
    /// The delete and the inserts share one transaction, so concurrent readers see
    /// either the old set or the new one.
    pub async fn replace_all<S: AsRef<str>>(
        pool: &SqlitePool,
        symbols: &[S],
    ) -> Result<Vec<String>, sqlx::Error> {
        let symbols = dedupe_trimmed(symbols.iter().map(|s| s.as_ref()));

        let mut tx = pool.begin().await?;
        let removed = sqlx::query("DELETE FROM pairs").execute(&mut *tx).await?;
        for symbol in &symbols {
            sqlx::query("INSERT INTO pairs (symbol) VALUES ($1)")
                .bind(symbol)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(
            removed = removed.rows_affected(),
            inserted = symbols.len(),
            "Replaced pair list"
        );
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn replace_overwrites_previous_set() {
        let db = DBService::new_in_memory().await.unwrap();
        let pool = db.pool().unwrap();

        Pair::replace_all(pool, &["USDJPY", "AUDUSD", "NZDUSD"]).await.unwrap();
        Pair::replace_all(pool, &["EURUSD", "GBPUSD"]).await.unwrap();

        assert_eq!(Pair::find_all(pool).await.unwrap(), vec!["EURUSD", "GBPUSD"]);
    }

    #[tokio::test]
    async fn replace_with_empty_list_clears() {
        let db = DBService::new_in_memory().await.unwrap();
        let pool = db.pool().unwrap();

        Pair::replace_all(pool, &["EURUSD"]).await.unwrap();
        let stored = Pair::replace_all::<&str>(pool, &[]).await.unwrap();
        assert!(stored.is_empty());
        assert!(Pair::find_all(pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicates_do_not_abort_the_save() {
        let db = DBService::new_in_memory().await.unwrap();
        let pool = db.pool().unwrap();

        let stored = Pair::replace_all(pool, &["XAUUSD", " XAUUSD ", "", "US30"])
            .await
            .unwrap();
        assert_eq!(stored, vec!["XAUUSD", "US30"]);
        assert_eq!(Pair::find_all(pool).await.unwrap(), vec!["XAUUSD", "US30"]);
    }

    #[test]
    fn defaults_have_five_symbols() {
        assert_eq!(Pair::defaults().len(), 5);
    }
}
