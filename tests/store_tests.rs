mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use tradepost::db::{MetaKey, PgItemStore, RecordStore};

use common::{priced_item, setup_test_db};

// Runs against TEST_DATABASE_URL and is skipped when it is unset. One test so
// table cleanup cannot race another test in the same binary.
#[tokio::test]
async fn test_pg_item_store() {
    let Some(pool) = setup_test_db().await else {
        return;
    };
    let store = PgItemStore::new(pool);
    store.ping().await.unwrap();

    // Upserts overlay the stored document: keys only the old one has survive.
    let mut first = priced_item(19_721, "Glob of Ectoplasm", Some(3000), Some(2800));
    first.extra.insert("vendor_value".into(), json!(24));
    store.upsert_items(&[first]).await.unwrap();

    let second = priced_item(19_721, "Glob of Ectoplasm", Some(3100), Some(2900));
    store
        .upsert_items(&[second, priced_item(24, "Vial of Blood", None, None)])
        .await
        .unwrap();

    let items = store.load_items().await.unwrap();
    assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![24, 19_721]);
    let ecto = &items[1];
    assert_eq!(ecto.sell_price, Some(Decimal::from(3100)));
    assert_eq!(ecto.buy_price, Some(Decimal::from(2900)));
    assert_eq!(ecto.extra.get("vendor_value"), Some(&json!(24)));
    assert_eq!(items[0].sell_price, None);

    // Metadata
    assert_eq!(store.get_meta(MetaKey::LastUpdated).await.unwrap(), None);

    let earlier = Utc::now() - Duration::hours(2);
    let later = Utc::now();
    store.set_meta(MetaKey::LastRefreshTime, earlier).await.unwrap();
    store.set_meta(MetaKey::LastRefreshTime, later).await.unwrap();

    let stored = store.get_meta(MetaKey::LastRefreshTime).await.unwrap().unwrap();
    // Postgres keeps microseconds.
    assert!((stored - later).num_milliseconds().abs() < 1);
    assert_eq!(store.get_meta(MetaKey::LastUpdated).await.unwrap(), None);
}
