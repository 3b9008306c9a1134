use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record exactly as it arrives from the market-data feed, after key
/// normalization but before validation.
pub type RawItem = Map<String, Value>;

/// Canonical stored record for one tradeable item.
///
/// Prices are in copper. Every numeric field is optional: `None` means the feed
/// had no value (no active listing, no trades in the window, ...). Keys the
/// struct does not know about are kept in `extra` so that an overlay merge
/// never loses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: i64,
    pub name: Option<String>,
    pub rarity: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,

    pub charm: Option<String>,
    pub img: Option<String>,
    pub chat_link: Option<String>,
    pub level: Option<Decimal>,
    pub first_added: Option<String>,
    pub last_update: Option<String>,
    pub stat_name: Option<String>,
    pub upgrade_name: Option<String>,
    pub weapon_type: Option<String>,

    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub buy_quantity: Option<Decimal>,
    pub sell_quantity: Option<Decimal>,

    // Windowed trading statistics: {one_d,two_d,seven_d,one_m}_{sell,buy}_<metric>
    pub one_d_sell_price_avg: Option<Decimal>,
    pub one_d_sell_sold: Option<Decimal>,
    pub one_d_sell_listed: Option<Decimal>,
    pub one_d_sell_delisted: Option<Decimal>,
    pub one_d_sell_value: Option<Decimal>,
    pub one_d_sell_quantity_avg: Option<Decimal>,
    pub two_d_sell_price_avg: Option<Decimal>,
    pub two_d_sell_sold: Option<Decimal>,
    pub two_d_sell_listed: Option<Decimal>,
    pub two_d_sell_delisted: Option<Decimal>,
    pub two_d_sell_value: Option<Decimal>,
    pub two_d_sell_quantity_avg: Option<Decimal>,
    pub seven_d_sell_price_avg: Option<Decimal>,
    pub seven_d_sell_sold: Option<Decimal>,
    pub seven_d_sell_listed: Option<Decimal>,
    pub seven_d_sell_delisted: Option<Decimal>,
    pub seven_d_sell_value: Option<Decimal>,
    pub seven_d_sell_quantity_avg: Option<Decimal>,
    pub one_m_sell_price_avg: Option<Decimal>,
    pub one_m_sell_sold: Option<Decimal>,
    pub one_m_sell_listed: Option<Decimal>,
    pub one_m_sell_delisted: Option<Decimal>,
    pub one_m_sell_value: Option<Decimal>,
    pub one_m_sell_quantity_avg: Option<Decimal>,
    pub one_d_buy_price_avg: Option<Decimal>,
    pub one_d_buy_sold: Option<Decimal>,
    pub one_d_buy_listed: Option<Decimal>,
    pub one_d_buy_delisted: Option<Decimal>,
    pub one_d_buy_value: Option<Decimal>,
    pub one_d_buy_quantity_avg: Option<Decimal>,
    pub two_d_buy_price_avg: Option<Decimal>,
    pub two_d_buy_sold: Option<Decimal>,
    pub two_d_buy_listed: Option<Decimal>,
    pub two_d_buy_delisted: Option<Decimal>,
    pub two_d_buy_value: Option<Decimal>,
    pub two_d_buy_quantity_avg: Option<Decimal>,
    pub seven_d_buy_price_avg: Option<Decimal>,
    pub seven_d_buy_sold: Option<Decimal>,
    pub seven_d_buy_listed: Option<Decimal>,
    pub seven_d_buy_delisted: Option<Decimal>,
    pub seven_d_buy_value: Option<Decimal>,
    pub seven_d_buy_quantity_avg: Option<Decimal>,
    pub one_m_buy_price_avg: Option<Decimal>,
    pub one_m_buy_sold: Option<Decimal>,
    pub one_m_buy_listed: Option<Decimal>,
    pub one_m_buy_delisted: Option<Decimal>,
    pub one_m_buy_value: Option<Decimal>,
    pub one_m_buy_quantity_avg: Option<Decimal>,
    pub one_d_sell_delisted_value: Option<Decimal>,
    pub two_d_sell_delisted_value: Option<Decimal>,
    pub seven_d_sell_delisted_value: Option<Decimal>,
    pub one_m_sell_delisted_value: Option<Decimal>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemRecord {
    /// An otherwise empty record; handy as a base for fixtures and merges.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            name: None,
            rarity: None,
            item_type: None,
            charm: None,
            img: None,
            chat_link: None,
            level: None,
            first_added: None,
            last_update: None,
            stat_name: None,
            upgrade_name: None,
            weapon_type: None,
            buy_price: None,
            sell_price: None,
            buy_quantity: None,
            sell_quantity: None,
            one_d_sell_price_avg: None,
            one_d_sell_sold: None,
            one_d_sell_listed: None,
            one_d_sell_delisted: None,
            one_d_sell_value: None,
            one_d_sell_quantity_avg: None,
            two_d_sell_price_avg: None,
            two_d_sell_sold: None,
            two_d_sell_listed: None,
            two_d_sell_delisted: None,
            two_d_sell_value: None,
            two_d_sell_quantity_avg: None,
            seven_d_sell_price_avg: None,
            seven_d_sell_sold: None,
            seven_d_sell_listed: None,
            seven_d_sell_delisted: None,
            seven_d_sell_value: None,
            seven_d_sell_quantity_avg: None,
            one_m_sell_price_avg: None,
            one_m_sell_sold: None,
            one_m_sell_listed: None,
            one_m_sell_delisted: None,
            one_m_sell_value: None,
            one_m_sell_quantity_avg: None,
            one_d_buy_price_avg: None,
            one_d_buy_sold: None,
            one_d_buy_listed: None,
            one_d_buy_delisted: None,
            one_d_buy_value: None,
            one_d_buy_quantity_avg: None,
            two_d_buy_price_avg: None,
            two_d_buy_sold: None,
            two_d_buy_listed: None,
            two_d_buy_delisted: None,
            two_d_buy_value: None,
            two_d_buy_quantity_avg: None,
            seven_d_buy_price_avg: None,
            seven_d_buy_sold: None,
            seven_d_buy_listed: None,
            seven_d_buy_delisted: None,
            seven_d_buy_value: None,
            seven_d_buy_quantity_avg: None,
            one_m_buy_price_avg: None,
            one_m_buy_sold: None,
            one_m_buy_listed: None,
            one_m_buy_delisted: None,
            one_m_buy_value: None,
            one_m_buy_quantity_avg: None,
            one_d_sell_delisted_value: None,
            two_d_sell_delisted_value: None,
            seven_d_sell_delisted_value: None,
            one_m_sell_delisted_value: None,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_accepts_numbers_and_numeric_strings() {
        let item: ItemRecord = serde_json::from_value(json!({
            "id": 19721,
            "name": "Glob of Ectoplasm",
            "type": "CraftingMaterial",
            "buy_price": 2100,
            "sell_price": "2250",
            "one_d_sell_price_avg": 2241.5,
        }))
        .unwrap();

        assert_eq!(item.id, 19721);
        assert_eq!(item.item_type.as_deref(), Some("CraftingMaterial"));
        assert_eq!(item.buy_price, Some(Decimal::from(2100)));
        assert_eq!(item.sell_price, Some(Decimal::from(2250)));
        assert_eq!(item.one_d_sell_price_avg, Some(Decimal::new(22415, 1)));
        assert_eq!(item.two_d_buy_sold, None);
    }

    #[test]
    fn test_unknown_keys_are_retained() {
        let item: ItemRecord = serde_json::from_value(json!({
            "id": 1,
            "vendor_value": 32,
        }))
        .unwrap();

        assert_eq!(item.extra.get("vendor_value"), Some(&json!(32)));

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["vendor_value"], json!(32));
    }

    #[test]
    fn test_non_numeric_price_is_rejected() {
        let result = serde_json::from_value::<ItemRecord>(json!({
            "id": 1,
            "buy_price": "n/a",
        }));
        assert!(result.is_err());
    }
}
