//! Field capability table: every field name a query may filter or sort by,
//! mapped to a typed accessor. Filtering and sorting both resolve names here.

use rust_decimal::Decimal;

use crate::derived;
use crate::models::ItemRecord;

/// Accessor for a numeric field, stored or derived.
pub type NumberAccessor = fn(&ItemRecord) -> Option<Decimal>;

/// Categorical string fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Name,
    Rarity,
    Type,
    WeaponType,
    StatName,
    UpgradeName,
    FirstAdded,
    LastUpdate,
}

impl TextField {
    const ALL: [(&'static str, TextField); 8] = [
        ("name", TextField::Name),
        ("rarity", TextField::Rarity),
        ("type", TextField::Type),
        ("weapon_type", TextField::WeaponType),
        ("stat_name", TextField::StatName),
        ("upgrade_name", TextField::UpgradeName),
        ("first_added", TextField::FirstAdded),
        ("last_update", TextField::LastUpdate),
    ];

    pub fn get<'a>(&self, item: &'a ItemRecord) -> Option<&'a str> {
        let value = match self {
            TextField::Name => &item.name,
            TextField::Rarity => &item.rarity,
            TextField::Type => &item.item_type,
            TextField::WeaponType => &item.weapon_type,
            TextField::StatName => &item.stat_name,
            TextField::UpgradeName => &item.upgrade_name,
            TextField::FirstAdded => &item.first_added,
            TextField::LastUpdate => &item.last_update,
        };
        value.as_deref()
    }
}

/// A numeric field a query can range-filter or sort on.
#[derive(Clone, Copy)]
pub struct NumberField {
    pub name: &'static str,
    pub derived: bool,
    pub get: NumberAccessor,
}

impl std::fmt::Debug for NumberField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NumberField")
            .field("name", &self.name)
            .field("derived", &self.derived)
            .finish()
    }
}

const fn stored(name: &'static str, get: NumberAccessor) -> NumberField {
    NumberField { name, derived: false, get }
}

const fn computed(name: &'static str, get: NumberAccessor) -> NumberField {
    NumberField { name, derived: true, get }
}

pub static NUMBER_FIELDS: &[NumberField] = &[
    stored("id", |i| Some(Decimal::from(i.id))),
    stored("level", |i| i.level),
    stored("buy_price", |i| i.buy_price),
    stored("sell_price", |i| i.sell_price),
    stored("buy_quantity", |i| i.buy_quantity),
    stored("sell_quantity", |i| i.sell_quantity),
    stored("one_d_sell_price_avg", |i| i.one_d_sell_price_avg),
    stored("one_d_sell_sold", |i| i.one_d_sell_sold),
    stored("one_d_sell_listed", |i| i.one_d_sell_listed),
    stored("one_d_sell_delisted", |i| i.one_d_sell_delisted),
    stored("one_d_sell_value", |i| i.one_d_sell_value),
    stored("one_d_sell_quantity_avg", |i| i.one_d_sell_quantity_avg),
    stored("two_d_sell_price_avg", |i| i.two_d_sell_price_avg),
    stored("two_d_sell_sold", |i| i.two_d_sell_sold),
    stored("two_d_sell_listed", |i| i.two_d_sell_listed),
    stored("two_d_sell_delisted", |i| i.two_d_sell_delisted),
    stored("two_d_sell_value", |i| i.two_d_sell_value),
    stored("two_d_sell_quantity_avg", |i| i.two_d_sell_quantity_avg),
    stored("seven_d_sell_price_avg", |i| i.seven_d_sell_price_avg),
    stored("seven_d_sell_sold", |i| i.seven_d_sell_sold),
    stored("seven_d_sell_listed", |i| i.seven_d_sell_listed),
    stored("seven_d_sell_delisted", |i| i.seven_d_sell_delisted),
    stored("seven_d_sell_value", |i| i.seven_d_sell_value),
    stored("seven_d_sell_quantity_avg", |i| i.seven_d_sell_quantity_avg),
    stored("one_m_sell_price_avg", |i| i.one_m_sell_price_avg),
    stored("one_m_sell_sold", |i| i.one_m_sell_sold),
    stored("one_m_sell_listed", |i| i.one_m_sell_listed),
    stored("one_m_sell_delisted", |i| i.one_m_sell_delisted),
    stored("one_m_sell_value", |i| i.one_m_sell_value),
    stored("one_m_sell_quantity_avg", |i| i.one_m_sell_quantity_avg),
    stored("one_d_buy_price_avg", |i| i.one_d_buy_price_avg),
    stored("one_d_buy_sold", |i| i.one_d_buy_sold),
    stored("one_d_buy_listed", |i| i.one_d_buy_listed),
    stored("one_d_buy_delisted", |i| i.one_d_buy_delisted),
    stored("one_d_buy_value", |i| i.one_d_buy_value),
    stored("one_d_buy_quantity_avg", |i| i.one_d_buy_quantity_avg),
    stored("two_d_buy_price_avg", |i| i.two_d_buy_price_avg),
    stored("two_d_buy_sold", |i| i.two_d_buy_sold),
    stored("two_d_buy_listed", |i| i.two_d_buy_listed),
    stored("two_d_buy_delisted", |i| i.two_d_buy_delisted),
    stored("two_d_buy_value", |i| i.two_d_buy_value),
    stored("two_d_buy_quantity_avg", |i| i.two_d_buy_quantity_avg),
    stored("seven_d_buy_price_avg", |i| i.seven_d_buy_price_avg),
    stored("seven_d_buy_sold", |i| i.seven_d_buy_sold),
    stored("seven_d_buy_listed", |i| i.seven_d_buy_listed),
    stored("seven_d_buy_delisted", |i| i.seven_d_buy_delisted),
    stored("seven_d_buy_value", |i| i.seven_d_buy_value),
    stored("seven_d_buy_quantity_avg", |i| i.seven_d_buy_quantity_avg),
    stored("one_m_buy_price_avg", |i| i.one_m_buy_price_avg),
    stored("one_m_buy_sold", |i| i.one_m_buy_sold),
    stored("one_m_buy_listed", |i| i.one_m_buy_listed),
    stored("one_m_buy_delisted", |i| i.one_m_buy_delisted),
    stored("one_m_buy_value", |i| i.one_m_buy_value),
    stored("one_m_buy_quantity_avg", |i| i.one_m_buy_quantity_avg),
    stored("one_d_sell_delisted_value", |i| i.one_d_sell_delisted_value),
    stored("two_d_sell_delisted_value", |i| i.two_d_sell_delisted_value),
    stored("seven_d_sell_delisted_value", |i| i.seven_d_sell_delisted_value),
    stored("one_m_sell_delisted_value", |i| i.one_m_sell_delisted_value),
    computed("profit", derived::profit),
    computed("roi", derived::roi),
    computed("sell_tax", derived::sell_tax),
    computed("buy_tax", derived::buy_tax),
    computed("total_tax", derived::total_tax),
    computed("total_sold", derived::total_sold),
    computed("total_value", derived::total_value),
    computed("total_listed", derived::total_listed),
    computed("total_delisted", derived::total_delisted),
    computed("total_delisted_value", derived::total_delisted_value),
    computed("buy_sold_change", derived::buy_sold_change),
    computed("sell_sold_change", derived::sell_sold_change),
    computed("total_sold_change", derived::total_sold_change),
    computed("buy_value_change", derived::buy_value_change),
    computed("sell_value_change", derived::sell_value_change),
    computed("total_value_change", derived::total_value_change),
    computed("buy_listed_change", derived::buy_listed_change),
    computed("sell_listed_change", derived::sell_listed_change),
    computed("total_listed_change", derived::total_listed_change),
    computed("buy_delisted_change", derived::buy_delisted_change),
    computed("sell_delisted_change", derived::sell_delisted_change),
    computed("total_delisted_change", derived::total_delisted_change),
];

/// A resolved field name.
#[derive(Debug, Clone, Copy)]
pub enum Field {
    Text(TextField),
    Number(NumberField),
}

/// The value of one field on one item, as used for sort comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(Decimal),
}

impl Field {
    pub fn lookup(name: &str) -> Option<Field> {
        if let Some((_, text)) = TextField::ALL.iter().find(|(n, _)| *n == name) {
            return Some(Field::Text(*text));
        }
        number_field(name).map(Field::Number)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Field::Text(text) => TextField::ALL
                .iter()
                .find(|(_, t)| t == text)
                .map(|(n, _)| *n)
                .unwrap_or("name"),
            Field::Number(number) => number.name,
        }
    }

    pub fn value<'a>(&self, item: &'a ItemRecord) -> Option<FieldValue<'a>> {
        match self {
            Field::Text(text) => text.get(item).map(FieldValue::Text),
            Field::Number(number) => (number.get)(item).map(FieldValue::Number),
        }
    }
}

pub fn number_field(name: &str) -> Option<NumberField> {
    NUMBER_FIELDS.iter().find(|f| f.name == name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = NUMBER_FIELDS.iter().map(|f| f.name).collect();
        names.extend(TextField::ALL.iter().map(|(n, _)| *n));
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_every_window_stat_is_addressable() {
        for window in ["one_d", "two_d", "seven_d", "one_m"] {
            for side in ["buy", "sell"] {
                for metric in ["price_avg", "sold", "listed", "delisted", "value", "quantity_avg"] {
                    let name = format!("{window}_{side}_{metric}");
                    assert!(number_field(&name).is_some(), "missing {name}");
                }
            }
            assert!(number_field(&format!("{window}_sell_delisted_value")).is_some());
        }
    }

    #[test]
    fn test_stored_and_derived_accessors() {
        let mut item = ItemRecord::new(7);
        item.name = Some("Mystic Coin".into());
        item.sell_price = Some(Decimal::from(200));
        item.buy_price = Some(Decimal::from(100));
        item.one_d_sell_sold = Some(Decimal::from(12));

        let sold = Field::lookup("one_d_sell_sold").unwrap();
        assert_eq!(sold.value(&item), Some(FieldValue::Number(Decimal::from(12))));

        let profit = Field::lookup("profit").unwrap();
        assert_eq!(profit.value(&item), Some(FieldValue::Number(Decimal::from(65))));

        let name = Field::lookup("name").unwrap();
        assert_eq!(name.value(&item), Some(FieldValue::Text("Mystic Coin")));
        assert_eq!(name.name(), "name");

        assert!(Field::lookup("expected_profit").is_none());
    }
}
