//! # Item Records
//!
//! Identity access over the closed set of item kinds.
//!
//! Fixed item types have their own structs; everything else stays a
//! [`DynamicRecord`]. Callers that only need identity information go through
//! [`ItemIdentity`] and never inspect the concrete kind.

use super::DynamicRecord;
use serde::{Deserialize, Serialize};

/// Identity information every item exposes.
pub trait ItemIdentity {
    fn id(&self) -> String;

    fn display_name(&self) -> String;

    fn rarity(&self) -> String;

    /// Short human-readable label used in logs and listings.
    fn label(&self) -> String {
        let rarity = self.rarity();
        if rarity.is_empty() {
            format!("{} ({})", self.display_name(), self.id())
        } else {
            format!("{} ({}, {})", self.display_name(), self.id(), rarity)
        }
    }
}

/// A consumable that restores hunger and thirst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: String,
    pub display_name: String,
    pub rarity: String,
    pub hunger_restore: i64,
    pub thirst_restore: i64,
    pub weight: f64,
}

/// A melee or ranged weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponItem {
    pub id: String,
    pub display_name: String,
    pub rarity: String,
    pub min_damage: i64,
    pub max_damage: i64,
    pub durability: i64,
    pub weight: f64,
}

impl ItemIdentity for FoodItem {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn display_name(&self) -> String {
        self.display_name.clone()
    }

    fn rarity(&self) -> String {
        self.rarity.clone()
    }
}

impl ItemIdentity for WeaponItem {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn display_name(&self) -> String {
        self.display_name.clone()
    }

    fn rarity(&self) -> String {
        self.rarity.clone()
    }
}

impl ItemIdentity for DynamicRecord {
    fn id(&self) -> String {
        DynamicRecord::id(self)
    }

    fn display_name(&self) -> String {
        self.get_string("displayName", "")
    }

    fn rarity(&self) -> String {
        self.get_string("rarity", "")
    }
}

/// Any imported item, resolved to its concrete kind where one exists.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemRecord {
    Food(FoodItem),
    Weapon(WeaponItem),
    Dynamic(DynamicRecord),
}

impl ItemRecord {
    /// Resolves a record by its item type name.
    ///
    /// `Food` and `Weapon` become fixed structs with defaults for missing or
    /// unparseable values; any other type stays dynamic.
    ///
    /// # Examples
    ///
    /// ```
    /// use itemforge::{parse_object_fragment, DynamicRecord, ItemIdentity, ItemRecord};
    ///
    /// let fields = parse_object_fragment(r#"{"id":"w1","displayName":"Axe","minDamage":3}"#);
    /// let record = DynamicRecord::build(fields, "melee", "Weapon").unwrap();
    /// let item = ItemRecord::from_dynamic(record);
    /// assert!(matches!(item, ItemRecord::Weapon(ref w) if w.min_damage == 3));
    /// assert_eq!(item.display_name(), "Axe");
    /// ```
    pub fn from_dynamic(record: DynamicRecord) -> Self {
        match record.item_type_name.as_str() {
            "Food" => ItemRecord::Food(FoodItem {
                id: record.id(),
                display_name: record.get_string("displayName", ""),
                rarity: record.get_string("rarity", ""),
                hunger_restore: record.get_int("hungerRestore", 0),
                thirst_restore: record.get_int("thirstRestore", 0),
                weight: record.get_float("weight", 0.0),
            }),
            "Weapon" => ItemRecord::Weapon(WeaponItem {
                id: record.id(),
                display_name: record.get_string("displayName", ""),
                rarity: record.get_string("rarity", ""),
                min_damage: record.get_int("minDamage", 0),
                max_damage: record.get_int("maxDamage", 0),
                durability: record.get_int("durability", 100),
                weight: record.get_float("weight", 0.0),
            }),
            _ => ItemRecord::Dynamic(record),
        }
    }
}

impl ItemIdentity for ItemRecord {
    fn id(&self) -> String {
        match self {
            ItemRecord::Food(item) => item.id(),
            ItemRecord::Weapon(item) => item.id(),
            ItemRecord::Dynamic(item) => ItemIdentity::id(item),
        }
    }

    fn display_name(&self) -> String {
        match self {
            ItemRecord::Food(item) => item.display_name(),
            ItemRecord::Weapon(item) => item.display_name(),
            ItemRecord::Dynamic(item) => item.display_name(),
        }
    }

    fn rarity(&self) -> String {
        match self {
            ItemRecord::Food(item) => item.rarity(),
            ItemRecord::Weapon(item) => item.rarity(),
            ItemRecord::Dynamic(item) => item.rarity(),
        }
    }
}
