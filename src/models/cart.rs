use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::models::SnapshotResult;

/// Name of the snapshot record that holds the cart within a storage origin
pub const CART_SNAPSHOT_KEY: &str = "laundry_cart";

/// Opaque identifier of a priced service, numeric or textual.
///
/// `1` and `"1"` are different identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceId::Number(id) => write!(f, "{}", id),
            ServiceId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for ServiceId {
    fn from(id: i64) -> Self {
        ServiceId::Number(id)
    }
}

impl From<i32> for ServiceId {
    fn from(id: i32) -> Self {
        ServiceId::Number(i64::from(id))
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        ServiceId::Text(id.to_string())
    }
}

/// How a service's price is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitType {
    Kg,
    Piece,
    #[default]
    Item,
}

impl UnitType {
    /// Lenient parse used at the catalog boundary
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "KG" => Some(UnitType::Kg),
            "PIECE" => Some(UnitType::Piece),
            "ITEM" => Some(UnitType::Item),
            _ => None,
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitType::Kg => write!(f, "KG"),
            UnitType::Piece => write!(f, "PIECE"),
            UnitType::Item => write!(f, "ITEM"),
        }
    }
}

/// One entry in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub service_id: ServiceId,
    pub name: String,
    pub category: String,
    pub method: String,
    pub unit_type: UnitType,
    pub price: Decimal,
    pub quantity: u32,
    pub total_price: Decimal,
}

impl LineItem {
    /// Whether this item has the given identity key
    pub fn matches(&self, service_id: &ServiceId, method: &str) -> bool {
        self.service_id == *service_id && self.method == method
    }

    /// `price * quantity`, `None` when it does not fit a `Decimal`
    fn line_total(price: Decimal, quantity: u32) -> Option<Decimal> {
        price.checked_mul(Decimal::from(quantity))
    }
}

/// Normalized input for adding a service to the cart
#[derive(Debug, Clone, PartialEq)]
pub struct CartItemCandidate {
    pub service_id: ServiceId,
    pub name: String,
    pub category: String,
    pub method: String,
    pub unit_type: UnitType,
    pub price: Decimal,
    pub quantity: u32,
}

impl CartItemCandidate {
    pub fn new(service_id: impl Into<ServiceId>, method: &str, price: Decimal) -> Self {
        Self {
            service_id: service_id.into(),
            name: String::new(),
            category: String::new(),
            method: method.to_string(),
            unit_type: UnitType::default(),
            price,
            quantity: 1,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_unit_type(mut self, unit_type: UnitType) -> Self {
        self.unit_type = unit_type;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    fn into_line_item(self) -> Option<LineItem> {
        let quantity = self.quantity.max(1);
        let total_price = LineItem::line_total(self.price, quantity)?;
        Some(LineItem {
            service_id: self.service_id,
            name: self.name,
            category: self.category,
            method: self.method,
            unit_type: self.unit_type,
            price: self.price,
            quantity,
            total_price,
        })
    }
}

/// A state transition on the cart
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    AddItem(CartItemCandidate),
    RemoveItem { index: usize },
    UpdateQuantity { index: usize, quantity: i64 },
    Clear,
}

impl CartAction {
    /// Operation label used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            CartAction::AddItem(_) => "add_item",
            CartAction::RemoveItem { .. } => "remove_item",
            CartAction::UpdateQuantity { .. } => "update_quantity",
            CartAction::Clear => "clear",
        }
    }
}

/// Ordered collection of line items making up a pending order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a single transition. Every transition leaves the cart consistent.
    ///
    /// A step whose line total or cart total would not fit a `Decimal` is
    /// dropped as a whole and the cart stays as it was.
    pub fn apply(&mut self, action: CartAction) {
        let operation = action.name();
        let applied = match action {
            CartAction::AddItem(candidate) => self.add_item(candidate),
            CartAction::RemoveItem { index } => {
                self.remove_item(index);
                Some(())
            }
            CartAction::UpdateQuantity { index, quantity } => {
                self.update_quantity(index, quantity)
            }
            CartAction::Clear => {
                self.items.clear();
                Some(())
            }
        };

        if applied.is_none() {
            warn!(operation, "Cart amount out of range, change ignored");
        }
    }

    fn add_item(&mut self, candidate: CartItemCandidate) -> Option<()> {
        let added = candidate.quantity.max(1);
        let existing = self
            .items
            .iter()
            .position(|item| item.matches(&candidate.service_id, &candidate.method));

        match existing {
            Some(index) => {
                let quantity = self.items[index].quantity.saturating_add(added);
                self.set_quantity(index, quantity)
            }
            None => {
                let item = candidate.into_line_item()?;
                self.total_excluding(None)?.checked_add(item.total_price)?;
                self.items.push(item);
                Some(())
            }
        }
    }

    /// Set a line's quantity and total together, or leave it untouched
    fn set_quantity(&mut self, index: usize, quantity: u32) -> Option<()> {
        let total_price = LineItem::line_total(self.items.get(index)?.price, quantity)?;
        self.total_excluding(Some(index))?.checked_add(total_price)?;

        let item = &mut self.items[index];
        item.quantity = quantity;
        item.total_price = total_price;
        Some(())
    }

    fn total_excluding(&self, skip: Option<usize>) -> Option<Decimal> {
        self.items
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != skip)
            .try_fold(Decimal::ZERO, |sum, (_, item)| {
                sum.checked_add(item.total_price)
            })
    }

    // Out-of-range indices remove nothing.
    fn remove_item(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
        }
    }

    fn update_quantity(&mut self, index: usize, quantity: i64) -> Option<()> {
        if quantity <= 0 {
            self.remove_item(index);
            return Some(());
        }

        if index >= self.items.len() {
            return Some(());
        }
        self.set_quantity(index, u32::try_from(quantity).unwrap_or(u32::MAX))
    }

    /// Line items in cart order
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Get the item at a position
    pub fn get(&self, index: usize) -> Option<&LineItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all quantities
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of all cached line totals
    pub fn total_amount(&self) -> Decimal {
        // `apply` and `from_snapshot` keep the sum within range
        self.total_excluding(None).unwrap_or(Decimal::MAX)
    }

    /// Serialize the cart into its snapshot representation
    pub fn to_snapshot(&self) -> SnapshotResult<String> {
        Ok(serde_json::to_string(&self.items)?)
    }

    /// Restore a cart from a snapshot.
    ///
    /// Entries without a `totalPrice` get `price * quantity`; entries with a
    /// non-positive quantity are dropped, as are entries that would push the
    /// cart total out of range.
    pub fn from_snapshot(payload: &str) -> SnapshotResult<Self> {
        let stored: Vec<StoredLineItem> = serde_json::from_str(payload)?;

        let mut total = Decimal::ZERO;
        let mut items = Vec::with_capacity(stored.len());
        for item in stored.into_iter().filter_map(StoredLineItem::restore) {
            match total.checked_add(item.total_price) {
                Some(sum) => {
                    total = sum;
                    items.push(item);
                }
                None => warn!(
                    service_id = %item.service_id,
                    "Dropping restored line, cart total out of range"
                ),
            }
        }
        Ok(Self { items })
    }
}

/// Snapshot entry as found on disk, tolerant of older or hand-written data
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLineItem {
    service_id: ServiceId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    unit_type: UnitType,
    price: Decimal,
    quantity: i64,
    #[serde(default)]
    total_price: Option<Decimal>,
}

impl StoredLineItem {
    fn restore(self) -> Option<LineItem> {
        if self.quantity < 1 {
            return None;
        }
        let quantity = u32::try_from(self.quantity).unwrap_or(u32::MAX);
        let total_price = match self.total_price {
            Some(total_price) => total_price,
            None => LineItem::line_total(self.price, quantity)?,
        };

        Some(LineItem {
            service_id: self.service_id,
            name: self.name,
            category: self.category,
            method: self.method,
            unit_type: self.unit_type,
            price: self.price,
            quantity,
            total_price,
        })
    }
}

/// Read-only view of a cart returned by the cart APIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub item_count: u64,
    pub total_amount: Decimal,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            total_amount: cart.total_amount(),
        }
    }
}
