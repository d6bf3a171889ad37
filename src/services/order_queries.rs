//! Read-side projections over orders: a seller's incoming orders, customers
//! and sales stats, and a buyer's own order history.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use mongodb::bson::oid::ObjectId;

use crate::database::store::{MarketStore, OrderFilter};
use crate::dtos::order_dtos::{
    BuyerOrderItemView, BuyerOrderView, CustomerView, DailyRevenue, PartyView, SellerOrderItemView,
    SellerOrderView, SellerStats, TopProduct,
};
use crate::errors::{AppError, Result};
use crate::models::order::Order;
use crate::models::product::Product;
use crate::models::user::{Claims, User};

pub const DEFAULT_STATS_DAYS: i64 = 30;
pub const MAX_STATS_DAYS: i64 = 365;
pub const TOP_PRODUCTS: usize = 5;

const FALLBACK_PRODUCT_NAME: &str = "Product";
const FALLBACK_PRODUCT_TYPE: &str = "general";
const UNKNOWN_BUYER: &str = "Unknown buyer";

#[derive(Clone)]
pub struct OrderQueries {
    store: Arc<dyn MarketStore>,
}

impl OrderQueries {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        OrderQueries { store }
    }

    /// Seller routes are open to the seller themselves and to admins.
    pub fn authorize_seller_view(actor: &Claims, seller_id: &str) -> Result<ObjectId> {
        let seller_id = ObjectId::parse_str(seller_id)?;
        if actor.is_admin() || actor.user_id()? == seller_id {
            Ok(seller_id)
        } else {
            Err(AppError::forbidden("You can only view your own orders"))
        }
    }

    pub async fn seller_orders(&self, seller_id: ObjectId) -> Result<Vec<SellerOrderView>> {
        let orders = self
            .store
            .list_orders(&OrderFilter {
                seller_id: Some(seller_id),
                ..Default::default()
            })
            .await?;

        let buyers = self.users_by_id(orders.iter().map(|o| o.buyer_id)).await?;
        let products = self.products_by_id(&orders).await?;

        Ok(orders
            .into_iter()
            .map(|order| SellerOrderView {
                id: order.id.to_hex(),
                buyer: buyers.get(&order.buyer_id).map(PartyView::from),
                items: order
                    .items
                    .iter()
                    .map(|item| SellerOrderItemView {
                        product_id: item.product_id.to_hex(),
                        name: products
                            .get(&item.product_id)
                            .map(|p| p.name.clone())
                            .unwrap_or_else(|| item.name.clone()),
                        quantity: item.quantity,
                        price: item.unit_price,
                    })
                    .collect(),
                total_amount: order.total_amount,
                status: order.status,
                payment_method: order.payment_method,
                transaction_id: order.transaction_id,
                created_at: order.created_at,
            })
            .collect())
    }

    pub async fn unique_customers(&self, seller_id: ObjectId) -> Result<Vec<CustomerView>> {
        let orders = self
            .store
            .list_orders(&OrderFilter {
                seller_id: Some(seller_id),
                ..Default::default()
            })
            .await?;
        let buyers = self.users_by_id(orders.iter().map(|o| o.buyer_id)).await?;
        Ok(collect_customers(&orders, &buyers))
    }

    pub async fn seller_stats(&self, seller_id: ObjectId, days: Option<i64>) -> Result<SellerStats> {
        let days = days.unwrap_or(DEFAULT_STATS_DAYS);
        if !(1..=MAX_STATS_DAYS).contains(&days) {
            return Err(AppError::invalid_input(format!(
                "days must be between 1 and {}",
                MAX_STATS_DAYS
            )));
        }

        let orders = self
            .store
            .list_orders(&OrderFilter {
                seller_id: Some(seller_id),
                created_since: Some(Utc::now() - Duration::days(days)),
                ..Default::default()
            })
            .await?;
        Ok(aggregate_stats(&orders, days))
    }

    pub async fn buyer_orders(&self, buyer_id: ObjectId) -> Result<Vec<BuyerOrderView>> {
        let orders = self
            .store
            .list_orders(&OrderFilter {
                buyer_id: Some(buyer_id),
                ..Default::default()
            })
            .await?;

        let sellers = self.users_by_id(orders.iter().map(|o| o.seller_id)).await?;
        let products = self.products_by_id(&orders).await?;

        Ok(orders
            .into_iter()
            .map(|order| BuyerOrderView {
                id: order.id.to_hex(),
                seller: sellers.get(&order.seller_id).map(PartyView::from),
                items: order
                    .items
                    .iter()
                    .map(|item| match products.get(&item.product_id) {
                        Some(product) => BuyerOrderItemView {
                            product_id: item.product_id.to_hex(),
                            name: product.name.clone(),
                            price: item.unit_price,
                            product_type: product.product_type.to_string(),
                            quantity: item.quantity,
                        },
                        None => BuyerOrderItemView {
                            product_id: item.product_id.to_hex(),
                            name: FALLBACK_PRODUCT_NAME.to_string(),
                            price: 0.0,
                            product_type: FALLBACK_PRODUCT_TYPE.to_string(),
                            quantity: item.quantity,
                        },
                    })
                    .collect(),
                total_amount: order.total_amount,
                status: order.status,
                payment_method: order.payment_method,
                transaction_id: order.transaction_id,
                created_at: order.created_at,
            })
            .collect())
    }

    async fn users_by_id(
        &self,
        ids: impl Iterator<Item = ObjectId>,
    ) -> Result<HashMap<ObjectId, User>> {
        let ids: Vec<ObjectId> = ids.collect::<HashSet<_>>().into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .store
            .find_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }

    async fn products_by_id(&self, orders: &[Order]) -> Result<HashMap<ObjectId, Product>> {
        let ids: Vec<ObjectId> = orders
            .iter()
            .flat_map(|o| o.items.iter().map(|i| i.product_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .store
            .find_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect())
    }
}

/// De-duplicates buyers by id. Orders are walked oldest to newest, so the
/// most recent order decides which buyer record is reported. Output is most
/// recent customer first.
pub fn collect_customers(orders: &[Order], buyers: &HashMap<ObjectId, User>) -> Vec<CustomerView> {
    let mut chronological: Vec<&Order> = orders.iter().collect();
    chronological.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

    let mut index: HashMap<ObjectId, usize> = HashMap::new();
    let mut customers: Vec<CustomerView> = Vec::new();

    for order in chronological {
        let (name, phone) = buyers
            .get(&order.buyer_id)
            .map(|u| (u.name.clone(), u.phone.clone()))
            .unwrap_or_else(|| (UNKNOWN_BUYER.to_string(), String::new()));

        match index.get(&order.buyer_id) {
            Some(&i) => {
                let customer = &mut customers[i];
                customer.name = name;
                customer.phone = phone;
                customer.order_count += 1;
                customer.last_order_at = order.created_at;
            }
            None => {
                index.insert(order.buyer_id, customers.len());
                customers.push(CustomerView {
                    id: order.buyer_id.to_hex(),
                    name,
                    phone,
                    order_count: 1,
                    last_order_at: order.created_at,
                });
            }
        }
    }

    customers.sort_by(|a, b| b.last_order_at.cmp(&a.last_order_at));
    customers
}

/// Buckets revenue by UTC calendar day and by product, skipping orders that
/// never turned into a sale.
pub fn aggregate_stats(orders: &[Order], days: i64) -> SellerStats {
    let mut by_day: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_product: HashMap<ObjectId, TopProduct> = HashMap::new();
    let mut order_count = 0;
    let mut total_revenue = 0.0;

    for order in orders.iter().filter(|o| o.status.counts_as_revenue()) {
        order_count += 1;
        let day = order.created_at.format("%Y-%m-%d").to_string();

        for item in &order.items {
            let revenue = item.line_total();
            total_revenue += revenue;
            *by_day.entry(day.clone()).or_insert(0.0) += revenue;

            let entry = by_product.entry(item.product_id).or_insert_with(|| TopProduct {
                product_id: item.product_id.to_hex(),
                name: item.name.clone(),
                quantity: 0,
                revenue: 0.0,
            });
            entry.quantity += item.quantity;
            entry.revenue += revenue;
        }
    }

    let mut top_products: Vec<TopProduct> = by_product.into_values().collect();
    top_products.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| b.revenue.total_cmp(&a.revenue))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    top_products.truncate(TOP_PRODUCTS);

    SellerStats {
        days,
        order_count,
        total_revenue,
        revenue_by_day: by_day
            .into_iter()
            .map(|(date, revenue)| DailyRevenue { date, revenue })
            .collect(),
        top_products,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{OrderItem, OrderStatus};
    use crate::models::user::Role;
    use chrono::{DateTime, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
    }

    fn order(buyer: ObjectId, created_at: DateTime<Utc>, lines: &[(ObjectId, i64, f64)]) -> Order {
        let items = lines
            .iter()
            .map(|(id, quantity, price)| OrderItem {
                product_id: *id,
                name: format!("item-{}", id.to_hex()),
                quantity: *quantity,
                unit_price: *price,
            })
            .collect();
        let mut order = Order::new(buyer, ObjectId::new(), items);
        order.status = OrderStatus::Success;
        order.created_at = created_at;
        order
    }

    fn buyer(name: &str) -> User {
        User::new(name.into(), format!("07{:08}", name.len()), "x".into(), Role::Buyer)
    }

    #[test]
    fn customers_are_deduplicated_by_buyer() {
        let a = buyer("Achieng");
        let b = buyer("Baraka");
        let p = ObjectId::new();
        let orders = vec![
            order(a.id, at(1, 8), &[(p, 1, 10.0)]),
            order(b.id, at(2, 8), &[(p, 1, 10.0)]),
            order(a.id, at(3, 8), &[(p, 1, 10.0)]),
        ];
        let users: HashMap<ObjectId, User> =
            [(a.id, a.clone()), (b.id, b.clone())].into_iter().collect();

        let customers = collect_customers(&orders, &users);
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].id, a.id.to_hex());
        assert_eq!(customers[0].order_count, 2);
        assert_eq!(customers[0].last_order_at, at(3, 8));
        assert_eq!(customers[1].name, "Baraka");
    }

    #[test]
    fn unresolved_buyers_are_still_counted() {
        let ghost = ObjectId::new();
        let orders = vec![order(ghost, at(1, 8), &[(ObjectId::new(), 1, 10.0)])];
        let customers = collect_customers(&orders, &HashMap::new());
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].name, UNKNOWN_BUYER);
    }

    #[test]
    fn same_day_revenue_lands_in_one_bucket() {
        let p = ObjectId::new();
        let orders = vec![
            order(ObjectId::new(), at(5, 7), &[(p, 2, 50.0)]),
            order(ObjectId::new(), at(5, 18), &[(p, 1, 50.0)]),
            order(ObjectId::new(), at(6, 9), &[(p, 4, 50.0)]),
        ];
        let stats = aggregate_stats(&orders, 30);
        assert_eq!(
            stats.revenue_by_day,
            vec![
                DailyRevenue { date: "2026-10-05".into(), revenue: 150.0 },
                DailyRevenue { date: "2026-10-06".into(), revenue: 200.0 },
            ]
        );
        assert_eq!(stats.total_revenue, 350.0);
        assert_eq!(stats.order_count, 3);
    }

    #[test]
    fn failed_and_declined_orders_are_ignored() {
        let p = ObjectId::new();
        let mut failed = order(ObjectId::new(), at(5, 7), &[(p, 2, 50.0)]);
        failed.status = OrderStatus::Failed;
        let mut declined = order(ObjectId::new(), at(5, 8), &[(p, 2, 50.0)]);
        declined.status = OrderStatus::Declined;
        let kept = order(ObjectId::new(), at(5, 9), &[(p, 1, 50.0)]);

        let stats = aggregate_stats(&[failed, declined, kept], 30);
        assert_eq!(stats.order_count, 1);
        assert_eq!(stats.total_revenue, 50.0);
    }

    #[test]
    fn top_products_are_capped_and_ranked_by_quantity() {
        let ids: Vec<ObjectId> = (0..7).map(|_| ObjectId::new()).collect();
        let lines: Vec<(ObjectId, i64, f64)> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i as i64 + 1, 10.0))
            .collect();
        let stats = aggregate_stats(&[order(ObjectId::new(), at(1, 1), &lines)], 30);

        assert_eq!(stats.top_products.len(), TOP_PRODUCTS);
        let quantities: Vec<i64> = stats.top_products.iter().map(|p| p.quantity).collect();
        assert_eq!(quantities, vec![7, 6, 5, 4, 3]);
        assert_eq!(stats.top_products[0].product_id, ids[6].to_hex());
    }
}
