//! Mock payment checkout: order summaries and the writes that follow a
//! successful payment.
//!
//! Amounts always come from listing rows and the session cart, never from
//! the submitted form. There is no transaction across rows: a failure part
//! way through a cart leaves the earlier orders in place, and those lines
//! are dropped from the cart so a retry does not order them twice.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use farmshare_core::{
    Availability, Cart, CartError, CartItem, EquipmentId, LandListingId, LandStatus, LeaseQuote,
    LeaseStatus, Money, OrderStatus, PaymentKind, ProduceStatus, RentalQuote, RentalStatus,
    quote::LEASE_TERM_MONTHS,
};

use super::listings::ListingService;
use crate::models::{CheckoutDetails, CurrentUser};
use crate::supabase::{
    AccessToken, AvailabilityPatch, BackendError, EQUIPMENT_LISTINGS, EQUIPMENT_RENTALS,
    EquipmentListing, EquipmentRental, LAND_LISTINGS, LandListing, LandStatusPatch, NewEquipmentRental,
    NewOrder, NewPlotLease, ORDERS, Order, PLOT_LEASES, PRODUCE_LISTINGS, PlotLease, Query,
    StockPatch, SupabaseClient,
};

/// Why a checkout could not go ahead.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("invalid item id: {0}")]
    InvalidItem(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("delivery details missing")]
    MissingDeliveryDetails,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("{placed} of {total} orders placed before failure: {source}")]
    PartialOrder {
        placed: usize,
        total: usize,
        source: BackendError,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl CheckoutError {
    /// Message shown in the error notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidItem(_) => "That item could not be found".to_string(),
            Self::Unavailable(msg) => msg.clone(),
            Self::MissingDeliveryDetails => {
                "Please enter a delivery address and phone number first".to_string()
            }
            Self::Cart(CartError::Empty) => "Your cart is empty".to_string(),
            Self::Cart(CartError::UnknownItem(_)) => "Your cart changed, please review it".to_string(),
            Self::PartialOrder {
                placed,
                total,
                source,
            } => format!(
                "{placed} of {total} items were ordered; the rest failed ({}). They are still in your cart.",
                source.user_message()
            ),
            Self::Backend(err) => err.user_message(),
        }
    }

    /// Failures worth reporting, as opposed to visitor mistakes or races.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::PartialOrder { .. }
                | Self::Backend(
                    BackendError::Http(_) | BackendError::Parse(_) | BackendError::Api { .. }
                )
        )
    }
}

/// One row of an order summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub label: String,
    pub value: String,
}

impl SummaryLine {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// What the payment page shows before the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSummary {
    pub kind: PaymentKind,
    /// Listing id for leases and rentals.
    pub item_id: Option<String>,
    pub heading: String,
    pub lines: Vec<SummaryLine>,
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
struct StockRow {
    quantity_available: u32,
}

/// Checkout operations.
pub struct CheckoutService<'a> {
    backend: &'a SupabaseClient,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(backend: &'a SupabaseClient) -> Self {
        Self { backend }
    }

    fn listings(&self) -> ListingService<'a> {
        ListingService::new(self.backend)
    }

    // =========================================================================
    // Summaries
    // =========================================================================

    /// Summary for leasing a plot from `today`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidItem` for a malformed id, `Unavailable` if the plot
    /// is already leased, or the backend error.
    pub async fn lease_summary(
        &self,
        user: &CurrentUser,
        plot_id: &str,
        today: NaiveDate,
    ) -> Result<PaymentSummary, CheckoutError> {
        let plot = self.open_plot(user, plot_id).await?;
        let quote = LeaseQuote::new(plot.price_per_sqft_monthly, plot.available_area_sqft, today);

        Ok(PaymentSummary {
            kind: PaymentKind::Lease,
            item_id: Some(plot.id.to_string()),
            heading: plot.title.clone(),
            lines: vec![
                SummaryLine::new("Location", plot.location.clone()),
                SummaryLine::new("Area", format!("{} sq ft", quote.area_sqft)),
                SummaryLine::new(
                    "Rate",
                    format!("{} per sq ft per month", quote.price_per_sqft_monthly.display()),
                ),
                SummaryLine::new(
                    "Term",
                    format!(
                        "{LEASE_TERM_MONTHS} months, {} to {}",
                        quote.start.format("%d %b %Y"),
                        quote.end.format("%d %b %Y")
                    ),
                ),
                SummaryLine::new("Monthly rent", quote.monthly.display()),
                SummaryLine::new("Rent over the term", quote.term_total().display()),
            ],
            amount: quote.amount_due(),
        })
    }

    /// Summary for renting equipment from `today`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidItem` for a malformed id, `Unavailable` if the item
    /// is not available, or the backend error.
    pub async fn rental_summary(
        &self,
        user: &CurrentUser,
        equipment_id: &str,
        today: NaiveDate,
    ) -> Result<PaymentSummary, CheckoutError> {
        let item = self.available_equipment(user, equipment_id).await?;
        let quote = RentalQuote::new(item.price_per_day, today);

        Ok(PaymentSummary {
            kind: PaymentKind::Equipment,
            item_id: Some(item.id.to_string()),
            heading: item.name.clone(),
            lines: vec![
                SummaryLine::new("Category", item.category.clone()),
                SummaryLine::new("Daily rate", item.price_per_day.display()),
                SummaryLine::new(
                    "Rental period",
                    format!(
                        "{} days, {} to {}",
                        quote.days,
                        quote.start.format("%d %b %Y"),
                        quote.end.format("%d %b %Y")
                    ),
                ),
            ],
            amount: quote.total(),
        })
    }

    /// Summary for the cart.
    ///
    /// # Errors
    ///
    /// Returns `Cart(Empty)` for an empty cart or `MissingDeliveryDetails`
    /// when checkout details were never entered.
    pub fn cart_summary(
        cart: &Cart,
        details: Option<&CheckoutDetails>,
    ) -> Result<PaymentSummary, CheckoutError> {
        let lines = cart.checkout_lines()?;
        let details = details.ok_or(CheckoutError::MissingDeliveryDetails)?;

        let mut summary: Vec<SummaryLine> = lines
            .iter()
            .map(|line| {
                SummaryLine::new(
                    format!("{} x {} {}", line.name, line.quantity, line.unit),
                    line.line_total().display(),
                )
            })
            .collect();
        summary.push(SummaryLine::new("Deliver to", details.address.trim()));
        summary.push(SummaryLine::new("Phone", details.phone.trim()));

        Ok(PaymentSummary {
            kind: PaymentKind::Marketplace,
            item_id: None,
            heading: format!("{} items from the marketplace", cart.item_count()),
            lines: summary,
            amount: cart.total(),
        })
    }

    // =========================================================================
    // Writes after payment
    // =========================================================================

    /// Lease the whole available area of a plot.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the plot was leased in the meantime, or the
    /// backend error.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn lease_plot(
        &self,
        user: &CurrentUser,
        plot_id: &str,
        today: NaiveDate,
    ) -> Result<PlotLease, CheckoutError> {
        let token = AccessToken::User(&user.access_token);
        let plot = self.open_plot(user, plot_id).await?;
        let quote = LeaseQuote::new(plot.price_per_sqft_monthly, plot.available_area_sqft, today);

        let lease: PlotLease = self
            .backend
            .insert(
                PLOT_LEASES,
                &NewPlotLease {
                    land_listing_id: plot.id,
                    user_id: user.id,
                    area_sqft: quote.area_sqft,
                    monthly_price: quote.monthly,
                    start_date: quote.start,
                    end_date: quote.end,
                    status: LeaseStatus::Active,
                },
                token,
            )
            .await?;

        self.backend
            .update(
                &Query::table(LAND_LISTINGS).eq("id", plot.id),
                &LandStatusPatch {
                    available_area_sqft: 0,
                    status: LandStatus::Leased,
                },
                token,
            )
            .await?;

        tracing::info!(lease_id = %lease.id, plot_id = %plot.id, "Plot leased");
        Ok(lease)
    }

    /// Rent a piece of equipment for the standard period.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the item is not available, or the backend
    /// error.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn rent_equipment(
        &self,
        user: &CurrentUser,
        equipment_id: &str,
        today: NaiveDate,
    ) -> Result<EquipmentRental, CheckoutError> {
        let token = AccessToken::User(&user.access_token);
        let item = self.available_equipment(user, equipment_id).await?;
        let quote = RentalQuote::new(item.price_per_day, today);

        let rental: EquipmentRental = self
            .backend
            .insert(
                EQUIPMENT_RENTALS,
                &NewEquipmentRental {
                    equipment_id: item.id,
                    user_id: user.id,
                    start_date: quote.start,
                    end_date: quote.end,
                    total_price: quote.total(),
                    status: RentalStatus::Active,
                },
                token,
            )
            .await?;

        self.backend
            .update(
                &Query::table(EQUIPMENT_LISTINGS).eq("id", item.id),
                &AvailabilityPatch {
                    availability_status: Availability::Rented,
                },
                token,
            )
            .await?;

        tracing::info!(rental_id = %rental.id, equipment_id = %item.id, "Equipment rented");
        Ok(rental)
    }

    /// Order every cart line, then take the sold quantity off the listing.
    ///
    /// Each line leaves the cart as soon as its order row exists. A failed
    /// stock update does not undo the order. Returns the number of orders
    /// placed.
    ///
    /// # Errors
    ///
    /// Returns `Cart(Empty)` for an empty cart. An order insert failing on
    /// the first line is returned as is; later ones become `PartialOrder`.
    #[instrument(skip_all, fields(user_id = %user.id, lines = cart.len()))]
    pub async fn place_orders(
        &self,
        user: &CurrentUser,
        cart: &mut Cart,
        details: &CheckoutDetails,
    ) -> Result<usize, CheckoutError> {
        let token = AccessToken::User(&user.access_token);
        let lines: Vec<CartItem> = cart.checkout_lines()?.to_vec();
        let total = lines.len();
        let address = details.delivery_address();
        let mut placed = 0;

        for line in &lines {
            let order = NewOrder {
                produce_id: line.produce_id,
                buyer_id: user.id,
                quantity: line.quantity,
                total_price: line.line_total(),
                delivery_address: &address,
                status: OrderStatus::Pending,
            };
            if let Err(e) = self.backend.insert::<_, Order>(ORDERS, &order, token).await {
                return Err(partial(placed, total, e));
            }
            cart.mark_ordered(&line.id)?;
            placed += 1;

            // The order stands either way; a stale stock count is logged.
            if let Err(e) = self.take_stock(line, token).await {
                tracing::error!(error = %e, produce_id = %line.produce_id, "Order placed but stock not updated");
            }
        }

        tracing::info!(orders = placed, "Marketplace order placed");
        Ok(placed)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn open_plot(&self, user: &CurrentUser, raw_id: &str) -> Result<LandListing, CheckoutError> {
        let id = LandListingId::parse(raw_id)
            .map_err(|_| CheckoutError::InvalidItem(raw_id.to_string()))?;
        let plot = self
            .listings()
            .plot(id, AccessToken::User(&user.access_token))
            .await?;
        if plot.status != LandStatus::Active || plot.available_area_sqft == 0 {
            return Err(CheckoutError::Unavailable(
                "This plot has already been leased".to_string(),
            ));
        }
        Ok(plot)
    }

    async fn available_equipment(
        &self,
        user: &CurrentUser,
        raw_id: &str,
    ) -> Result<EquipmentListing, CheckoutError> {
        let id = EquipmentId::parse(raw_id)
            .map_err(|_| CheckoutError::InvalidItem(raw_id.to_string()))?;
        let item = self
            .listings()
            .equipment_item(id, AccessToken::User(&user.access_token))
            .await?;
        if item.availability_status != Availability::Available {
            return Err(CheckoutError::Unavailable(format!(
                "{} is not available right now",
                item.name
            )));
        }
        Ok(item)
    }

    async fn take_stock(&self, line: &CartItem, token: AccessToken<'_>) -> Result<(), BackendError> {
        let by_id = Query::table(PRODUCE_LISTINGS).eq("id", line.produce_id);
        let stock: StockRow = self
            .backend
            .select_one(&by_id.clone().select("quantity_available"), token)
            .await?;
        let update = ProduceStatus::after_sale(stock.quantity_available, line.quantity);
        self.backend
            .update(
                &by_id,
                &StockPatch {
                    quantity_available: update.remaining,
                    status: update.status,
                },
                token,
            )
            .await
    }
}

fn partial(placed: usize, total: usize, source: BackendError) -> CheckoutError {
    if placed == 0 {
        CheckoutError::Backend(source)
    } else {
        CheckoutError::PartialOrder {
            placed,
            total,
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use farmshare_core::{NewCartItem, ProduceId};

    use super::*;

    fn cart() -> Cart {
        let mut cart = Cart::new();
        for (id, name, rupees) in [("p1", "Tomatoes", 60), ("p2", "Wild Honey", 350)] {
            cart.add(NewCartItem {
                id: id.to_string(),
                name: name.to_string(),
                price: Money::from_rupees(rupees),
                unit: "kg".to_string(),
                farmer: "Lakshmi".to_string(),
                produce_id: ProduceId::random(),
            });
        }
        cart.add(NewCartItem {
            id: "p1".to_string(),
            name: "Tomatoes".to_string(),
            price: Money::from_rupees(60),
            unit: "kg".to_string(),
            farmer: "Lakshmi".to_string(),
            produce_id: ProduceId::random(),
        });
        cart
    }

    fn details() -> CheckoutDetails {
        CheckoutDetails {
            address: "12 MG Road, Hyderabad".to_string(),
            phone: "9876543210".to_string(),
        }
    }

    #[test]
    fn test_cart_summary_totals_lines() {
        let summary = CheckoutService::cart_summary(&cart(), Some(&details())).unwrap();
        assert_eq!(summary.amount, Money::from_rupees(470));
        assert_eq!(summary.kind, PaymentKind::Marketplace);
        assert_eq!(summary.lines[0].label, "Tomatoes x 2 kg");
        assert_eq!(summary.lines[0].value, "₹120");
        assert!(summary.lines.iter().any(|l| l.label == "Deliver to"));
    }

    #[test]
    fn test_cart_summary_requires_items_and_details() {
        assert!(matches!(
            CheckoutService::cart_summary(&Cart::new(), Some(&details())),
            Err(CheckoutError::Cart(CartError::Empty))
        ));
        assert!(matches!(
            CheckoutService::cart_summary(&cart(), None),
            Err(CheckoutError::MissingDeliveryDetails)
        ));
    }

    #[test]
    fn test_partial_failure_reporting() {
        let err = partial(0, 2, BackendError::NotFound("orders".to_string()));
        assert!(matches!(err, CheckoutError::Backend(_)));

        let err = partial(1, 3, BackendError::RateLimited(2));
        assert!(err.user_message().starts_with("1 of 3 items were ordered"));
    }
}
