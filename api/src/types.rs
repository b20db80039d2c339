//! Wire types for the venue API.
//!
//! Field names follow the server's camelCase JSON, including its historical
//! spellings (`ticketbundels`, `selectedBundel`). Most fields are lenient
//! (`#[serde(default)]`) because the server omits empty values.

use crate::money::Money;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Venue settings
// ============================================================================

/// Venue and event settings (single active record)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Server id
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Venue name
    pub location_name: String,
    /// Street address
    pub address: String,
    /// First event day (`YYYY-MM-DD`)
    pub start_date: Option<String>,
    /// Last event day (`YYYY-MM-DD`)
    pub end_date: Option<String>,
    /// Unit ticket price
    pub ticket_price: Money,
    /// Unit socks price
    pub socks_price: Money,
    /// Cancellation insurance fee per ticket
    pub cancellation_fee: Money,
}

// ============================================================================
// Time slots
// ============================================================================

/// Availability class shown next to a slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// Plenty of room
    Few,
    /// Fewer than ten places left
    Full,
    /// Fully booked
    VeryFull,
}

impl SlotStatus {
    /// Classify from `(available_tickets, is_fully_booked)`
    #[must_use]
    pub const fn classify(available_tickets: u32, is_fully_booked: bool) -> Self {
        if is_fully_booked {
            Self::VeryFull
        } else if available_tickets < 10 {
            Self::Full
        } else {
            Self::Few
        }
    }
}

/// A bookable date and time window
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeSlot {
    /// Server id
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Day (`YYYY-MM-DD`)
    pub date: String,
    /// Start time (`HH:MM`)
    pub start_time: String,
    /// End time (`HH:MM`)
    pub end_time: String,
    /// Capacity
    pub max_tickets: u32,
    /// Tickets sold so far
    pub total_booked: u32,
    /// Remaining places
    pub available_tickets: u32,
    /// Server flag for a full slot
    pub is_fully_booked: bool,
}

impl TimeSlot {
    /// Derived availability class
    #[must_use]
    pub const fn status(&self) -> SlotStatus {
        SlotStatus::classify(self.available_tickets, self.is_fully_booked)
    }

    /// Whether this slot belongs to `date`
    #[must_use]
    pub fn is_on(&self, date: NaiveDate) -> bool {
        self.date == format_date(date)
    }

    /// Local start of the slot, if date and time parse
    #[must_use]
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;
        let time = parse_time(&self.start_time)?;
        Some(date.and_time(time))
    }
}

/// Create or update a single slot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotInput {
    /// Day (`YYYY-MM-DD`)
    pub date: String,
    /// Start time (`HH:MM`)
    pub start_time: String,
    /// End time (`HH:MM`)
    pub end_time: String,
    /// Capacity
    pub max_tickets: u32,
}

/// Which days a bulk template applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    /// Monday to Friday
    Weekday,
    /// Saturday and Sunday
    Weekend,
}

/// One row of a bulk slot template
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTemplate {
    /// Start time (`HH:MM`)
    pub start_time: String,
    /// End time (`HH:MM`)
    pub end_time: String,
    /// Capacity
    pub max_tickets: u32,
}

/// Create the same slots on every matching day of the event range
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSlotRequest {
    /// First day
    pub event_start_date: String,
    /// Last day
    pub event_end_date: String,
    /// Weekday or weekend template
    pub day_type: DayType,
    /// Rows to create per day
    pub slots: Vec<SlotTemplate>,
}

/// Response of slot deletions
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeletedCount {
    /// Number of records removed
    pub deleted_count: u64,
    /// Server message
    pub message: Option<String>,
}

// ============================================================================
// Bundles
// ============================================================================

/// A discounted multi-ticket package
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bundle {
    /// Server id
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Free-text description printed on the ticket
    pub description: String,
    /// Flat price before discount
    pub price: Money,
    /// Discount in percent of `price`
    pub discount_percent: f64,
    /// Tickets included in the package
    pub tickets: u32,
}

impl Bundle {
    /// `price × discountPercent / 100`, with the percent clamped to `[0, 100]`
    #[must_use]
    pub fn discount(&self) -> Money {
        self.price.percent(self.discount_percent)
    }

    /// `price − discount`, never negative
    #[must_use]
    pub fn net_price(&self) -> Money {
        self.price.saturating_sub(self.discount())
    }
}

// ============================================================================
// Vouchers
// ============================================================================

/// How a voucher discount is expressed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Percent of the order amount
    #[default]
    Percentage,
    /// Fixed euro amount
    Fixed,
}

/// `POST /api/discount-vouchers/validate` body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherValidationRequest {
    /// Upper-cased code
    pub code: String,
    /// Pre-discount total the voucher is checked against
    pub amount: Money,
}

/// The voucher as echoed back by validation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoucherSummary {
    /// Code
    pub code: String,
    /// Percentage or fixed
    pub discount_type: DiscountType,
    /// Percent or euro value
    pub discount_value: f64,
}

/// Server-computed voucher result
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoucherValidation {
    /// The matched voucher
    pub voucher: VoucherSummary,
    /// Discount to subtract
    pub discount_amount: Money,
    /// Amount the voucher was validated against
    pub original_amount: Money,
    /// `original_amount − discount_amount`
    pub final_amount: Money,
}

/// Voucher data submitted with a checkout and stored on the ticket
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppliedVoucher {
    /// Code
    pub code: String,
    /// Discount subtracted
    pub discount_amount: Money,
    /// Amount before discount
    pub original_amount: Money,
    /// Amount after discount
    pub final_amount: Money,
}

impl From<&VoucherValidation> for AppliedVoucher {
    fn from(validation: &VoucherValidation) -> Self {
        Self {
            code: validation.voucher.code.clone(),
            discount_amount: validation.discount_amount,
            original_amount: validation.original_amount,
            final_amount: validation.final_amount,
        }
    }
}

/// A voucher as managed from the admin console
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherDefinition {
    /// Server id
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Code customers type
    pub code: String,
    /// Internal name
    #[serde(default)]
    pub name: String,
    /// Internal description
    #[serde(default)]
    pub description: String,
    /// Percentage or fixed
    #[serde(default)]
    pub discount_type: DiscountType,
    /// Percent or euro value
    pub discount_value: f64,
    /// Minimum order amount
    #[serde(default)]
    pub minimum_amount: Money,
    /// Cap on the discount amount
    #[serde(default)]
    pub maximum_discount: Option<Money>,
    /// Maximum redemptions, `-1` for unlimited
    #[serde(default = "unlimited")]
    pub usage_limit: i64,
    /// Redemptions so far
    #[serde(default, skip_serializing)]
    pub used_count: u64,
    /// Start of validity
    pub valid_from: DateTime<Utc>,
    /// End of validity
    pub valid_until: DateTime<Utc>,
    /// Manual on/off switch
    #[serde(default = "enabled")]
    pub is_active: bool,
    /// Scope (`all` by default)
    #[serde(default = "applicable_to_all")]
    pub applicable_for: String,
}

const fn unlimited() -> i64 {
    -1
}

const fn enabled() -> bool {
    true
}

fn applicable_to_all() -> String {
    "all".to_string()
}

impl VoucherDefinition {
    /// Past its validity window
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until < now
    }

    /// Switched on and inside its validity window
    #[must_use]
    pub fn is_currently_active(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.valid_from <= now && now <= self.valid_until
    }

    /// Whether `usage_limit` allows more redemptions
    #[must_use]
    pub fn has_uses_left(&self) -> bool {
        u64::try_from(self.usage_limit).map_or(true, |limit| self.used_count < limit)
    }
}

// ============================================================================
// Checkout
// ============================================================================

/// Card goes through the hosted checkout page, cash is confirmed at the desk
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Hosted card checkout
    #[default]
    Card,
    /// Cash register
    Cash,
}

/// Add-on choices carried in the payload (`addonData`)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddOnData {
    /// Pairs of socks
    pub socks_count: u32,
    /// Cancellation insurance on
    pub cancellation_enabled: bool,
    /// Fee per ticket × tickets, zero when disabled
    pub cancellation_fee: Money,
    /// Socks plus cancellation
    pub total_add_on_amount: Money,
}

/// Everything a booking submission carries
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutPayload {
    /// Day (`YYYY-MM-DD`)
    pub date: String,
    /// Slot start
    pub start_time: String,
    /// Slot end
    pub end_time: String,
    /// Slot start in epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Regular tickets
    pub tickets: u32,
    /// Half-time tickets (cash register only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub half_time_tickets: Option<u32>,
    /// Tickets plus bundle net
    pub amount: Money,
    /// Tickets only
    pub total_base_amount: Money,
    /// Whether a bundle was chosen
    #[serde(rename = "bundelSelected")]
    pub bundle_selected: bool,
    /// The chosen bundle
    #[serde(rename = "selectedBundel")]
    pub selected_bundle: Option<Bundle>,
    /// Pairs of socks
    pub socks_count: u32,
    /// Cancellation insurance on
    pub cancellation_enabled: bool,
    /// Cancellation fee total
    pub cancellation_fee: Money,
    /// Add-on total
    pub total_add_on_amount: Money,
    /// Add-on block as submitted
    #[serde(rename = "addonData")]
    pub add_on_data: AddOnData,
    /// Customer first name
    pub name: String,
    /// Customer surname
    pub surname: String,
    /// Customer email
    pub email: String,
    /// Customer phone
    #[serde(skip_serializing_if = "String::is_empty")]
    pub phone: String,
    /// Customer postal code
    #[serde(skip_serializing_if = "String::is_empty")]
    pub postal_code: String,
    /// Applied voucher
    pub voucher_data: Option<AppliedVoucher>,
    /// Voucher-adjusted total
    pub total_amount: Money,
    /// Amount charged
    pub subtotal: Money,
    /// Card or cash
    pub payment_method: PaymentMethod,
    /// Cash register booking
    pub is_cash_payment: bool,
}

/// `POST /api/payment/session` and card walk-in response
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentSession {
    /// Hosted checkout session id
    pub session_id: Option<String>,
    /// Hosted checkout page
    pub checkout_url: Option<String>,
}

// ============================================================================
// Tickets
// ============================================================================

/// A ticket as stored by the server
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketRecord {
    /// Database id
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Public ticket id encoded in the QR code
    pub ticket_id: String,
    /// Customer first name
    pub name: String,
    /// Customer surname
    pub surname: String,
    /// Customer email
    pub email: String,
    /// Day
    pub date: String,
    /// Slot start
    pub start_time: String,
    /// Slot end
    pub end_time: String,
    /// Regular tickets
    pub tickets: u32,
    /// Half-time tickets
    pub half_time_tickets: u32,
    /// Pairs of socks
    pub socks_count: u32,
    /// Tickets plus bundle net
    pub amount: Money,
    /// Tickets only
    pub total_base_amount: Money,
    /// Add-on total
    pub total_add_on_amount: Money,
    /// Amount charged
    pub subtotal: Money,
    /// The chosen bundle
    #[serde(rename = "selectedBundel")]
    pub selected_bundle: Option<Bundle>,
    /// Cancellation insurance on
    pub cancellation_enabled: bool,
    /// Cancellation fee total
    pub cancellation_fee: Money,
    /// Add-on block as submitted
    #[serde(rename = "addonData")]
    pub add_on_data: Option<AddOnData>,
    /// Applied voucher
    pub voucher_data: Option<AppliedVoucher>,
    /// `paid`, `pending`, `refunded`, ...
    pub payment_status: Option<String>,
    /// Card or cash
    pub payment_method: Option<PaymentMethod>,
    /// Cash register booking
    pub is_cash_payment: bool,
    /// Scanned at the entrance
    pub is_used: bool,
    /// Refund state reported by the server
    pub refund_status: Option<String>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
}

impl TicketRecord {
    /// Id for per-ticket admin calls (`_id` first, then `ticketId`)
    #[must_use]
    pub fn record_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.ticket_id)
    }

    /// Payment confirmed (anything but `pending`)
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.payment_status.as_deref() != Some("pending")
    }

    /// Regular, bundle-included and half-time tickets together
    #[must_use]
    pub fn admitted_count(&self) -> u32 {
        let bundle = self.selected_bundle.as_ref().map_or(0, |b| b.tickets);
        self.tickets
            .saturating_add(bundle)
            .saturating_add(self.half_time_tickets)
    }

    /// Built from a cash payload when the server does not echo the ticket
    #[must_use]
    pub fn from_payload(payload: &CheckoutPayload) -> Self {
        Self {
            name: payload.name.clone(),
            surname: payload.surname.clone(),
            email: payload.email.clone(),
            date: payload.date.clone(),
            start_time: payload.start_time.clone(),
            end_time: payload.end_time.clone(),
            tickets: payload.tickets,
            half_time_tickets: payload.half_time_tickets.unwrap_or(0),
            socks_count: payload.socks_count,
            amount: payload.amount,
            total_base_amount: payload.total_base_amount,
            total_add_on_amount: payload.total_add_on_amount,
            subtotal: payload.subtotal,
            selected_bundle: payload.selected_bundle.clone(),
            cancellation_enabled: payload.cancellation_enabled,
            cancellation_fee: payload.cancellation_fee,
            add_on_data: Some(payload.add_on_data.clone()),
            voucher_data: payload.voucher_data.clone(),
            payment_method: Some(payload.payment_method),
            is_cash_payment: payload.is_cash_payment,
            ..Self::default()
        }
    }
}

/// `POST /api/walkin/book` response
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalkInBooking {
    /// Success flag
    pub success: bool,
    /// Confirmed ticket (cash)
    pub ticket: Option<TicketRecord>,
    /// Hosted checkout page (card)
    pub checkout_url: Option<String>,
    /// Hosted checkout session (card)
    pub session_id: Option<String>,
    /// Server message
    pub message: Option<String>,
}

/// `GET /api/payment/session-result/:id` response
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionResult {
    /// Success flag
    pub success: bool,
    /// Ticket once the payment was processed
    pub ticket: Option<TicketRecord>,
    /// Server message
    pub message: Option<String>,
}

/// `POST /api/tickets/send-email` body
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketEmail {
    /// Recipient
    pub email: String,
    /// Ticket id
    pub ticket_id: String,
    /// Base64-encoded PDF
    pub pdf_base64: String,
}

/// Generic `{success, message}` body
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Acknowledgement {
    /// Success flag
    pub success: bool,
    /// Server message
    pub message: Option<String>,
}

/// `POST /api/cancel-request` body
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequestInput {
    /// Ticket to cancel
    pub ticket_id: String,
    /// Email used for the booking
    pub email: String,
    /// Free-text reason
    pub reason: String,
}

/// A customer cancellation request as listed in the admin console
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CancelRequest {
    /// Server id
    #[serde(rename = "_id")]
    pub id: Option<String>,
    /// Ticket to cancel
    pub ticket_id: String,
    /// Customer name
    pub name: Option<String>,
    /// Customer email
    pub email: String,
    /// Reason given
    pub reason: Option<String>,
    /// When requested
    pub created_at: Option<DateTime<Utc>>,
}

/// Slot identification for a mass refund
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRef {
    /// Day
    pub date: String,
    /// Start
    pub start_time: String,
    /// End
    pub end_time: String,
}

/// Outcome of a mass refund
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MassRefundReport {
    /// Tickets refunded
    pub refunded: Vec<serde_json::Value>,
    /// Tickets the payment provider refused
    pub failed: Vec<serde_json::Value>,
    /// Tickets found for the slot
    pub total_tickets_processed: u64,
    /// Server message
    pub message: Option<String>,
}

/// Aggregates computed by the server
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketAnalytics {
    /// Bookings
    pub total_sales: u64,
    /// Revenue
    pub total_revenue: Money,
    /// Admissions
    pub total_tickets: u64,
    /// Half-time admissions
    pub total_half_time_tickets: u64,
    /// Socks sold
    pub total_socks: u64,
    /// Card bookings
    pub card_payments: u64,
    /// Cash bookings
    pub cash_payments: u64,
    /// Card revenue
    pub total_card_revenue: Money,
    /// Cash revenue
    pub total_cash_revenue: Money,
    /// Revenue per booking
    pub average_sale_value: Money,
    /// Revenue per admission
    pub average_ticket_price: Money,
    /// Refunds issued
    pub total_refunds: u64,
    /// Refunded amount
    pub refunded_amount: Money,
    /// Scanned tickets
    pub used_tickets: u64,
    /// Unscanned tickets
    pub unused_tickets: u64,
    /// Per-day rows
    pub daily_breakdown_array: Vec<serde_json::Value>,
    /// Per-week rows
    pub weekly_breakdown_array: Vec<serde_json::Value>,
    /// Per-month rows
    pub monthly_breakdown_array: Vec<serde_json::Value>,
    /// Per-bundle rows
    pub bundle_breakdown_array: Vec<serde_json::Value>,
    /// Best days
    pub top_selling_dates: Vec<serde_json::Value>,
}

/// Totals for today's unused tickets
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnusedTicketStats {
    /// Unused tickets today
    pub total_unused_today: u64,
    /// Regular admissions
    pub total_tickets_count: u64,
    /// Bundle admissions
    pub total_bundle_tickets: u64,
    /// Half-time admissions
    pub total_half_time_tickets: u64,
    /// Revenue of those tickets
    pub total_revenue: Money,
}

/// `GET /api/tickets/unused-today` payload
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UnusedTicketsReport {
    /// Tickets not scanned today
    pub tickets: Vec<TicketRecord>,
    /// Totals
    pub stats: UnusedTicketStats,
}

// ============================================================================
// Admin
// ============================================================================

/// Admin username and password
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AdminCredentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `POST /api/admin/login` response
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    /// Success flag
    pub success: bool,
    /// Role string (`adminJump`, `cashier`)
    pub role: Option<String>,
    /// Server message
    pub message: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

/// `YYYY-MM-DD`, the format the server uses for slot dates
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse `HH:MM` or `HH:MM:SS`
#[must_use]
pub fn parse_time(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .ok()
}
